//! Named POSIX semaphores shared between processes.

use std::io;
use std::ptr::NonNull;

use super::c_name;
use crate::error::{Operation, ResourceError};

/// Result of a wait that may be cut short by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// One unit was taken from the semaphore.
    Acquired,
    /// A signal handler ran before a unit became available; nothing was taken.
    Interrupted,
}

/// A handle to a named POSIX semaphore (`sem_open`).
///
/// Dropping the handle closes it. Only the creator should remove the name,
/// through [`unlink_semaphore`].
pub struct NamedSemaphore {
    sem: NonNull<libc::sem_t>,
    name: String,
    open: bool,
}

impl NamedSemaphore {
    /// Create a new semaphore with `initial` units. Fails if the name exists.
    pub fn create(name: &str, initial: u32) -> Result<Self, ResourceError> {
        let cname = c_name(Operation::SemOpen, name)?;
        let sem = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        Self::from_raw(sem, name)
    }

    /// Open a semaphore created by another process.
    pub fn open(name: &str) -> Result<Self, ResourceError> {
        let cname = c_name(Operation::SemOpen, name)?;
        let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        Self::from_raw(sem, name)
    }

    fn from_raw(sem: *mut libc::sem_t, name: &str) -> Result<Self, ResourceError> {
        if sem == libc::SEM_FAILED {
            return Err(ResourceError::last_os_error(Operation::SemOpen, name));
        }
        let sem = NonNull::new(sem)
            .ok_or_else(|| ResourceError::last_os_error(Operation::SemOpen, name))?;
        Ok(Self {
            sem,
            name: name.to_string(),
            open: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until a unit is available and take it.
    ///
    /// Signals delivered while blocked are absorbed and the wait resumes.
    pub fn wait(&self) -> Result<(), ResourceError> {
        loop {
            match self.wait_interruptible()? {
                Wait::Acquired => return Ok(()),
                Wait::Interrupted => continue,
            }
        }
    }

    /// Block until a unit is available, or until a signal handler runs.
    pub fn wait_interruptible(&self) -> Result<Wait, ResourceError> {
        if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
            return Ok(Wait::Acquired);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Wait::Interrupted);
        }
        Err(ResourceError::new(Operation::SemWait, &self.name, err))
    }

    /// Take a unit only if one is available right now.
    pub fn try_wait(&self) -> Result<bool, ResourceError> {
        loop {
            if unsafe { libc::sem_trywait(self.sem.as_ptr()) } == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EAGAIN) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => return Err(ResourceError::new(Operation::SemWait, &self.name, err)),
            }
        }
    }

    /// Release one unit. Never blocks.
    pub fn post(&self) -> Result<(), ResourceError> {
        if unsafe { libc::sem_post(self.sem.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(ResourceError::last_os_error(Operation::SemPost, &self.name))
        }
    }

    /// Current number of available units. Only a snapshot.
    pub fn value(&self) -> Result<u32, ResourceError> {
        let mut value: libc::c_int = 0;
        if unsafe { libc::sem_getvalue(self.sem.as_ptr(), &mut value) } == 0 {
            // Linux reports 0, never a negative waiter count
            Ok(value.max(0) as u32)
        } else {
            Err(ResourceError::last_os_error(Operation::SemWait, &self.name))
        }
    }

    /// Close this handle, reporting failure instead of ignoring it.
    pub fn close(mut self) -> Result<(), ResourceError> {
        self.open = false;
        if unsafe { libc::sem_close(self.sem.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(ResourceError::last_os_error(Operation::SemClose, &self.name))
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        if self.open {
            unsafe {
                libc::sem_close(self.sem.as_ptr());
            }
        }
    }
}

impl std::fmt::Debug for NamedSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedSemaphore")
            .field("name", &self.name)
            .finish()
    }
}

// SAFETY: POSIX semaphores may be used concurrently from any thread.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

/// Remove a semaphore name. Handles that are still open stay usable.
pub fn unlink_semaphore(name: &str) -> Result<(), ResourceError> {
    let cname = c_name(Operation::SemUnlink, name)?;
    if unsafe { libc::sem_unlink(cname.as_ptr()) } == 0 {
        Ok(())
    } else {
        Err(ResourceError::last_os_error(Operation::SemUnlink, name))
    }
}
