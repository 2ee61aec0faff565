//! POSIX shared-memory segments (`shm_open` + `mmap`).
//!
//! The segment is mapped `MAP_SHARED`, so every process that maps the same
//! name sees the same bytes. The file descriptor is closed right after
//! mapping; the mapping keeps the object alive.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::NonNull;

use super::c_name;
use crate::error::{Operation, ResourceError};

/// A mapped shared-memory object.
pub struct ShmSegment {
    ptr: NonNull<u8>,
    len: usize,
    name: String,
    mapped: bool,
}

impl ShmSegment {
    /// Create a new zero-filled segment of `len` bytes. Fails if the name exists.
    pub fn create(name: &str, len: usize) -> Result<Self, ResourceError> {
        if len == 0 {
            return Err(ResourceError::new(
                Operation::Ftruncate,
                name,
                io::Error::new(io::ErrorKind::InvalidInput, "size must be > 0"),
            ));
        }

        let cname = c_name(Operation::ShmOpen, name)?;
        let fd = unsafe {
            libc::shm_open(
                cname.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::mode_t,
            )
        };
        if fd == -1 {
            return Err(ResourceError::last_os_error(Operation::ShmOpen, name));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        if unsafe { libc::ftruncate(fd.as_raw_fd(), len as libc::off_t) } == -1 {
            let err = ResourceError::last_os_error(Operation::Ftruncate, name);
            // The name is ours; do not leave a half-initialised object behind.
            unsafe {
                libc::shm_unlink(cname.as_ptr());
            }
            return Err(err);
        }

        match Self::map(&fd, name, len) {
            Ok(segment) => Ok(segment),
            Err(err) => {
                unsafe {
                    libc::shm_unlink(cname.as_ptr());
                }
                Err(err)
            }
        }
    }

    /// Map an existing segment. It must hold at least `len` bytes.
    pub fn open(name: &str, len: usize) -> Result<Self, ResourceError> {
        let cname = c_name(Operation::ShmOpen, name)?;
        let fd = unsafe { libc::shm_open(cname.as_ptr(), libc::O_RDWR, 0o600 as libc::mode_t) };
        if fd == -1 {
            return Err(ResourceError::last_os_error(Operation::ShmOpen, name));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd.as_raw_fd(), &mut stat) } == -1 {
            return Err(ResourceError::last_os_error(Operation::Fstat, name));
        }
        if (stat.st_size as u64) < len as u64 {
            return Err(ResourceError::new(
                Operation::Fstat,
                name,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("segment holds {} bytes, expected {}", stat.st_size, len),
                ),
            ));
        }

        Self::map(&fd, name, len)
    }

    fn map(fd: &OwnedFd, name: &str, len: usize) -> Result<Self, ResourceError> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(ResourceError::last_os_error(Operation::Mmap, name));
        }
        let ptr = NonNull::new(ptr as *mut u8)
            .ok_or_else(|| ResourceError::last_os_error(Operation::Mmap, name))?;

        Ok(Self {
            ptr,
            len,
            name: name.to_string(),
            mapped: true,
        })
    }

    /// Base address of the mapping. Page aligned.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unmap, reporting failure instead of ignoring it.
    pub fn unmap(mut self) -> Result<(), ResourceError> {
        self.mapped = false;
        if unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len) } == 0 {
            Ok(())
        } else {
            Err(ResourceError::last_os_error(Operation::Munmap, &self.name))
        }
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        if self.mapped {
            unsafe {
                libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len);
            }
        }
    }
}

impl std::fmt::Debug for ShmSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShmSegment")
            .field("name", &self.name)
            .field("len", &self.len)
            .finish()
    }
}

// SAFETY: the mapping stays valid until unmapped; synchronising access to
// its contents is the job of the types layered on top.
unsafe impl Send for ShmSegment {}
unsafe impl Sync for ShmSegment {}

/// Remove a shared-memory name. Existing mappings stay valid.
pub fn unlink_segment(name: &str) -> Result<(), ResourceError> {
    let cname = c_name(Operation::ShmUnlink, name)?;
    if unsafe { libc::shm_unlink(cname.as_ptr()) } == 0 {
        Ok(())
    } else {
        Err(ResourceError::last_os_error(Operation::ShmUnlink, name))
    }
}
