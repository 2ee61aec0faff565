//! The synchronization triplet: two counting permits and one mutex, all
//! named POSIX semaphores.
//!
//! - `free_slots` starts at [`BUFFER_CAPACITY`]; a producer takes one unit
//!   before writing a slot, the consumer gives one back after reading it.
//! - `used_slots` starts at 0; a producer gives one unit after writing, the
//!   consumer takes one before reading.
//! - `mutex` starts at 1 and guards the termination flag, the worker count
//!   and the shared write cursor in [`crate::shm::SharedState`]. Producers
//!   hold it from claiming a slot until the slot is published; the consumer
//!   reads slots under the permit handoff alone.

use crate::config::{BUFFER_CAPACITY, ResourceNames};
use crate::error::ResourceError;
use crate::shm::{CreatedResources, NamedSemaphore, ResourceKind};

pub struct SyncTriplet {
    free_slots: NamedSemaphore,
    used_slots: NamedSemaphore,
    mutex: NamedSemaphore,
}

impl SyncTriplet {
    /// Create the three semaphores with their initial values.
    ///
    /// Each created name is recorded in `created` as soon as it exists.
    pub fn create(
        names: &ResourceNames,
        created: &mut CreatedResources,
    ) -> Result<Self, ResourceError> {
        let used_slots = NamedSemaphore::create(&names.used_slots, 0)?;
        created.push(ResourceKind::Semaphore, &names.used_slots);

        let free_slots = NamedSemaphore::create(&names.free_slots, BUFFER_CAPACITY as u32)?;
        created.push(ResourceKind::Semaphore, &names.free_slots);

        let mutex = NamedSemaphore::create(&names.mutex, 1)?;
        created.push(ResourceKind::Semaphore, &names.mutex);

        Ok(Self {
            free_slots,
            used_slots,
            mutex,
        })
    }

    /// Open the semaphores created by the supervisor.
    pub fn open(names: &ResourceNames) -> Result<Self, ResourceError> {
        Ok(Self {
            used_slots: NamedSemaphore::open(&names.used_slots)?,
            free_slots: NamedSemaphore::open(&names.free_slots)?,
            mutex: NamedSemaphore::open(&names.mutex)?,
        })
    }

    pub fn free_slots(&self) -> &NamedSemaphore {
        &self.free_slots
    }

    pub fn used_slots(&self) -> &NamedSemaphore {
        &self.used_slots
    }

    /// Take the mutex. Blocks until it is free.
    pub fn lock(&self) -> Result<LockGuard<'_>, ResourceError> {
        self.mutex.wait()?;
        Ok(LockGuard {
            mutex: &self.mutex,
            released: false,
        })
    }

    /// Close all three handles. The names stay; only the creator unlinks them.
    pub fn close(self) -> Result<(), ResourceError> {
        let Self {
            free_slots,
            used_slots,
            mutex,
        } = self;
        used_slots.close()?;
        free_slots.close()?;
        mutex.close()
    }
}

impl std::fmt::Debug for SyncTriplet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncTriplet")
            .field("free_slots", &self.free_slots.name())
            .field("used_slots", &self.used_slots.name())
            .field("mutex", &self.mutex.name())
            .finish()
    }
}

/// Proof that the mutex is held.
///
/// Call [`LockGuard::unlock`] to release it and see a release failure;
/// dropping the guard releases it too but can only log the failure.
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    mutex: &'a NamedSemaphore,
    released: bool,
}

impl LockGuard<'_> {
    pub fn unlock(mut self) -> Result<(), ResourceError> {
        self.released = true;
        self.mutex.post()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.mutex.post() {
                tracing::error!("releasing mutex: {}", e);
            }
        }
    }
}
