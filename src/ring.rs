//! Circular buffer protocol over [`SharedState`] and the [`SyncTriplet`].
//!
//! Write: take `free_slots`, take the mutex, check the termination flag,
//! claim the shared cursor's slot, write it, give `used_slots`, drop the
//! mutex. Read (single consumer): take `used_slots`, copy the slot at the
//! private `read_pos`, give `free_slots`, advance.
//!
//! Both cursors wrap at [`BUFFER_CAPACITY`]. The permit counts alone keep
//! `written - read` within `0..=BUFFER_CAPACITY`; no index is ever compared.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::BUFFER_CAPACITY;
use crate::error::ResourceError;
use crate::shm::{SharedState, Wait};
use crate::solution::CandidateSolution;
use crate::sync::SyncTriplet;

/// Outcome of a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The candidate was written to this slot.
    Written { slot: usize },
    /// The supervisor asked everyone to stop; nothing was written.
    Terminated,
}

/// Writing side, one per generator.
pub struct Producer<'a> {
    state: &'a SharedState,
    sync: &'a SyncTriplet,
}

impl<'a> Producer<'a> {
    pub fn new(state: &'a SharedState, sync: &'a SyncTriplet) -> Self {
        Self { state, sync }
    }

    /// Check the termination flag under the mutex.
    pub fn termination_requested(&self) -> Result<bool, ResourceError> {
        let guard = self.sync.lock()?;
        let requested = self.state.termination_requested(&guard);
        guard.unlock()?;
        Ok(requested)
    }

    /// Publish one candidate, blocking while the buffer is full.
    ///
    /// The termination flag is checked after the free slot is obtained, so
    /// a producer woken by the shutdown fan-out leaves without writing.
    pub fn publish(&self, solution: &CandidateSolution) -> Result<Publish, ResourceError> {
        self.sync.free_slots().wait()?;

        let guard = self.sync.lock()?;
        if self.state.termination_requested(&guard) {
            guard.unlock()?;
            self.sync.free_slots().post()?;
            return Ok(Publish::Terminated);
        }

        let slot = self.state.claim_write_slot(&guard);
        // SAFETY: we hold a free_slots unit and the cursor claim for `slot`.
        unsafe { self.state.write_slot(slot, solution) };
        self.sync.used_slots().post()?;
        guard.unlock()?;

        Ok(Publish::Written { slot })
    }
}

/// Reading side. There is exactly one, owned by the supervisor.
pub struct Consumer<'a> {
    state: &'a SharedState,
    sync: &'a SyncTriplet,
    read_pos: usize,
}

impl<'a> Consumer<'a> {
    pub fn new(state: &'a SharedState, sync: &'a SyncTriplet) -> Self {
        Self::starting_at(state, sync, 0)
    }

    /// Resume reading at `read_pos`, as left by an earlier consumer.
    pub fn starting_at(state: &'a SharedState, sync: &'a SyncTriplet, read_pos: usize) -> Self {
        Self {
            state,
            sync,
            read_pos: read_pos % BUFFER_CAPACITY,
        }
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Read the next candidate, blocking until one is published.
    pub fn read(&mut self) -> Result<CandidateSolution, ResourceError> {
        self.sync.used_slots().wait()?;
        self.take()
    }

    /// Like [`Consumer::read`], but give up once `stop` is set.
    ///
    /// The flag is checked before blocking, whenever a signal interrupts the
    /// wait, and after a unit is obtained. In the last case the unit may be
    /// a wake-up posted by the interruption handler, so nothing is read.
    pub fn read_unless(
        &mut self,
        stop: &AtomicBool,
    ) -> Result<Option<CandidateSolution>, ResourceError> {
        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(None);
            }
            match self.sync.used_slots().wait_interruptible()? {
                Wait::Interrupted => continue,
                Wait::Acquired => break,
            }
        }
        if stop.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.take().map(Some)
    }

    fn take(&mut self) -> Result<CandidateSolution, ResourceError> {
        // SAFETY: we hold the used_slots unit for `read_pos`.
        let solution = unsafe { self.state.read_slot(self.read_pos) };
        self.sync.free_slots().post()?;
        self.read_pos = (self.read_pos + 1) % BUFFER_CAPACITY;
        Ok(solution)
    }
}
