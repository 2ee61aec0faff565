//! The record shared by the supervisor and all generators.
//!
//! Field-level discipline:
//! - `termination_requested`, `registered_workers` and the shared producer
//!   cursor `write_pos` are guarded by the mutex semaphore. Every accessor
//!   takes a [`LockGuard`] as proof. Producers also keep the mutex across
//!   their slot write, so claims are filled in claim order.
//! - the slots are guarded by the `free_slots`/`used_slots` permits. A slot
//!   is only touched by the holder of the permit for it, which the ring
//!   protocol in [`crate::ring`] guarantees.

use std::cell::UnsafeCell;
use std::mem::{align_of, size_of};
use std::sync::atomic::{AtomicU32, Ordering};

use super::ShmSegment;
use crate::config::BUFFER_CAPACITY;
use crate::solution::CandidateSolution;
use crate::sync::LockGuard;

#[repr(transparent)]
struct Slot(UnsafeCell<CandidateSolution>);

/// Layout of the shared segment.
///
/// All-zero bytes are a valid initial state: no termination, no workers,
/// cursor at slot 0, every slot an empty solution.
#[repr(C)]
pub struct SharedState {
    termination_requested: AtomicU32,
    registered_workers: AtomicU32,
    write_pos: AtomicU32,
    slots: [Slot; BUFFER_CAPACITY],
}

// SAFETY: guarded fields are atomics, slot access is serialised by permits.
unsafe impl Sync for SharedState {}

impl SharedState {
    /// Bytes needed to hold the record.
    pub const SIZE: usize = size_of::<SharedState>();

    /// View a mapped segment as the shared record.
    ///
    /// Panics if the segment is too small or misaligned, which cannot happen
    /// for segments created with [`SharedState::SIZE`] bytes.
    pub fn from_segment(segment: &ShmSegment) -> &SharedState {
        assert!(segment.len() >= Self::SIZE, "segment too small for SharedState");
        assert!(
            (segment.as_ptr() as usize) % align_of::<SharedState>() == 0,
            "segment misaligned for SharedState"
        );
        // SAFETY: size and alignment checked, the mapping lives as long as
        // `segment`, and any bit pattern of the fields is valid.
        unsafe { &*(segment.as_ptr() as *const SharedState) }
    }

    /// Reset the guarded fields to their initial values.
    pub fn reset(&self, _guard: &LockGuard<'_>) {
        self.termination_requested.store(0, Ordering::SeqCst);
        self.registered_workers.store(0, Ordering::SeqCst);
        self.write_pos.store(0, Ordering::SeqCst);
    }

    pub fn termination_requested(&self, _guard: &LockGuard<'_>) -> bool {
        self.termination_requested.load(Ordering::SeqCst) != 0
    }

    /// Set the termination flag. It never goes back to false.
    pub fn request_termination(&self, _guard: &LockGuard<'_>) {
        self.termination_requested.store(1, Ordering::SeqCst);
    }

    /// Count one more worker and return the new total.
    pub fn register_worker(&self, _guard: &LockGuard<'_>) -> u32 {
        self.registered_workers.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn registered_workers(&self, _guard: &LockGuard<'_>) -> u32 {
        self.registered_workers.load(Ordering::SeqCst)
    }

    /// Take the next producer slot index and advance the shared cursor,
    /// wrapping at [`BUFFER_CAPACITY`].
    ///
    /// The cursor is shared by all producers, so the mutex is held from the
    /// claim until the slot is written and `used_slots` is posted. The
    /// consumer never takes the mutex to read a slot.
    pub fn claim_write_slot(&self, _guard: &LockGuard<'_>) -> usize {
        let index = self.write_pos.load(Ordering::SeqCst) as usize % BUFFER_CAPACITY;
        self.write_pos
            .store(((index + 1) % BUFFER_CAPACITY) as u32, Ordering::SeqCst);
        index
    }

    /// # Safety
    ///
    /// The caller must hold the `free_slots` permit that corresponds to
    /// `index`, so no other process reads or writes the slot concurrently.
    pub(crate) unsafe fn write_slot(&self, index: usize, solution: &CandidateSolution) {
        let slot = &self.slots[index];
        unsafe { slot.0.get().write(*solution) }
    }

    /// # Safety
    ///
    /// The caller must hold the `used_slots` permit that corresponds to
    /// `index`, so no producer writes the slot concurrently.
    pub(crate) unsafe fn read_slot(&self, index: usize) -> CandidateSolution {
        let slot = &self.slots[index];
        unsafe { slot.0.get().read() }
    }
}
