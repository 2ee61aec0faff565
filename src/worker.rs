//! Generator (producer) side of the protocol.
//!
//! A worker attaches to the resources the supervisor created, registers
//! itself so the shutdown fan-out accounts for it, then publishes every
//! small enough proposal until the supervisor asks everyone to stop.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::coloring::CandidateSource;
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::ring::{Producer, Publish};
use crate::shm::{SharedState, ShmSegment};
use crate::stats::WorkerStatistics;
use crate::sync::SyncTriplet;

/// Lifecycle of a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Attaching,
    Registered,
    Producing,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Attaching => "attaching",
            WorkerState::Registered => "registered",
            WorkerState::Producing => "producing",
            WorkerState::ShuttingDown => "shutting down",
            WorkerState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// A generator attached to the supervisor's segment and semaphores.
pub struct Worker {
    segment: ShmSegment,
    sync: SyncTriplet,
    state: WorkerState,
}

impl Worker {
    /// Open the segment and the three semaphores.
    ///
    /// Fails with a not-found resource error if no supervisor is running.
    pub fn attach(config: WorkerConfig) -> Result<Self> {
        debug!(state = %WorkerState::Attaching, shm = %config.names.shm, "worker");
        let sync = SyncTriplet::open(&config.names)?;
        let segment = ShmSegment::open(&config.names.shm, SharedState::SIZE)?;
        Ok(Self {
            segment,
            sync,
            state: WorkerState::Attaching,
        })
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn shared(&self) -> &SharedState {
        SharedState::from_segment(&self.segment)
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(from = %self.state, to = %next, "worker state");
        self.state = next;
    }

    /// Count this worker in the shared record. Returns the new total.
    pub fn register(&mut self) -> Result<u32> {
        let guard = self.sync.lock()?;
        let total = self.shared().register_worker(&guard);
        guard.unlock()?;
        self.transition(WorkerState::Registered);
        info!(registered_workers = total, "registered with supervisor");
        Ok(total)
    }

    /// Publish proposals from `source` until termination is requested.
    ///
    /// Registers first if that has not happened yet. Proposals with more
    /// than [`crate::solution::MAX_SOLUTION_EDGES`] edges are dropped here and
    /// never reach the buffer.
    pub fn produce(&mut self, source: &mut impl CandidateSource) -> Result<WorkerStatistics> {
        if self.state == WorkerState::Attaching {
            self.register()?;
        }
        self.transition(WorkerState::Producing);

        let start = Instant::now();
        let mut stats = WorkerStatistics::default();
        let producer = Producer::new(self.shared(), &self.sync);

        while !producer.termination_requested()? {
            let proposal = source.propose();
            stats.proposals += 1;

            let Some(candidate) = proposal.to_candidate() else {
                stats.discarded_oversized += 1;
                trace!(edges = proposal.edge_count(), "discarded oversized proposal");
                continue;
            };

            match producer.publish(&candidate)? {
                Publish::Written { slot } => {
                    stats.record_published(candidate.len());
                    trace!(slot, edges = candidate.len(), "published");
                }
                Publish::Terminated => break,
            }
        }

        stats.elapsed_time = start.elapsed();
        self.transition(WorkerState::ShuttingDown);
        Ok(stats)
    }

    /// Close the semaphores and unmap the segment. Names are left alone.
    pub fn detach(mut self) -> Result<()> {
        self.transition(WorkerState::Terminated);
        let Self { segment, sync, .. } = self;
        sync.close()?;
        segment.unmap()?;
        Ok(())
    }

    /// Attach, register, produce until told to stop, detach.
    pub fn run(config: WorkerConfig, source: &mut impl CandidateSource) -> Result<WorkerStatistics> {
        let mut worker = Self::attach(config)?;
        worker.register()?;
        let stats = worker.produce(source)?;
        info!("terminating");
        debug!("statistics:\n{}", stats.format_summary());
        worker.detach()?;
        Ok(stats)
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("state", &self.state)
            .field("segment", &self.segment)
            .field("sync", &self.sync)
            .finish()
    }
}
