//! Supervisor (consumer) side of the protocol.
//!
//! The coordinator owns every named resource: it creates them, drains the
//! buffer while tracking the smallest candidate, wakes all registered
//! workers at shutdown and finally removes the names.

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::config::CoordinatorConfig;
use crate::error::{ResourceError, Result};
use crate::ring::Consumer;
use crate::shm::{CreatedResources, NamedSemaphore, ResourceKind, SharedState, ShmSegment};
use crate::solution::CandidateSolution;
use crate::stats::DrainStatistics;
use crate::sync::SyncTriplet;

/// Prefix of every line the supervisor prints.
pub const ROLE_PREFIX: &str = "[supervisor]";

/// Lifecycle of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Initializing,
    Draining,
    ShuttingDown,
    CleanedUp,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoordinatorState::Initializing => "initializing",
            CoordinatorState::Draining => "draining",
            CoordinatorState::ShuttingDown => "shutting down",
            CoordinatorState::CleanedUp => "cleaned up",
        };
        f.write_str(name)
    }
}

/// Why the drain loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainEnd {
    /// A stop was requested from outside.
    Stopped,
    /// A candidate without edges was read.
    Colorable,
}

/// Result of [`Coordinator::drain`].
#[derive(Debug, Clone)]
pub struct DrainOutcome {
    pub end: DrainEnd,
    /// Smallest candidate read, `None` if nothing was read.
    pub best: Option<CandidateSolution>,
    pub statistics: DrainStatistics,
}

impl DrainOutcome {
    pub fn best_edge_count(&self) -> Option<usize> {
        self.best.as_ref().map(CandidateSolution::len)
    }

    pub fn is_colorable(&self) -> bool {
        self.best_edge_count() == Some(0)
    }

    /// Write the final summary lines.
    pub fn report(&self, out: &mut impl Write) -> Result<()> {
        match self.best_edge_count() {
            Some(count) => writeln!(out, "{} Best found solution: {} edges", ROLE_PREFIX, count)?,
            None => writeln!(out, "{} Best found solution: no solution received", ROLE_PREFIX)?,
        }
        if self.is_colorable() {
            writeln!(out, "{} The graph is 3-colorable!", ROLE_PREFIX)?;
        }
        Ok(())
    }
}

/// Asks a draining coordinator to stop. Safe to call from any thread.
///
/// Setting the flag alone would leave a coordinator blocked on `used_slots`
/// asleep, so a wake-up unit is posted on it as well.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    wake: Arc<NamedSemaphore>,
}

impl StopHandle {
    pub fn request_stop(&self) -> std::result::Result<(), ResourceError> {
        self.flag.store(true, Ordering::SeqCst);
        self.wake.post()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("stop_requested", &self.is_stop_requested())
            .field("wake", &self.wake.name())
            .finish()
    }
}

/// The supervisor and the resources it owns.
pub struct Coordinator {
    config: CoordinatorConfig,
    segment: ShmSegment,
    sync: SyncTriplet,
    created: CreatedResources,
    stop: Arc<AtomicBool>,
    read_pos: usize,
    state: CoordinatorState,
}

impl Coordinator {
    /// Create the three semaphores and the segment, and reset the record.
    ///
    /// Fails if any of the names already exists. Whatever was created before
    /// a failure is removed again.
    pub fn create(config: CoordinatorConfig) -> Result<Self> {
        debug!(state = %CoordinatorState::Initializing, shm = %config.names.shm, "coordinator");
        let mut created = CreatedResources::new();
        let sync = SyncTriplet::create(&config.names, &mut created)?;
        let segment = ShmSegment::create(&config.names.shm, SharedState::SIZE)?;
        created.push(ResourceKind::Segment, &config.names.shm);

        let guard = sync.lock()?;
        SharedState::from_segment(&segment).reset(&guard);
        guard.unlock()?;

        info!(shm = %config.names.shm, size = SharedState::SIZE, "shared resources created");
        Ok(Self {
            config,
            segment,
            sync,
            created,
            stop: Arc::new(AtomicBool::new(false)),
            read_pos: 0,
            state: CoordinatorState::Initializing,
        })
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    fn shared(&self) -> &SharedState {
        SharedState::from_segment(&self.segment)
    }

    fn transition(&mut self, next: CoordinatorState) {
        debug!(from = %self.state, to = %next, "coordinator state");
        self.state = next;
    }

    /// A handle that ends [`Coordinator::drain`] from another thread.
    pub fn stop_handle(&self) -> Result<StopHandle> {
        let wake = NamedSemaphore::open(&self.config.names.used_slots)?;
        Ok(StopHandle {
            flag: Arc::clone(&self.stop),
            wake: Arc::new(wake),
        })
    }

    /// Read candidates until a stop is requested or a candidate without
    /// edges shows up.
    ///
    /// Each candidate smaller than every earlier one is printed to `out`.
    /// The empty candidate ends the loop without a line of its own.
    pub fn drain(&mut self, out: &mut impl Write) -> Result<DrainOutcome> {
        self.transition(CoordinatorState::Draining);

        let start = Instant::now();
        let mut statistics = DrainStatistics::default();
        let mut best: Option<CandidateSolution> = None;
        let mut consumer = Consumer::starting_at(self.shared(), &self.sync, self.read_pos);

        let end = loop {
            let Some(candidate) = consumer.read_unless(&self.stop)? else {
                info!("stop requested");
                break DrainEnd::Stopped;
            };
            trace!(edges = candidate.len(), slot = consumer.read_pos(), "read candidate");

            if !statistics.observe(candidate.len()) {
                continue;
            }
            best = Some(candidate);
            if candidate.is_empty() {
                info!("found a proper 3-coloring");
                break DrainEnd::Colorable;
            }
            writeln!(
                out,
                "{} Solution with {} edges: {}",
                ROLE_PREFIX,
                candidate.len(),
                candidate
            )?;
            out.flush()?;
        };

        let read_pos = consumer.read_pos();
        self.read_pos = read_pos;
        statistics.elapsed_time = start.elapsed();
        debug!("drain statistics:\n{}", statistics.format_summary());

        Ok(DrainOutcome {
            end,
            best,
            statistics,
        })
    }

    /// Set the termination flag and post one free slot per registered
    /// worker, so every worker blocked on the buffer wakes and sees it.
    ///
    /// Returns the number of workers released.
    pub fn shutdown(&mut self) -> Result<u32> {
        self.transition(CoordinatorState::ShuttingDown);

        let guard = self.sync.lock()?;
        let state = self.shared();
        state.request_termination(&guard);
        let workers = state.registered_workers(&guard);
        guard.unlock()?;

        for _ in 0..workers {
            self.sync.free_slots().post()?;
        }
        info!(workers, "released registered workers");
        Ok(workers)
    }

    /// Close the handles, unmap the segment and remove every name.
    pub fn cleanup(mut self) -> Result<()> {
        self.transition(CoordinatorState::CleanedUp);
        let Self {
            segment,
            sync,
            created,
            ..
        } = self;
        sync.close()?;
        segment.unmap()?;
        created.unlink_all()?;
        Ok(())
    }

    /// Drain, shut down, print the summary, clean up.
    pub fn run(mut self, out: &mut impl Write) -> Result<DrainOutcome> {
        let outcome = self.drain(out)?;
        self.shutdown()?;
        outcome.report(out)?;
        out.flush()?;
        self.cleanup()?;
        info!("terminating");
        Ok(outcome)
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state)
            .field("read_pos", &self.read_pos)
            .field("segment", &self.segment)
            .field("sync", &self.sync)
            .finish()
    }
}
