//! threecol - approximate 3-colorability with cooperating processes
//!
//! Generators repeatedly color a graph at random and publish the edges that
//! would have to be removed for the coloring to be proper. A single
//! supervisor collects those candidates from a circular buffer in POSIX
//! shared memory, guarded by three named semaphores, and keeps the smallest.

pub mod coloring;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod graph;
pub mod ring;
pub mod shm;
pub mod solution;
pub mod stats;
pub mod sync;
pub mod worker;


pub use coloring::{CandidateSource, Proposal, RandomColoring};
pub use config::{BUFFER_CAPACITY, CoordinatorConfig, ResourceNames, WorkerConfig};
pub use coordinator::{Coordinator, CoordinatorState, DrainEnd, DrainOutcome, StopHandle};
pub use error::{Error, ParseError, ResourceError, Result};
pub use graph::{Edge, Graph};
pub use solution::{CandidateSolution, MAX_SOLUTION_EDGES};
pub use stats::{DrainStatistics, WorkerStatistics};
pub use worker::{Worker, WorkerState};
