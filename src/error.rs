//! Error types for threecol
//!
//! Three kinds of failure exist, and all of them are fatal to the process
//! that hits them:
//! - usage errors (bad arguments), detected before any shared resource is touched
//! - resource errors while creating, attaching or using shared memory and semaphores
//! - resource errors while releasing those resources during teardown
//!
//! There is no retry anywhere; callers propagate with `?` up to `main`, which
//! prints the error together with the role name and exits non-zero.

use std::fmt;
use std::io;
use thiserror::Error;

/// Top-level error type for both process roles
#[derive(Error, Debug)]
pub enum Error {
    /// Bad command line input
    #[error("{0}")]
    Usage(#[from] ParseError),

    /// A shared-memory or semaphore operation failed
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Installing the interruption handler failed
    #[error("failed to install interruption handler: {0}")]
    Signal(String),

    /// Writing result lines failed
    #[error("failed to write results: {0}")]
    Output(#[from] io::Error),
}

/// Errors from parsing worker arguments and resource names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An edge descriptor was not of the form `source-destination`
    #[error("argument {position}: invalid edge '{input}': {reason}")]
    InvalidEdge {
        position: usize,
        input: String,
        reason: String,
    },

    /// The worker was started without any edges
    #[error("no edges given, expected at least one 'source-destination' argument")]
    NoEdges,

    /// A shared resource name is not a valid POSIX IPC name
    #[error("invalid resource name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
}

/// The primitive call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ShmOpen,
    Ftruncate,
    Fstat,
    Mmap,
    Munmap,
    ShmUnlink,
    SemOpen,
    SemWait,
    SemPost,
    SemClose,
    SemUnlink,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ShmOpen => "shm_open",
            Operation::Ftruncate => "ftruncate",
            Operation::Fstat => "fstat",
            Operation::Mmap => "mmap",
            Operation::Munmap => "munmap",
            Operation::ShmUnlink => "shm_unlink",
            Operation::SemOpen => "sem_open",
            Operation::SemWait => "sem_wait",
            Operation::SemPost => "sem_post",
            Operation::SemClose => "sem_close",
            Operation::SemUnlink => "sem_unlink",
        };
        f.write_str(name)
    }
}

/// A failed operation on a named shared resource
#[derive(Error, Debug)]
#[error("{op} failed for '{name}': {source}")]
pub struct ResourceError {
    pub op: Operation,
    pub name: String,
    #[source]
    pub source: io::Error,
}

impl ResourceError {
    pub fn new(op: Operation, name: impl Into<String>, source: io::Error) -> Self {
        Self {
            op,
            name: name.into(),
            source,
        }
    }

    /// Capture `errno` for a call that just failed.
    pub fn last_os_error(op: Operation, name: impl Into<String>) -> Self {
        Self::new(op, name, io::Error::last_os_error())
    }

    /// True if the resource was missing, e.g. a worker started before the supervisor.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }

    /// True if the resource already existed when exclusive creation was requested.
    pub fn is_already_exists(&self) -> bool {
        self.source.kind() == io::ErrorKind::AlreadyExists
    }
}

pub type Result<T> = std::result::Result<T, Error>;
