//! Named shared resources: the memory segment, the semaphores and the
//! record that lives in the segment.

pub mod segment;
pub mod semaphore;
pub mod state;

pub use segment::{ShmSegment, unlink_segment};
pub use semaphore::{NamedSemaphore, Wait, unlink_semaphore};
pub use state::SharedState;

use std::ffi::CString;
use std::io;

use crate::error::{Operation, ResourceError};

fn c_name(op: Operation, name: &str) -> Result<CString, ResourceError> {
    CString::new(name).map_err(|_| {
        ResourceError::new(
            op,
            name,
            io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"),
        )
    })
}

/// Kind of a named resource, which decides how its name is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Segment,
    Semaphore,
}

/// Names created by this process that it is responsible for removing.
///
/// If the owner fails before its orderly teardown, dropping this removes
/// the names so a restart does not trip over stale objects.
#[derive(Debug, Default)]
pub struct CreatedResources {
    names: Vec<(ResourceKind, String)>,
}

impl CreatedResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ResourceKind, name: &str) {
        self.names.push((kind, name.to_string()));
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Remove every name, stopping at the first failure.
    pub fn unlink_all(mut self) -> Result<(), ResourceError> {
        let names = std::mem::take(&mut self.names);
        for (kind, name) in &names {
            match kind {
                ResourceKind::Segment => unlink_segment(name)?,
                ResourceKind::Semaphore => unlink_semaphore(name)?,
            }
            tracing::debug!(name = %name, "unlinked");
        }
        Ok(())
    }
}

impl Drop for CreatedResources {
    fn drop(&mut self) {
        for (kind, name) in self.names.drain(..) {
            let result = match kind {
                ResourceKind::Segment => unlink_segment(&name),
                ResourceKind::Semaphore => unlink_semaphore(&name),
            };
            if let Err(e) = result {
                tracing::warn!("cleanup after failure: {}", e);
            }
        }
    }
}
