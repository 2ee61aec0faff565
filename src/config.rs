//! Configuration for the supervisor and generator processes.

use std::env;

use crate::error::ParseError;

/// Number of slots in the shared circular buffer.
pub const BUFFER_CAPACITY: usize = 128;

/// Namespace used when `THREECOL_NAMESPACE` is not set.
pub const DEFAULT_NAMESPACE: &str = "threecol";

/// Environment variable that overrides the resource namespace.
pub const NAMESPACE_ENV: &str = "THREECOL_NAMESPACE";

/// Well-known names of the four shared resources.
///
/// Supervisor and generators must agree on these; they are the whole
/// rendezvous protocol between the processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub shm: String,
    pub used_slots: String,
    pub free_slots: String,
    pub mutex: String,
}

impl ResourceNames {
    /// Derive the names for a namespace, e.g. `threecol` gives `/threecol_shm`.
    pub fn for_namespace(namespace: &str) -> Result<Self, ParseError> {
        let names = Self {
            shm: format!("/{}_shm", namespace),
            used_slots: format!("/{}_used", namespace),
            free_slots: format!("/{}_free", namespace),
            mutex: format!("/{}_mutex", namespace),
        };
        for name in names.iter() {
            validate_name(name)?;
        }
        Ok(names)
    }

    /// Names from `THREECOL_NAMESPACE`, falling back to the default namespace.
    pub fn from_env() -> Result<Self, ParseError> {
        match env::var(NAMESPACE_ENV) {
            Ok(ns) if !ns.is_empty() => Self::for_namespace(&ns),
            _ => Self::for_namespace(DEFAULT_NAMESPACE),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.shm.as_str(),
            self.used_slots.as_str(),
            self.free_slots.as_str(),
            self.mutex.as_str(),
        ]
        .into_iter()
    }
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self {
            shm: format!("/{}_shm", DEFAULT_NAMESPACE),
            used_slots: format!("/{}_used", DEFAULT_NAMESPACE),
            free_slots: format!("/{}_free", DEFAULT_NAMESPACE),
            mutex: format!("/{}_mutex", DEFAULT_NAMESPACE),
        }
    }
}

/// Check a POSIX IPC name: one leading slash, nothing else that is special.
fn validate_name(name: &str) -> Result<(), ParseError> {
    let invalid = |reason| ParseError::InvalidName {
        name: name.to_string(),
        reason,
    };
    let rest = name
        .strip_prefix('/')
        .ok_or_else(|| invalid("must start with '/'"))?;
    if rest.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if rest.contains('/') {
        return Err(invalid("must not contain '/' after the first character"));
    }
    if rest.contains('\0') {
        return Err(invalid("must not contain NUL"));
    }
    // NAME_MAX minus the "sem." prefix glibc adds for semaphores
    if rest.len() > 251 {
        return Err(invalid("too long"));
    }
    Ok(())
}

/// Configuration for the supervisor (consumer) process.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    pub names: ResourceNames,
}

impl CoordinatorConfig {
    pub fn with_names(mut self, names: ResourceNames) -> Self {
        self.names = names;
        self
    }
}

/// Configuration for a generator (producer) process.
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    pub names: ResourceNames,
    /// Seed for the coloring RNG (None = seeded from the OS)
    pub seed: Option<u64>,
}

impl WorkerConfig {
    pub fn with_names(mut self, names: ResourceNames) -> Self {
        self.names = names;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_option(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}
