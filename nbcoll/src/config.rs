//! Runtime-configurable defaults for nbcoll.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `NBCOLL_`) or by constructing a custom `CollConfig`.

use crate::types::{Algorithm, CollectiveKind};

/// Default algorithm choices and runtime sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollConfig {
    /// Algorithm used when a broadcast is built without an explicit one.
    pub broadcast_algorithm: Algorithm,

    /// Algorithm used when an allreduce is built without an explicit one.
    pub allreduce_algorithm: Algorithm,

    /// Algorithm used when an allgatherv is built without an explicit one.
    pub allgatherv_algorithm: Algorithm,

    /// Worker threads for the runtime owned by a `SyncCommunicator`.
    /// `None` keeps tokio's default (one per core).
    pub worker_threads: Option<usize>,
}

impl Default for CollConfig {
    fn default() -> Self {
        Self {
            broadcast_algorithm: Algorithm::SendToAll,
            allreduce_algorithm: Algorithm::Ring,
            allgatherv_algorithm: Algorithm::Ring,
            worker_threads: None,
        }
    }
}

impl CollConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `NBCOLL_BROADCAST_ALGORITHM`
    /// - `NBCOLL_ALLREDUCE_ALGORITHM`
    /// - `NBCOLL_ALLGATHERV_ALGORITHM`
    /// - `NBCOLL_WORKER_THREADS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        let algorithm_vars = [
            ("NBCOLL_BROADCAST_ALGORITHM", &mut cfg.broadcast_algorithm),
            ("NBCOLL_ALLREDUCE_ALGORITHM", &mut cfg.allreduce_algorithm),
            ("NBCOLL_ALLGATHERV_ALGORITHM", &mut cfg.allgatherv_algorithm),
        ];
        for (key, slot) in algorithm_vars {
            if let Some(v) = lookup(key) {
                match v.parse::<Algorithm>() {
                    Ok(alg) => *slot = alg,
                    Err(e) => tracing::warn!(key, value = %v, error = %e, "ignoring invalid value"),
                }
            }
        }

        if let Some(v) = lookup("NBCOLL_WORKER_THREADS") {
            match v.parse::<usize>() {
                Ok(n) if n > 0 => cfg.worker_threads = Some(n),
                _ => tracing::warn!(
                    key = "NBCOLL_WORKER_THREADS",
                    value = %v,
                    "ignoring invalid value"
                ),
            }
        }

        cfg
    }

    /// The configured default algorithm for `kind`.
    pub fn default_algorithm(&self, kind: CollectiveKind) -> Algorithm {
        match kind {
            CollectiveKind::Broadcast => self.broadcast_algorithm,
            CollectiveKind::Allreduce => self.allreduce_algorithm,
            CollectiveKind::Allgatherv => self.allgatherv_algorithm,
        }
    }
}
