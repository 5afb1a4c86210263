//! Algorithm lookup by (collective kind, element type, algorithm name).
//!
//! The process-wide table is built once, either lazily from
//! [`AlgorithmRegistry::builtin`] on first use or from a table passed to
//! [`install`] before that, and is never mutated afterwards.

use crate::collective::{
    CollectiveAlgorithm, LinearBroadcast, RecursiveDoublingAllreduce, RingAllgatherv,
    RingAllreduce, SendToAllBroadcast,
};
use crate::element::Element;
use crate::error::{CollectiveError, Result};
use crate::types::{Algorithm, CollectiveKind, DataType};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Builds a fresh algorithm instance.
pub type AlgorithmFactory = fn() -> Arc<dyn CollectiveAlgorithm>;

/// Registry key.
pub type AlgorithmKey = (CollectiveKind, DataType, Algorithm);

static GLOBAL: OnceLock<AlgorithmRegistry> = OnceLock::new();

/// The process-wide registry, initialized with the built-in algorithms on
/// first use.
pub fn global() -> &'static AlgorithmRegistry {
    GLOBAL.get_or_init(AlgorithmRegistry::builtin)
}

/// Install `registry` as the process-wide table.
///
/// Fails with `RegistryInitialized` if the table was already installed or
/// already used.
pub fn install(registry: AlgorithmRegistry) -> Result<&'static AlgorithmRegistry> {
    GLOBAL
        .set(registry)
        .map_err(|_| CollectiveError::RegistryInitialized)?;
    Ok(global())
}

/// Mapping from [`AlgorithmKey`] to the factory implementing it.
#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    factories: HashMap<AlgorithmKey, AlgorithmFactory>,
}

fn send_to_all() -> Arc<dyn CollectiveAlgorithm> {
    Arc::new(SendToAllBroadcast)
}

fn linear() -> Arc<dyn CollectiveAlgorithm> {
    Arc::new(LinearBroadcast)
}

fn ring_allgatherv() -> Arc<dyn CollectiveAlgorithm> {
    Arc::new(RingAllgatherv)
}

fn ring_allreduce<T: Element>() -> Arc<dyn CollectiveAlgorithm> {
    Arc::new(RingAllreduce::<T>::new())
}

fn recursive_doubling_allreduce<T: Element>() -> Arc<dyn CollectiveAlgorithm> {
    Arc::new(RecursiveDoublingAllreduce::<T>::new())
}

impl AlgorithmRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in algorithm for every element type.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        for dtype in DataType::ALL {
            reg.register(CollectiveKind::Broadcast, dtype, Algorithm::SendToAll, send_to_all);
            reg.register(CollectiveKind::Broadcast, dtype, Algorithm::Linear, linear);
            reg.register(CollectiveKind::Allgatherv, dtype, Algorithm::Ring, ring_allgatherv);
        }
        reg.register_allreduce::<i32>();
        reg.register_allreduce::<i16>();
        reg.register_allreduce::<i64>();
        reg.register_allreduce::<f32>();
        reg.register_allreduce::<f64>();
        reg.register_allreduce::<bool>();
        reg
    }

    fn register_allreduce<T: Element>(&mut self) {
        self.register(
            CollectiveKind::Allreduce,
            T::DTYPE,
            Algorithm::Ring,
            ring_allreduce::<T>,
        );
        self.register(
            CollectiveKind::Allreduce,
            T::DTYPE,
            Algorithm::RecursiveDoubling,
            recursive_doubling_allreduce::<T>,
        );
    }

    /// Add or replace an entry. Returns the factory previously registered
    /// under the same key, if any.
    pub fn register(
        &mut self,
        kind: CollectiveKind,
        dtype: DataType,
        algorithm: Algorithm,
        factory: AlgorithmFactory,
    ) -> Option<AlgorithmFactory> {
        self.factories.insert((kind, dtype, algorithm), factory)
    }

    /// Build the algorithm registered under the triple.
    pub fn resolve(
        &self,
        kind: CollectiveKind,
        dtype: DataType,
        algorithm: Algorithm,
    ) -> Result<Arc<dyn CollectiveAlgorithm>> {
        self.factories
            .get(&(kind, dtype, algorithm))
            .map(|factory| factory())
            .ok_or(CollectiveError::UnknownAlgorithm {
                kind,
                dtype,
                algorithm,
            })
    }

    pub fn contains(&self, kind: CollectiveKind, dtype: DataType, algorithm: Algorithm) -> bool {
        self.factories.contains_key(&(kind, dtype, algorithm))
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<AlgorithmKey> {
        let mut keys: Vec<_> = self.factories.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}
