//! Collective algorithms.
//!
//! Each algorithm is a [`CollectiveAlgorithm`]: given the operation's
//! [`Exchange`] and the local input bytes, it runs every round the pattern
//! needs and returns this rank's result bytes. Algorithms are looked up
//! through the [`AlgorithmRegistry`](crate::AlgorithmRegistry).

mod allgatherv;
mod allreduce;
mod barrier;
mod broadcast;
mod handle;
pub(crate) mod helpers;

pub use allgatherv::RingAllgatherv;
pub use allreduce::{RecursiveDoublingAllreduce, RingAllreduce};
pub use broadcast::{LinearBroadcast, SendToAllBroadcast};
pub use helpers::Exchange;

pub(crate) use barrier::dissemination_barrier;
pub(crate) use handle::CollectiveHandle;

use crate::error::Result;
use crate::types::{CollectiveKind, DataType, ReduceOp};
use futures::future::BoxFuture;

/// Per-kind parameters of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectiveParams {
    /// `root` is a group-local index.
    Broadcast { root: usize },
    Allreduce { op: ReduceOp },
    Allgatherv,
}

impl CollectiveParams {
    pub fn kind(&self) -> CollectiveKind {
        match self {
            CollectiveParams::Broadcast { .. } => CollectiveKind::Broadcast,
            CollectiveParams::Allreduce { .. } => CollectiveKind::Allreduce,
            CollectiveParams::Allgatherv => CollectiveKind::Allgatherv,
        }
    }
}

/// Everything an algorithm needs for one run.
#[derive(Debug)]
pub struct CollectiveJob {
    pub exchange: Exchange,
    pub params: CollectiveParams,
    pub dtype: DataType,
    /// Element count declared at construction. For allgatherv this is the
    /// local contribution only.
    pub count: usize,
    /// Encoded local input. Empty on non-root broadcast ranks.
    pub input: Vec<u8>,
}

/// One algorithm implementing one collective for one element type.
pub trait CollectiveAlgorithm: Send + Sync {
    /// Reject parameters this algorithm cannot run with. Called once when an
    /// operation is constructed, before any message is sent.
    fn validate(&self, _params: &CollectiveParams) -> Result<()> {
        Ok(())
    }

    /// Run every round and return the encoded local result.
    fn run(&self, job: CollectiveJob) -> BoxFuture<'static, Result<Vec<u8>>>;
}
