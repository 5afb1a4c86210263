use crate::client::Communicator;
use crate::config::CollConfig;
use crate::element::Element;
use crate::error::{CollectiveError, Result};
use crate::group::Group;
use crate::operation::Operation;
use crate::types::{Algorithm, DataType, Rank, ReduceOp};

/// Blocking wrapper around [`Communicator`].
///
/// Owns a `tokio::runtime::Runtime`; algorithm tasks run on its workers and
/// [`wait_for_completion`](Self::wait_for_completion) calls `block_on()`.
pub struct SyncCommunicator {
    inner: Communicator,
    rt: tokio::runtime::Runtime,
}

fn build_runtime(config: &CollConfig) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(n) = config.worker_threads {
        builder.worker_threads(n);
    }
    builder
        .build()
        .map_err(|e| CollectiveError::transport_with_source("tokio runtime", e))
}

impl SyncCommunicator {
    /// Bootstrap an in-process mesh and return one blocking communicator per
    /// rank, each with its own runtime.
    pub fn bootstrap_local(world_size: u32) -> Result<Vec<Self>> {
        Communicator::bootstrap_local(world_size)?
            .into_iter()
            .map(Self::from_async)
            .collect()
    }

    /// Wrap an existing communicator with a new runtime sized by its config.
    pub fn from_async(inner: Communicator) -> Result<Self> {
        let rt = build_runtime(inner.config())?;
        Ok(Self { inner, rt })
    }

    pub fn inner(&self) -> &Communicator {
        &self.inner
    }

    pub fn rank(&self) -> Rank {
        self.inner.rank()
    }

    pub fn size(&self) -> u32 {
        self.inner.size()
    }

    pub fn group(&self, ranks: impl IntoIterator<Item = Rank>) -> Result<Group> {
        self.inner.group(ranks)
    }

    pub fn group_all(&self) -> Result<Group> {
        self.inner.group_all()
    }

    pub fn broadcast(
        &self,
        group: &Group,
        count: usize,
        root: usize,
        dtype: DataType,
        algorithm: Option<Algorithm>,
    ) -> Result<Operation> {
        self.inner.broadcast(group, count, root, dtype, algorithm)
    }

    pub fn allreduce(
        &self,
        group: &Group,
        count: usize,
        op: ReduceOp,
        dtype: DataType,
        algorithm: Option<Algorithm>,
    ) -> Result<Operation> {
        self.inner.allreduce(group, count, op, dtype, algorithm)
    }

    pub fn allgatherv(
        &self,
        group: &Group,
        count: usize,
        dtype: DataType,
        algorithm: Option<Algorithm>,
    ) -> Result<Operation> {
        self.inner.allgatherv(group, count, dtype, algorithm)
    }

    /// Start `op` on this communicator's runtime. Returns without waiting on
    /// any peer.
    pub fn start<T: Element>(&self, op: &mut Operation, input: Option<&[T]>) -> Result<()> {
        let _guard = self.rt.enter();
        op.start(input)
    }

    /// Block the calling thread until `op` completes.
    pub fn wait_for_completion<T: Element>(&self, op: &mut Operation) -> Result<Vec<T>> {
        self.rt.block_on(op.wait_for_completion())
    }

    /// Block until every member of `group` has entered the barrier.
    pub fn barrier(&self, group: &Group) -> Result<()> {
        self.rt.block_on(self.inner.barrier(group))
    }
}
