use crate::collective::{CollectiveParams, Exchange, dissemination_barrier};
use crate::config::CollConfig;
use crate::context::ProcessContext;
use crate::error::{CollectiveError, Result};
use crate::group::Group;
use crate::operation::Operation;
use crate::registry::{self, AlgorithmRegistry};
use crate::transport::{LocalTransport, Transport};
use crate::types::{Algorithm, DataType, Rank, ReduceOp};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Entry point for one rank: builds groups and collective operations.
///
/// # Example
///
/// ```no_run
/// use nbcoll::{Communicator, DataType, ReduceOp};
///
/// # async fn example() -> nbcoll::Result<()> {
/// let comms = Communicator::bootstrap_local(4)?;
/// let comm = &comms[0];
/// let group = comm.group_all()?;
///
/// let mut op = comm.allreduce(&group, 3, ReduceOp::Sum, DataType::Float, None)?;
/// op.start(Some(&[1.0f32, 2.0, 3.0]))?;
/// let summed: Vec<f32> = op.wait_for_completion().await?;
/// # Ok(())
/// # }
/// ```
pub struct Communicator {
    ctx: ProcessContext,
    transport: Arc<dyn Transport>,
    config: CollConfig,
    registry: &'static AlgorithmRegistry,
    /// Groups built so far per rank list. Members build groups in the same
    /// order, so the count agrees across them and feeds the group id.
    generations: Mutex<HashMap<Vec<Rank>, u64>>,
}

impl Communicator {
    /// Wrap a transport endpoint. `ctx.rank()` must be the rank the transport
    /// sends from.
    pub fn new(ctx: ProcessContext, transport: Arc<dyn Transport>, config: CollConfig) -> Self {
        Self {
            ctx,
            transport,
            config,
            registry: registry::global(),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// `world_size` communicators connected through an in-process mesh,
    /// configured from the environment. Element `i` is rank `i`.
    pub fn bootstrap_local(world_size: u32) -> Result<Vec<Self>> {
        Self::bootstrap_local_with_config(world_size, CollConfig::from_env())
    }

    /// Same as [`bootstrap_local`](Self::bootstrap_local) with an explicit
    /// config.
    pub fn bootstrap_local_with_config(world_size: u32, config: CollConfig) -> Result<Vec<Self>> {
        if world_size == 0 {
            return Err(CollectiveError::EmptyContext);
        }
        LocalTransport::mesh(world_size)
            .into_iter()
            .map(|t| {
                let ctx = ProcessContext::new(t.rank(), world_size)?;
                Ok(Self::new(ctx, Arc::new(t), config.clone()))
            })
            .collect()
    }

    /// This process's global rank.
    pub fn rank(&self) -> Rank {
        self.ctx.rank()
    }

    /// Total number of ranks.
    pub fn size(&self) -> u32 {
        self.ctx.size()
    }

    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }

    pub fn config(&self) -> &CollConfig {
        &self.config
    }

    /// Build a group from an ordered list of global ranks.
    ///
    /// Repeated ranks are dropped, keeping the first occurrence. Fails if the
    /// list is empty, names a rank outside the process context, or does not
    /// include this rank.
    pub fn group(&self, ranks: impl IntoIterator<Item = Rank>) -> Result<Group> {
        let ranks = Group::dedup(ranks);
        let mut generations = self
            .generations
            .lock()
            .map_err(|_| CollectiveError::LockPoisoned("group generations"))?;
        let generation = generations.get(&ranks).copied().unwrap_or(0);
        let group = Group::new(&self.ctx, ranks.clone(), generation)?;
        generations.insert(ranks, generation + 1);
        Ok(group)
    }

    /// A group of every rank in ascending order.
    pub fn group_all(&self) -> Result<Group> {
        self.group(self.ctx.all_ranks())
    }

    fn check_membership(&self, group: &Group) -> Result<()> {
        if group.global_rank(group.local_rank()) != Some(self.rank()) {
            return Err(CollectiveError::NotAMember {
                rank: self.rank(),
                members: group.ranks().to_vec(),
            });
        }
        Ok(())
    }

    fn build(
        &self,
        group: &Group,
        params: CollectiveParams,
        dtype: DataType,
        count: usize,
        algorithm: Option<Algorithm>,
    ) -> Result<Operation> {
        self.check_membership(group)?;
        let kind = params.kind();
        let algorithm = algorithm.unwrap_or_else(|| self.config.default_algorithm(kind));
        let implementation = self.registry.resolve(kind, dtype, algorithm)?;
        if let CollectiveParams::Allreduce { op } = params
            && !op.supports(dtype)
        {
            return Err(CollectiveError::IncompatibleReduceOp { op, dtype });
        }

        Operation::new(
            Arc::clone(&self.transport),
            group,
            params,
            dtype,
            count,
            algorithm,
            implementation,
        )
    }

    /// Broadcast `count` elements from the member at local index `root`.
    pub fn broadcast(
        &self,
        group: &Group,
        count: usize,
        root: usize,
        dtype: DataType,
        algorithm: Option<Algorithm>,
    ) -> Result<Operation> {
        self.build(
            group,
            CollectiveParams::Broadcast { root },
            dtype,
            count,
            algorithm,
        )
    }

    /// Combine `count` elements from every member with `op`.
    pub fn allreduce(
        &self,
        group: &Group,
        count: usize,
        op: ReduceOp,
        dtype: DataType,
        algorithm: Option<Algorithm>,
    ) -> Result<Operation> {
        self.build(
            group,
            CollectiveParams::Allreduce { op },
            dtype,
            count,
            algorithm,
        )
    }

    /// Concatenate every member's contribution; `count` is this rank's
    /// contribution and may differ between members.
    pub fn allgatherv(
        &self,
        group: &Group,
        count: usize,
        dtype: DataType,
        algorithm: Option<Algorithm>,
    ) -> Result<Operation> {
        self.build(group, CollectiveParams::Allgatherv, dtype, count, algorithm)
    }

    /// Block until every member of `group` has entered the barrier.
    pub async fn barrier(&self, group: &Group) -> Result<()> {
        self.check_membership(group)?;
        let exchange = Exchange::new(
            Arc::clone(&self.transport),
            group.clone(),
            group.next_tag(),
            "barrier",
        );
        let result = dissemination_barrier(&exchange).await;
        exchange.retire();
        tracing::debug!(group_size = group.size(), ok = result.is_ok(), "barrier done");
        result
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.ctx.rank())
            .field("size", &self.ctx.size())
            .field("config", &self.config)
            .finish()
    }
}
