use crate::collective::helpers::{ChunkLayout, Exchange, floor_pow2};
use crate::collective::{CollectiveAlgorithm, CollectiveJob, CollectiveParams};
use crate::element::{Element, decode, encode};
use crate::error::{CollectiveError, Result};
use crate::reduce::Reducer;
use futures::future::BoxFuture;
use std::marker::PhantomData;

fn reducer_for<T: Element>(
    params: &CollectiveParams,
    algorithm: &'static str,
) -> Result<Reducer<T>> {
    match *params {
        CollectiveParams::Allreduce { op } => Reducer::new(op),
        other => Err(CollectiveError::ParamsMismatch {
            algorithm,
            kind: other.kind(),
        }),
    }
}

/// Ring allreduce for element type `T`.
///
/// The buffer is cut into one chunk per member. A reduce-scatter pass of
/// `size - 1` rounds leaves each member holding one fully reduced chunk, and
/// an allgather pass of `size - 1` rounds circulates the reduced chunks.
/// Each chunk is combined along a single path around the ring, so every
/// member ends with bit-identical results.
pub struct RingAllreduce<T>(PhantomData<fn() -> T>);

impl<T> RingAllreduce<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for RingAllreduce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> CollectiveAlgorithm for RingAllreduce<T> {
    fn validate(&self, params: &CollectiveParams) -> Result<()> {
        reducer_for::<T>(params, "ring allreduce").map(|_| ())
    }

    fn run(&self, job: CollectiveJob) -> BoxFuture<'static, Result<Vec<u8>>> {
        Box::pin(async move {
            let reducer = reducer_for::<T>(&job.params, "ring allreduce")?;
            let buf = decode::<T>(&job.input)?;
            let buf = ring_allreduce(&job.exchange, reducer, buf).await?;
            Ok(encode(&buf))
        })
    }
}

async fn ring_allreduce<T: Element>(
    ex: &Exchange,
    reducer: Reducer<T>,
    mut buf: Vec<T>,
) -> Result<Vec<T>> {
    let world = ex.size();
    let rank = ex.local_rank();
    if world <= 1 || buf.is_empty() {
        return Ok(buf);
    }

    let elem_size = T::DTYPE.size_in_bytes();
    let layout = ChunkLayout::new(buf.len(), world);
    let next = (rank + 1) % world;
    let prev = (rank + world - 1) % world;

    // Reduce-scatter: after the last step this rank owns chunk `rank + 1`.
    for step in 0..(world - 1) {
        let send_idx = (rank + world - step) % world;
        let recv_idx = (rank + world - step - 1) % world;

        let outgoing = encode(&buf[layout.range(send_idx)]);
        let received = ex
            .sendrecv(next, &outgoing, prev, layout.len(recv_idx) * elem_size)
            .await?;
        let incoming = decode::<T>(&received)?;
        // The partial sum arriving from upstream is the left operand.
        reducer.reduce_into_rev(&mut buf[layout.range(recv_idx)], &incoming);
        tracing::trace!(operation = ex.operation(), step, chunk = recv_idx, "reduce-scatter");
    }

    // Allgather: circulate the reduced chunks.
    for step in 0..(world - 1) {
        let send_idx = (rank + world + 1 - step) % world;
        let recv_idx = (rank + world - step) % world;

        let outgoing = encode(&buf[layout.range(send_idx)]);
        let received = ex
            .sendrecv(next, &outgoing, prev, layout.len(recv_idx) * elem_size)
            .await?;
        let incoming = decode::<T>(&received)?;
        buf[layout.range(recv_idx)].copy_from_slice(&incoming);
        tracing::trace!(operation = ex.operation(), step, chunk = recv_idx, "allgather");
    }

    Ok(buf)
}

/// Recursive-doubling allreduce for element type `T`.
///
/// Members exchange their whole running reduction with the partner at
/// stride 1, 2, 4, ... over the largest power-of-two subset. In a group of
/// another size, each member past that subset first folds its buffer into
/// a partner inside it and receives the final result back at the end.
///
/// Both partners of an exchange combine as `op(lower, higher)`, so results
/// stay bit-identical across members for floating-point types.
pub struct RecursiveDoublingAllreduce<T>(PhantomData<fn() -> T>);

impl<T> RecursiveDoublingAllreduce<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for RecursiveDoublingAllreduce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> CollectiveAlgorithm for RecursiveDoublingAllreduce<T> {
    fn validate(&self, params: &CollectiveParams) -> Result<()> {
        reducer_for::<T>(params, "recursive_doubling allreduce").map(|_| ())
    }

    fn run(&self, job: CollectiveJob) -> BoxFuture<'static, Result<Vec<u8>>> {
        Box::pin(async move {
            let reducer = reducer_for::<T>(&job.params, "recursive_doubling allreduce")?;
            let buf = decode::<T>(&job.input)?;
            let buf = recursive_doubling_allreduce(&job.exchange, reducer, buf).await?;
            Ok(encode(&buf))
        })
    }
}

async fn recursive_doubling_allreduce<T: Element>(
    ex: &Exchange,
    reducer: Reducer<T>,
    mut buf: Vec<T>,
) -> Result<Vec<T>> {
    let world = ex.size();
    let rank = ex.local_rank();
    if world <= 1 || buf.is_empty() {
        return Ok(buf);
    }

    let total_bytes = buf.len() * T::DTYPE.size_in_bytes();
    let p2 = floor_pow2(world);
    let excess = world - p2;

    // Ranks past the power-of-two subset hand their data to `rank - p2` and
    // wait for the result.
    if rank >= p2 {
        let partner = rank - p2;
        ex.send(partner, &encode(&buf)).await?;
        let received = ex.recv_exact(partner, total_bytes).await?;
        return decode::<T>(&received);
    }

    if rank < excess {
        let received = ex.recv_exact(rank + p2, total_bytes).await?;
        reducer.reduce_into(&mut buf, &decode::<T>(&received)?);
    }

    let mut mask = 1;
    while mask < p2 {
        let partner = rank ^ mask;
        let received = ex
            .sendrecv(partner, &encode(&buf), partner, total_bytes)
            .await?;
        let incoming = decode::<T>(&received)?;
        if partner < rank {
            reducer.reduce_into_rev(&mut buf, &incoming);
        } else {
            reducer.reduce_into(&mut buf, &incoming);
        }
        tracing::trace!(operation = ex.operation(), mask, partner, "exchange");
        mask <<= 1;
    }

    if rank < excess {
        ex.send(rank + p2, &encode(&buf)).await?;
    }

    Ok(buf)
}
