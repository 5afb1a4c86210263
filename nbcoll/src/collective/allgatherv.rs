use crate::collective::helpers::{Exchange, payload_bytes};
use crate::collective::{CollectiveAlgorithm, CollectiveJob, CollectiveParams};
use crate::error::{CollectiveError, Result};
use futures::future::BoxFuture;

/// Ring allgather with per-member counts.
///
/// Counts are first circulated with a ring allgather of fixed-size
/// segments; the data ring then knows the exact size of every segment it
/// receives. The result is the concatenation of all contributions in
/// ascending local rank order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingAllgatherv;

fn check_params(params: &CollectiveParams) -> Result<()> {
    match params {
        CollectiveParams::Allgatherv => Ok(()),
        other => Err(CollectiveError::ParamsMismatch {
            algorithm: "ring allgatherv",
            kind: other.kind(),
        }),
    }
}

impl CollectiveAlgorithm for RingAllgatherv {
    fn validate(&self, params: &CollectiveParams) -> Result<()> {
        check_params(params)
    }

    fn run(&self, job: CollectiveJob) -> BoxFuture<'static, Result<Vec<u8>>> {
        Box::pin(async move {
            check_params(&job.params)?;
            let ex = &job.exchange;
            let counts = exchange_counts(ex, job.count).await?;
            tracing::trace!(operation = ex.operation(), ?counts, "counts exchanged");
            let lengths = counts
                .iter()
                .map(|&c| payload_bytes(c, job.dtype))
                .collect::<Result<Vec<_>>>()?;

            let mut segments = vec![Vec::new(); ex.size()];
            segments[ex.local_rank()] = job.input;
            let segments = ring_allgather(ex, segments, |i| lengths[i]).await?;
            Ok(segments.concat())
        })
    }
}

const COUNT_BYTES: usize = std::mem::size_of::<u64>();

/// Every member's element count, indexed by local rank.
async fn exchange_counts(ex: &Exchange, count: usize) -> Result<Vec<usize>> {
    let mut segments = vec![Vec::new(); ex.size()];
    segments[ex.local_rank()] = (count as u64).to_le_bytes().to_vec();
    let segments = ring_allgather(ex, segments, |_| COUNT_BYTES).await?;

    segments
        .iter()
        .map(|s| {
            let raw: [u8; COUNT_BYTES] = s
                .as_slice()
                .try_into()
                .map_err(|_| CollectiveError::transport("malformed count segment"))?;
            usize::try_from(u64::from_le_bytes(raw))
                .map_err(|e| CollectiveError::transport_with_source("count overflows usize", e))
        })
        .collect()
}

/// Fill `segments` so every member holds every member's segment.
///
/// On entry only `segments[local_rank]` is populated. `expected_len(i)` is the
/// byte length of segment `i`.
async fn ring_allgather(
    ex: &Exchange,
    mut segments: Vec<Vec<u8>>,
    expected_len: impl Fn(usize) -> usize,
) -> Result<Vec<Vec<u8>>> {
    let world = ex.size();
    let rank = ex.local_rank();
    if world <= 1 {
        return Ok(segments);
    }

    let next = (rank + 1) % world;
    let prev = (rank + world - 1) % world;

    // Each round forwards the segment received in the previous round.
    for step in 0..(world - 1) {
        let send_idx = (rank + world - step) % world;
        let recv_idx = (rank + world - step - 1) % world;

        let received = ex
            .sendrecv(next, &segments[send_idx], prev, expected_len(recv_idx))
            .await?;
        segments[recv_idx] = received;
    }

    Ok(segments)
}
