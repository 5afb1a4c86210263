use crate::collective::helpers::payload_bytes;
use crate::collective::{CollectiveAlgorithm, CollectiveJob, CollectiveParams};
use crate::error::{CollectiveError, Result};
use futures::future::{BoxFuture, try_join_all};

fn broadcast_root(params: &CollectiveParams, algorithm: &'static str) -> Result<usize> {
    match *params {
        CollectiveParams::Broadcast { root } => Ok(root),
        other => Err(CollectiveError::ParamsMismatch {
            algorithm,
            kind: other.kind(),
        }),
    }
}

/// Flat broadcast: the root sends its buffer to every other member
/// concurrently; every other member receives once from the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendToAllBroadcast;

impl CollectiveAlgorithm for SendToAllBroadcast {
    fn validate(&self, params: &CollectiveParams) -> Result<()> {
        broadcast_root(params, "send_to_all broadcast").map(|_| ())
    }

    fn run(&self, job: CollectiveJob) -> BoxFuture<'static, Result<Vec<u8>>> {
        Box::pin(async move {
            let root = broadcast_root(&job.params, "send_to_all broadcast")?;
            let ex = &job.exchange;
            if job.count == 0 {
                return Ok(Vec::new());
            }
            if ex.size() <= 1 {
                return Ok(job.input);
            }
            let total_bytes = payload_bytes(job.count, job.dtype)?;

            if ex.local_rank() == root {
                let data = job.input;
                let sends: Vec<_> = (0..ex.size())
                    .filter(|&r| r != root)
                    .map(|r| ex.send(r, &data))
                    .collect();
                try_join_all(sends).await?;
                Ok(data)
            } else {
                ex.recv_exact(root, total_bytes).await
            }
        })
    }
}

/// Chain broadcast. Members are ordered starting at the root; each one
/// receives from its predecessor and forwards to its successor, so no member
/// sends more than once.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearBroadcast;

impl CollectiveAlgorithm for LinearBroadcast {
    fn validate(&self, params: &CollectiveParams) -> Result<()> {
        broadcast_root(params, "linear broadcast").map(|_| ())
    }

    fn run(&self, job: CollectiveJob) -> BoxFuture<'static, Result<Vec<u8>>> {
        Box::pin(async move {
            let root = broadcast_root(&job.params, "linear broadcast")?;
            let ex = &job.exchange;
            if job.count == 0 {
                return Ok(Vec::new());
            }
            let n = ex.size();
            let me = ex.local_rank();
            let total_bytes = payload_bytes(job.count, job.dtype)?;

            // Position in the chain; the root is 0.
            let pos = (me + n - root) % n;

            let data = if pos == 0 {
                job.input
            } else {
                ex.recv_exact((me + n - 1) % n, total_bytes).await?
            };
            if pos + 1 < n {
                ex.send((me + 1) % n, &data).await?;
                tracing::trace!(operation = ex.operation(), pos, "forwarded along chain");
            }
            Ok(data)
        })
    }
}
