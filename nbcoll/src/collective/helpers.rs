use crate::error::{CollectiveError, Result};
use crate::group::Group;
use crate::transport::Transport;
use crate::types::{DataType, Rank};
use std::ops::Range;
use std::sync::Arc;

/// Integer ceiling of log2(n). Returns 0 for n <= 1.
pub(crate) fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        return 0;
    }
    usize::BITS - (n - 1).leading_zeros()
}

/// Largest power of two that is `<= n`. `n` must be at least 1.
pub(crate) fn floor_pow2(n: usize) -> usize {
    if n.is_power_of_two() {
        n
    } else {
        n.next_power_of_two() >> 1
    }
}

/// Byte length of `count` elements of `dtype`.
pub(crate) fn payload_bytes(count: usize, dtype: DataType) -> Result<usize> {
    count
        .checked_mul(dtype.size_in_bytes())
        .ok_or(CollectiveError::CountOverflow { count, dtype })
}

/// The messaging view one operation has of its group.
///
/// Peers are addressed by group-local index; every message travels under the
/// operation's tag. Failures are reported as `CollectiveFailed` naming the
/// global rank of the peer involved.
#[derive(Clone)]
pub struct Exchange {
    transport: Arc<dyn Transport>,
    group: Group,
    tag: u64,
    operation: &'static str,
}

impl Exchange {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        group: Group,
        tag: u64,
        operation: &'static str,
    ) -> Self {
        Self {
            transport,
            group,
            tag,
            operation,
        }
    }

    /// Number of group members.
    pub fn size(&self) -> usize {
        self.group.size()
    }

    /// This process's local index in the group.
    pub fn local_rank(&self) -> usize {
        self.group.local_rank()
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Name of the collective, used in log lines and errors.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    fn peer(&self, local: usize) -> Result<Rank> {
        self.group
            .global_rank(local)
            .ok_or(CollectiveError::InvalidPeer {
                index: local,
                group_size: self.group.size(),
            })
    }

    fn failed(&self, rank: Rank, e: CollectiveError) -> CollectiveError {
        CollectiveError::CollectiveFailed {
            operation: self.operation,
            rank,
            reason: e.to_string(),
        }
    }

    /// Send `data` to the member at local index `dest`.
    pub async fn send(&self, dest: usize, data: &[u8]) -> Result<()> {
        let rank = self.peer(dest)?;
        self.transport
            .send(rank, self.tag, data)
            .await
            .map_err(|e| self.failed(rank, e))
    }

    /// Receive the next message from the member at local index `src`.
    pub async fn recv(&self, src: usize) -> Result<Vec<u8>> {
        let rank = self.peer(src)?;
        self.transport
            .recv(rank, self.tag)
            .await
            .map_err(|e| self.failed(rank, e))
    }

    /// Receive from `src` and check the message is exactly `expected` bytes.
    pub async fn recv_exact(&self, src: usize, expected: usize) -> Result<Vec<u8>> {
        let data = self.recv(src).await?;
        if data.len() != expected {
            return Err(CollectiveError::UnexpectedMessageSize {
                rank: self.peer(src)?,
                expected,
                actual: data.len(),
            });
        }
        Ok(data)
    }

    /// Send to `dest` while receiving exactly `expected` bytes from `src`.
    pub async fn sendrecv(
        &self,
        dest: usize,
        data: &[u8],
        src: usize,
        expected: usize,
    ) -> Result<Vec<u8>> {
        let (_, received) =
            tokio::try_join!(self.send(dest, data), self.recv_exact(src, expected))?;
        Ok(received)
    }

    /// Release transport state kept for this operation's tag.
    pub(crate) fn retire(&self) {
        self.transport.retire(self.tag);
    }

    /// Release transport state for an operation dropped mid-flight.
    pub(crate) fn abandon(&self) {
        self.transport.abandon(self.tag);
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("operation", &self.operation)
            .field("group", &self.group.ranks())
            .field("local_rank", &self.group.local_rank())
            .field("tag", &format_args!("{:#018x}", self.tag))
            .finish()
    }
}

/// Split `count` elements into `parts` contiguous chunks whose sizes differ
/// by at most one. The first `count % parts` chunks get the extra element.
#[derive(Debug, Clone)]
pub(crate) struct ChunkLayout {
    offsets: Vec<usize>,
    total: usize,
}

impl ChunkLayout {
    pub(crate) fn new(count: usize, parts: usize) -> Self {
        let base = count / parts;
        let extra = count % parts;
        let mut offsets = Vec::with_capacity(parts);
        let mut off = 0;
        for i in 0..parts {
            offsets.push(off);
            off += base + usize::from(i < extra);
        }
        Self {
            offsets,
            total: count,
        }
    }

    /// Element range of chunk `i`.
    pub(crate) fn range(&self, i: usize) -> Range<usize> {
        let end = self.offsets.get(i + 1).copied().unwrap_or(self.total);
        self.offsets[i]..end
    }

    pub(crate) fn len(&self, i: usize) -> usize {
        self.range(i).len()
    }
}

/// A transport endpoint and an all-ranks group per rank of a fresh
/// in-process mesh.
#[cfg(test)]
pub(crate) fn test_endpoints(size: u32) -> Vec<(Arc<dyn Transport>, Group)> {
    use crate::context::ProcessContext;
    use crate::transport::LocalTransport;

    LocalTransport::mesh(size)
        .into_iter()
        .map(|t| {
            let ctx = ProcessContext::new(t.rank(), size).unwrap();
            let group = Group::new(&ctx, (0..size).collect(), 0).unwrap();
            (Arc::new(t) as Arc<dyn Transport>, group)
        })
        .collect()
}

/// One connected `Exchange` per rank of a fresh in-process mesh.
#[cfg(test)]
pub(crate) fn test_exchanges(size: u32, operation: &'static str) -> Vec<Exchange> {
    test_endpoints(size)
        .into_iter()
        .map(|(transport, group)| {
            let tag = group.next_tag();
            Exchange::new(transport, group, tag, operation)
        })
        .collect()
}

/// Run `f` once per rank concurrently and collect the results in rank order.
#[cfg(test)]
pub(crate) async fn run_exchanges<F, Fut, T>(size: u32, operation: &'static str, f: F) -> Vec<T>
where
    F: Fn(Exchange) -> Fut,
    Fut: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = test_exchanges(size, operation)
        .into_iter()
        .map(|ex| tokio::spawn(f(ex)))
        .collect();
    let mut out = Vec::with_capacity(handles.len());
    for h in handles {
        out.push(h.await.unwrap());
    }
    out
}
