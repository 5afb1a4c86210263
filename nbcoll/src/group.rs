use crate::context::ProcessContext;
use crate::error::{CollectiveError, Result};
use crate::types::Rank;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(mut h: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// An ordered set of global ranks that take part in collective operations.
///
/// Members get a dense local index `0..size` in the order the ranks were
/// supplied. Membership is fixed at construction.
///
/// Build groups through [`Communicator::group`](crate::Communicator::group)
/// or [`Communicator::group_all`](crate::Communicator::group_all). Every
/// member must build its groups, and the operations on them, in the same
/// order: the construction order is what keeps the traffic of different
/// operations apart.
#[derive(Debug, Clone)]
pub struct Group {
    ranks: Arc<[Rank]>,
    local_rank: usize,
    id: u64,
    next_seq: Arc<AtomicU64>,
}

impl Group {
    /// Drop repeated ranks, keeping the first occurrence of each.
    pub(crate) fn dedup(ranks: impl IntoIterator<Item = Rank>) -> Vec<Rank> {
        let mut out: Vec<Rank> = Vec::new();
        for r in ranks {
            if !out.contains(&r) {
                out.push(r);
            }
        }
        out
    }

    /// Validate `ranks` against the process context and build the group.
    ///
    /// `generation` counts earlier groups with the same rank list on this
    /// process, so identical groups built twice still get distinct ids.
    pub(crate) fn new(ctx: &ProcessContext, ranks: Vec<Rank>, generation: u64) -> Result<Self> {
        if ranks.is_empty() {
            return Err(CollectiveError::EmptyGroup);
        }
        if let Some(&bad) = ranks.iter().find(|&&r| r >= ctx.size()) {
            return Err(CollectiveError::InvalidRank {
                rank: bad,
                size: ctx.size(),
            });
        }
        let local_rank = ranks
            .iter()
            .position(|&r| r == ctx.rank())
            .ok_or_else(|| CollectiveError::NotAMember {
                rank: ctx.rank(),
                members: ranks.clone(),
            })?;

        let mut id = FNV_OFFSET;
        for r in &ranks {
            id = fnv1a(id, &r.to_le_bytes());
        }
        id = fnv1a(id, &generation.to_le_bytes());

        Ok(Self {
            ranks: ranks.into(),
            local_rank,
            id,
            next_seq: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.ranks.len()
    }

    /// Member global ranks, in local-index order.
    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    /// Whether global rank `rank` is a member.
    pub fn contains(&self, rank: Rank) -> bool {
        self.ranks.contains(&rank)
    }

    /// This process's local index within the group.
    pub fn local_rank(&self) -> usize {
        self.local_rank
    }

    /// Global rank of the member at local index `local`.
    pub fn global_rank(&self, local: usize) -> Option<Rank> {
        self.ranks.get(local).copied()
    }

    /// Local index of global rank `rank`, if it is a member.
    pub fn local_rank_of(&self, rank: Rank) -> Option<usize> {
        self.ranks.iter().position(|&r| r == rank)
    }

    /// Identifier shared by every member's copy of this group.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Message tag for the next operation built on this group.
    pub(crate) fn next_tag(&self) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        fnv1a(self.id, &seq.to_le_bytes())
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.ranks == other.ranks
    }
}

impl Eq for Group {}
