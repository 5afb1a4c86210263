use crate::error::{CollectiveError, Result};
use crate::types::Rank;

/// Process-wide identity: this process's global rank and the total rank
/// count. Established once by the launcher and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessContext {
    rank: Rank,
    size: u32,
}

impl ProcessContext {
    pub fn new(rank: Rank, size: u32) -> Result<Self> {
        if size == 0 {
            return Err(CollectiveError::EmptyContext);
        }
        if rank >= size {
            return Err(CollectiveError::InvalidRank { rank, size });
        }
        Ok(Self { rank, size })
    }

    /// Global rank of this process.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Total number of ranks.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// All global ranks in ascending order.
    pub fn all_ranks(&self) -> impl Iterator<Item = Rank> {
        0..self.size
    }
}
