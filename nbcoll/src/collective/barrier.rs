use crate::collective::helpers::{Exchange, ceil_log2};
use crate::error::Result;

/// Dissemination barrier: in round `k` every member signals the member
/// `2^k` ahead of it and waits for the one `2^k` behind. No member leaves
/// before every member has entered.
pub(crate) async fn dissemination_barrier(ex: &Exchange) -> Result<()> {
    let world = ex.size();
    let rank = ex.local_rank();

    for round in 0..ceil_log2(world) {
        let dist = 1usize << round;
        let to = (rank + dist) % world;
        let from = (rank + world - dist) % world;
        ex.sendrecv(to, &[], from, 0).await?;
        tracing::trace!(operation = ex.operation(), round, "barrier round");
    }
    Ok(())
}
