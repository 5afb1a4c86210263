//! Point-to-point layer the collectives run on.
//!
//! The collectives only need reliable, ordered delivery of byte messages
//! between two ranks, demultiplexed by a `u64` tag. Anything providing that
//! can implement [`Transport`]; [`LocalTransport`] wires ranks that live in
//! the same process.

mod local;

pub use local::LocalTransport;

use crate::error::Result;
use crate::types::Rank;
use futures::future::BoxFuture;

/// Reliable, tagged point-to-point messaging between global ranks.
///
/// Messages sent from one rank to another under the same tag are delivered
/// in send order. Messages under different tags never block each other.
pub trait Transport: Send + Sync {
    /// Send `data` to `dest` under `tag`.
    ///
    /// Resolves once the message has been handed to the peer; it does not
    /// wait for a matching `recv`.
    fn send<'a>(&'a self, dest: Rank, tag: u64, data: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Receive the next message from `src` under `tag`.
    fn recv<'a>(&'a self, src: Rank, tag: u64) -> BoxFuture<'a, Result<Vec<u8>>>;

    /// Release receive state kept for `tag`.
    ///
    /// Called once an operation has consumed every message addressed to this
    /// rank under `tag`.
    fn retire(&self, _tag: u64) {}

    /// Release receive state for an operation dropped before it finished.
    ///
    /// Peers may still send under `tag`; implementations should discard
    /// those messages rather than hold them. Defaults to [`retire`](Self::retire).
    fn abandon(&self, tag: u64) {
        self.retire(tag);
    }
}
