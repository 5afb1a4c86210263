use crate::error::{CollectiveError, Result};
use crate::transport::Transport;
use crate::types::Rank;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

type SharedReceiver = Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>;

/// A (source, tag) channel. Created lazily by whichever side touches it
/// first: the sender pushing a message or the receiver waiting for one.
struct Channel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: SharedReceiver,
}

impl Channel {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }
}

#[derive(Default)]
struct MailboxState {
    channels: HashMap<(Rank, u64), Channel>,
    /// Tags of operations dropped before finishing. Late messages under
    /// these tags are discarded instead of reopening a channel.
    abandoned: HashSet<u64>,
}

/// Incoming side of one rank.
struct Mailbox {
    state: std::sync::Mutex<MailboxState>,
    open: AtomicBool,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            state: std::sync::Mutex::new(MailboxState::default()),
            open: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MailboxState>> {
        self.state
            .lock()
            .map_err(|_| CollectiveError::LockPoisoned("mailbox"))
    }

    /// `None` when `tag` was abandoned.
    fn sender(&self, src: Rank, tag: u64) -> Result<Option<mpsc::UnboundedSender<Vec<u8>>>> {
        let mut state = self.lock()?;
        if state.abandoned.contains(&tag) {
            return Ok(None);
        }
        Ok(Some(
            state
                .channels
                .entry((src, tag))
                .or_insert_with(Channel::new)
                .tx
                .clone(),
        ))
    }

    fn receiver(&self, src: Rank, tag: u64) -> Result<SharedReceiver> {
        let mut state = self.lock()?;
        Ok(Arc::clone(
            &state
                .channels
                .entry((src, tag))
                .or_insert_with(Channel::new)
                .rx,
        ))
    }

    fn retire(&self, tag: u64) {
        if let Ok(mut state) = self.lock() {
            state.channels.retain(|&(_, t), _| t != tag);
        }
    }

    fn abandon(&self, tag: u64) {
        if let Ok(mut state) = self.lock() {
            state.channels.retain(|&(_, t), _| t != tag);
            state.abandoned.insert(tag);
        }
    }
}

/// In-process transport: every rank is a tokio task (or thread) of the same
/// process, and messages move through unbounded `mpsc` channels.
///
/// Build a fully connected set with [`LocalTransport::mesh`].
pub struct LocalTransport {
    rank: Rank,
    mailboxes: Arc<[Arc<Mailbox>]>,
}

impl LocalTransport {
    /// Create `size` connected endpoints; element `i` is rank `i`.
    pub fn mesh(size: u32) -> Vec<LocalTransport> {
        let mailboxes: Arc<[Arc<Mailbox>]> =
            (0..size).map(|_| Arc::new(Mailbox::new())).collect();
        (0..size)
            .map(|rank| LocalTransport {
                rank,
                mailboxes: Arc::clone(&mailboxes),
            })
            .collect()
    }

    /// The rank this endpoint sends from.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    fn mailbox(&self, rank: Rank) -> Result<&Arc<Mailbox>> {
        self.mailboxes
            .get(rank as usize)
            .ok_or(CollectiveError::InvalidRank {
                rank,
                size: self.mailboxes.len() as u32,
            })
    }
}

impl Transport for LocalTransport {
    fn send<'a>(&'a self, dest: Rank, tag: u64, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mailbox = self.mailbox(dest)?;
            if !mailbox.open.load(Ordering::Acquire) {
                return Err(CollectiveError::PeerDisconnected { rank: dest });
            }
            match mailbox.sender(self.rank, tag)? {
                Some(tx) => tx
                    .send(data.to_vec())
                    .map_err(|_| CollectiveError::PeerDisconnected { rank: dest }),
                None => {
                    tracing::trace!(dest, tag, "discarding message for abandoned tag");
                    Ok(())
                }
            }
        })
    }

    fn recv<'a>(&'a self, src: Rank, tag: u64) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            // Validates `src`.
            self.mailbox(src)?;
            let rx = self.mailbox(self.rank)?.receiver(src, tag)?;
            let mut rx = rx.lock().await;
            rx.recv()
                .await
                .ok_or(CollectiveError::PeerDisconnected { rank: src })
        })
    }

    fn retire(&self, tag: u64) {
        if let Ok(mailbox) = self.mailbox(self.rank) {
            mailbox.retire(tag);
        }
    }

    fn abandon(&self, tag: u64) {
        if let Ok(mailbox) = self.mailbox(self.rank) {
            mailbox.abandon(tag);
        }
    }
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        if let Some(mailbox) = self.mailboxes.get(self.rank as usize) {
            mailbox.open.store(false, Ordering::Release);
        }
    }
}
