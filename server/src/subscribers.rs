//! Registry of connections that asked for snapshot frames.
//!
//! Connection handlers add themselves on `SUBSCRIBE` and remove themselves
//! when the connection ends. Each subscriber owns a small frame queue that
//! a writer task drains, so the broadcast loop only ever enqueues and never
//! waits on a socket. A subscriber whose queue is full is dropped and its
//! connection told to close.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Mutex, RwLock};

/// Frames a subscriber may have queued before it counts as stalled.
pub const FRAME_QUEUE_DEPTH: usize = 4;

/// Write half of a connection, shared between its handler and its frame
/// writer so replies and frames never interleave mid-line.
pub type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// One encoded snapshot line, shared by every queue it is offered to.
pub type Frame = Arc<str>;

pub fn shared_writer<W>(writer: W) -> SharedWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(Mutex::new(Box::new(writer)))
}

/// A registered recipient of snapshot frames.
#[derive(Clone)]
pub struct Subscriber {
    pub id: u64,
    pub addr: Option<SocketAddr>,
    frames: mpsc::Sender<Frame>,
    closer: Arc<watch::Sender<bool>>,
}

impl Subscriber {
    /// Creates a subscriber together with the receiving end of its frame
    /// queue. `closer` is the close flag of the owning connection.
    pub fn new(
        id: u64,
        addr: Option<SocketAddr>,
        closer: Arc<watch::Sender<bool>>,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let (frames, receiver) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let subscriber = Self {
            id,
            addr,
            frames,
            closer,
        };
        (subscriber, receiver)
    }

    /// Queues a frame without waiting.
    pub fn offer(&self, frame: Frame) -> Result<(), TrySendError<Frame>> {
        self.frames.try_send(frame)
    }

    /// Tells the owning connection to shut down.
    pub fn disconnect(&self) {
        self.closer.send_replace(true);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .finish()
    }
}

/// Cloneable handle to the set of current subscribers.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<HashMap<u64, Subscriber>>>,
    next_connection_id: Arc<AtomicU64>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh id for a new connection. Ids start at 1.
    pub fn allocate_id(&self) -> u64 {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Registers a subscriber. Returns false if the id was already present,
    /// in which case the existing entry is kept.
    pub async fn add(&self, subscriber: Subscriber) -> bool {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.contains_key(&subscriber.id) {
            return false;
        }
        let id = subscriber.id;
        subscribers.insert(id, subscriber);
        info!(
            "Connection {} subscribed ({} subscriber(s))",
            id,
            subscribers.len()
        );
        true
    }

    /// Removes a subscriber and returns it, if it was registered.
    pub async fn remove(&self, id: u64) -> Option<Subscriber> {
        let mut subscribers = self.subscribers.write().await;
        let removed = subscribers.remove(&id);
        if removed.is_some() {
            info!(
                "Connection {} unsubscribed ({} subscriber(s))",
                id,
                subscribers.len()
            );
        }
        removed
    }

    pub async fn contains(&self, id: u64) -> bool {
        self.subscribers.read().await.contains_key(&id)
    }

    /// Copy of the current subscribers, so frames are offered without
    /// holding the registry lock.
    pub async fn targets(&self) -> Vec<Subscriber> {
        self.subscribers.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Drops every subscriber and returns them, for shutdown.
    pub async fn clear(&self) -> Vec<Subscriber> {
        let mut subscribers = self.subscribers.write().await;
        subscribers.drain().map(|(_, subscriber)| subscriber).collect()
    }
}
