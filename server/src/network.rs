//! Server network layer: TCP listener, per-connection line handlers and the
//! snapshot broadcast loop.

use crate::command_queue::CommandQueue;
use crate::game::GameState;
use crate::subscribers::{shared_writer, Frame, SharedWriter, Subscriber, SubscriberRegistry};
use log::{debug, error, info, warn};
use shared::{parse_request, Command, LineBuffer, ProtocolError, Request, SUBSCRIBED_REPLY};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, RwLock};
use tokio::time::{interval, sleep, timeout, Duration, MissedTickBehavior};

/// How long a handler blocks on a read before re-checking for shutdown.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);
/// A reply or frame that cannot be written within this window drops the
/// connection.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(2);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
const READ_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] io::Error),
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What a connection needs besides its own stream.
#[derive(Clone)]
pub struct ConnectionContext {
    pub queue: CommandQueue,
    pub subscribers: SubscriberRegistry,
    pub shutdown: watch::Receiver<bool>,
}

/// Result of handling one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank or undecodable line, dropped without a reply.
    Skipped,
    Subscribed,
    Queued(Command),
    Rejected(ProtocolError),
}

pub struct NetworkServer {
    listener: TcpListener,
    context: ConnectionContext,
}

impl NetworkServer {
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        context: ConnectionContext,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr).await.map_err(NetworkError::Bind)?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self { listener, context })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until shutdown, spawning one handler task per
    /// connection. Accept errors are logged and retried after a short pause.
    pub async fn run(self) {
        let mut shutdown = self.context.shutdown.clone();

        while !*shutdown.borrow() {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("Client connected from {}", addr);
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
                        }
                        let context = self.context.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, Some(addr), context).await;
                            info!("Client {} disconnected", addr);
                        });
                    }
                    Err(e) => {
                        error!("{}", NetworkError::Accept(e));
                        sleep(ACCEPT_BACKOFF).await;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Listener stopped");
    }
}

/// One accepted connection: its id, its write half and a close flag that
/// the broadcast side raises when the connection has to go.
pub struct Connection {
    pub id: u64,
    pub addr: Option<SocketAddr>,
    pub writer: SharedWriter,
    closer: Arc<watch::Sender<bool>>,
}

impl Connection {
    pub fn new(id: u64, addr: Option<SocketAddr>, writer: SharedWriter) -> Self {
        let (closer, _) = watch::channel(false);
        Self {
            id,
            addr,
            writer,
            closer: Arc::new(closer),
        }
    }

    pub fn close(&self) {
        self.closer.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closer.borrow()
    }

    fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closer.subscribe()
    }
}

/// Serves one connection until EOF, a read or write error, an overlong
/// line, shutdown, or a close request from the broadcast side. The
/// connection is always deregistered and its write half shut down on the
/// way out.
pub async fn handle_connection<S>(stream: S, addr: Option<SocketAddr>, context: ConnectionContext)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let connection = Connection::new(context.subscribers.allocate_id(), addr, shared_writer(writer));
    let id = connection.id;
    let mut closed = connection.closed_signal();
    let mut lines = LineBuffer::new();
    let mut chunk = [0u8; READ_CHUNK];

    'connection: while !*context.shutdown.borrow() && !connection.is_closed() {
        let read = tokio::select! {
            read = timeout(READ_TIMEOUT, reader.read(&mut chunk)) => Some(read),
            _ = closed.changed() => None,
        };
        let Some(read) = read else {
            debug!("Connection {} closed after a missed frame", id);
            break;
        };
        let n = match read {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                debug!("Read error on connection {}: {}", id, e);
                break;
            }
            Err(_) => continue,
        };

        lines.extend(&chunk[..n]);
        while let Some(raw) = lines.next_line() {
            if let Err(e) = handle_line(&raw, &connection, &context).await {
                warn!("Dropping connection {}: {}", id, e);
                break 'connection;
            }
        }

        if lines.is_overflowing() {
            warn!(
                "Dropping connection {}: {} bytes without a line break",
                id,
                lines.pending_len()
            );
            if let Err(e) = write_line(&connection.writer, &ProtocolError::LineTooLong.reply()).await {
                debug!("Could not tell connection {} why: {}", id, e);
            }
            break;
        }
    }

    connection.close();
    context.subscribers.remove(id).await;
    close_writer(&connection.writer).await;
}

/// Parses one line and acts on it: subscribe, enqueue an intent, or reply
/// with an error. An `Err` means the reply could not be written.
pub async fn handle_line(
    raw: &[u8],
    connection: &Connection,
    context: &ConnectionContext,
) -> Result<LineOutcome, NetworkError> {
    let id = connection.id;
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(_) => {
            warn!("Ignoring non UTF-8 line from connection {}", id);
            return Ok(LineOutcome::Skipped);
        }
    };
    if line.is_empty() {
        return Ok(LineOutcome::Skipped);
    }

    match parse_request(line) {
        Ok(Request::Subscribe) => {
            // Reply first so no frame can overtake the acknowledgement.
            write_line(&connection.writer, SUBSCRIBED_REPLY).await?;
            subscribe(connection, &context.subscribers).await;
            Ok(LineOutcome::Subscribed)
        }
        Ok(Request::Intent(command)) => {
            context.queue.push(command);
            Ok(LineOutcome::Queued(command))
        }
        Err(error) => {
            debug!("Connection {} sent bad line '{}': {}", id, line, error);
            write_line(&connection.writer, &error.reply()).await?;
            Ok(LineOutcome::Rejected(error))
        }
    }
}

/// Registers `connection` for snapshot frames and starts the task that
/// writes them out. Returns false if it was already subscribed.
pub async fn subscribe(connection: &Connection, subscribers: &SubscriberRegistry) -> bool {
    let (subscriber, frames) =
        Subscriber::new(connection.id, connection.addr, Arc::clone(&connection.closer));
    if !subscribers.add(subscriber).await {
        return false;
    }

    tokio::spawn(run_frame_writer(
        connection.id,
        frames,
        Arc::clone(&connection.writer),
        Arc::clone(&connection.closer),
        subscribers.clone(),
    ));
    true
}

/// Drains one subscriber's frame queue onto its socket. A failed or timed
/// out write deregisters the subscriber and closes its connection.
async fn run_frame_writer(
    id: u64,
    mut frames: mpsc::Receiver<Frame>,
    writer: SharedWriter,
    closer: Arc<watch::Sender<bool>>,
    subscribers: SubscriberRegistry,
) {
    let mut closed = closer.subscribe();

    while !*closed.borrow() {
        let frame = tokio::select! {
            frame = frames.recv() => frame,
            _ = closed.changed() => break,
        };
        let Some(frame) = frame else {
            break;
        };

        tokio::select! {
            written = write_bytes(&writer, frame.as_bytes()) => {
                if let Err(e) = written {
                    warn!("Dropping subscriber {}: {}", id, e);
                    subscribers.remove(id).await;
                    closer.send_replace(true);
                    break;
                }
            }
            _ = closed.changed() => break,
        }
    }
}

async fn write_line(writer: &SharedWriter, line: &str) -> Result<(), NetworkError> {
    let mut framed = String::with_capacity(line.len() + 1);
    framed.push_str(line);
    framed.push('\n');
    write_bytes(writer, framed.as_bytes()).await
}

async fn write_bytes(writer: &SharedWriter, bytes: &[u8]) -> Result<(), NetworkError> {
    let write = async {
        let mut guard = writer.lock().await;
        guard.write_all(bytes).await?;
        guard.flush().await
    };
    match timeout(WRITE_TIMEOUT, write).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(NetworkError::WriteTimeout(WRITE_TIMEOUT)),
    }
}

async fn close_writer(writer: &SharedWriter) {
    let close = async {
        let mut guard = writer.lock().await;
        guard.shutdown().await
    };
    if let Ok(Err(e)) = timeout(WRITE_TIMEOUT, close).await {
        debug!("Error closing connection: {}", e);
    }
}

/// Sends a snapshot to every subscriber at `rate` Hz until shutdown.
pub async fn run_broadcast_loop(
    game: Arc<RwLock<GameState>>,
    subscribers: SubscriberRegistry,
    rate: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_secs_f64(1.0 / rate.max(1) as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !*shutdown.borrow() {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = broadcast_snapshot(&game, &subscribers).await {
                    error!("Broadcast failed: {}", e);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    for subscriber in subscribers.clear().await {
        subscriber.disconnect();
    }
    debug!("Broadcast loop stopped");
}

/// Encodes the current state once and fans it out. Returns how many
/// subscribers had the frame queued.
pub async fn broadcast_snapshot(
    game: &RwLock<GameState>,
    subscribers: &SubscriberRegistry,
) -> Result<usize, NetworkError> {
    if subscribers.is_empty().await {
        return Ok(0);
    }

    let snapshot = game.read().await.snapshot();
    let frame = snapshot.to_frame()?;
    Ok(broadcast_frame(subscribers, &frame).await)
}

/// Offers `frame` to each current subscriber without waiting on any socket.
/// A subscriber whose queue is full or whose writer has stopped is
/// deregistered and its connection closed; the others still get the frame.
pub async fn broadcast_frame(subscribers: &SubscriberRegistry, frame: &str) -> usize {
    let frame: Frame = Arc::from(frame);
    let mut queued = 0;

    for subscriber in subscribers.targets().await {
        match subscriber.offer(Arc::clone(&frame)) {
            Ok(()) => queued += 1,
            Err(e) => {
                let reason = match e {
                    TrySendError::Full(_) => "falling behind",
                    TrySendError::Closed(_) => "writer stopped",
                };
                warn!("Dropping subscriber {}: {}", subscriber.id, reason);
                if let Some(removed) = subscribers.remove(subscriber.id).await {
                    removed.disconnect();
                }
            }
        }
    }

    queued
}
