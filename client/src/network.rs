//! TCP session with the server: forwards typed commands and prints what
//! comes back.

use crate::hud::HudTracker;
use log::{info, warn};
use shared::Snapshot;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::thread;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A line received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerLine {
    /// `OK ...` or `ERR ...` reply, printed verbatim.
    Reply(String),
    Frame(Box<Snapshot>),
    /// Looked like a frame but did not decode.
    Malformed(String),
}

pub fn classify_line(line: &str) -> ServerLine {
    let line = line.trim();
    if !line.starts_with('{') {
        return ServerLine::Reply(line.to_string());
    }
    match Snapshot::from_frame(line) {
        Ok(snapshot) => ServerLine::Frame(Box::new(snapshot)),
        Err(e) => ServerLine::Malformed(e.to_string()),
    }
}

/// Counts of what a session saw, mostly for tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub sent: usize,
    pub replies: usize,
    pub frames: usize,
}

pub struct Client {
    stream: TcpStream,
    addr: SocketAddr,
}

impl Client {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let target = format!("{}:{}", host, port);
        let stream = TcpStream::connect(&target)
            .await
            .map_err(|source| ClientError::Connect {
                addr: target.clone(),
                source,
            })?;
        let addr = stream.peer_addr()?;
        info!("Connected to {}", addr);
        Ok(Self { stream, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Forwards stdin to the server until the server hangs up. With
    /// `subscribe` set, `SUBSCRIBE` is sent before any typed line.
    pub async fn run(self, subscribe: bool) -> Result<SessionSummary, ClientError> {
        let (tx, rx) = mpsc::unbounded_channel();
        if subscribe && tx.send("SUBSCRIBE".to_string()).is_err() {
            warn!("Could not queue SUBSCRIBE");
        }
        spawn_stdin_reader(tx)?;

        let mut stdout = io::stdout();
        run_session(self.stream, rx, &mut stdout).await
    }
}

/// Reads stdin on a plain thread, so a pending read never blocks exit.
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<String>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if tx.send(line.to_string()).is_err() {
                    break;
                }
            }
        })
}

/// Drives one connection. Lines from `input` are sent as commands; once
/// `input` closes the write side is shut down and the session keeps
/// printing until the server closes its end.
pub async fn run_session<S, O>(
    stream: S,
    mut input: mpsc::UnboundedReceiver<String>,
    out: &mut O,
) -> Result<SessionSummary, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    O: Write,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();
    let mut hud = HudTracker::new();
    let mut summary = SessionSummary::default();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => print_server_line(&line, &mut hud, out, &mut summary)?,
                None => {
                    info!("Server closed the connection");
                    break;
                }
            },
            command = input.recv(), if input_open => match command {
                Some(command) => {
                    writer.write_all(command.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                    summary.sent += 1;
                }
                None => {
                    input_open = false;
                    writer.shutdown().await?;
                }
            },
        }
    }

    Ok(summary)
}

fn print_server_line<O: Write>(
    line: &str,
    hud: &mut HudTracker,
    out: &mut O,
    summary: &mut SessionSummary,
) -> io::Result<()> {
    match classify_line(line) {
        ServerLine::Reply(reply) => {
            if reply.is_empty() {
                return Ok(());
            }
            summary.replies += 1;
            writeln!(out, "[HOST] {}", reply)?;
        }
        ServerLine::Frame(snapshot) => {
            summary.frames += 1;
            if let Some(hud_line) = hud.update(&snapshot) {
                writeln!(out, "{}", hud_line)?;
            }
        }
        ServerLine::Malformed(error) => warn!("Undecodable frame: {}", error),
    }
    out.flush()
}
