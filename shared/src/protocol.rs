//! Line-oriented command protocol.
//!
//! Every command is one UTF-8 line terminated by `\n`. The keyword is matched
//! case-insensitively, arguments are whitespace separated, and trailing
//! arguments beyond the expected arity are ignored.

use crate::{Player, TowerKind};
use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

/// Reasons a line could not be turned into a request. The `Display` text is
/// what follows `ERR ` in the reply sent back to the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("UNKNOWN_CMD")]
    UnknownCommand,
    #[error("invalid {field} '{value}': {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[error("invalid owner {0}")]
    InvalidOwner(i64),
    #[error("unknown tower type '{0}'")]
    UnknownTowerType(String),
    #[error("line too long")]
    LineTooLong,
}

impl ProtocolError {
    /// The full reply line, without the terminator.
    pub fn reply(&self) -> String {
        format!("ERR {}", self)
    }
}

/// An intent for the simulation. Produced by connection handlers and the
/// local console, consumed once per tick by the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    BuyTower {
        owner: Player,
        x: i32,
        y: i32,
        kind: TowerKind,
    },
    PlaceSpawner {
        owner: Player,
        x: i32,
        y: i32,
    },
    UpgradeTower {
        x: i32,
        y: i32,
    },
    Start,
    Reset,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::BuyTower { owner, x, y, kind } => {
                write!(f, "BUY_TOWER {} {} {} {}", owner, x, y, kind)
            }
            Command::PlaceSpawner { owner, x, y } => {
                write!(f, "PLACE_SPAWNER {} {} {}", owner, x, y)
            }
            Command::UpgradeTower { x, y } => write!(f, "UPGRADE_TOWER {} {}", x, y),
            Command::Start => f.write_str("START"),
            Command::Reset => f.write_str("RESET"),
        }
    }
}

/// A parsed line: either a subscription request or an intent to queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Subscribe,
    Intent(Command),
}

/// Parses one protocol line (without its terminator).
pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(keyword) = parts.first() else {
        return Err(ProtocolError::UnknownCommand);
    };

    match keyword.to_ascii_uppercase().as_str() {
        "SUBSCRIBE" => Ok(Request::Subscribe),
        "BUY_TOWER" if parts.len() >= 5 => {
            let owner = parse_owner(parts[1])?;
            let x = parse_int("x", parts[2])?;
            let y = parse_int("y", parts[3])?;
            let kind = TowerKind::from_name(parts[4])
                .ok_or_else(|| ProtocolError::UnknownTowerType(parts[4].to_string()))?;
            Ok(Request::Intent(Command::BuyTower { owner, x, y, kind }))
        }
        "PLACE_SPAWNER" if parts.len() >= 4 => {
            let owner = parse_owner(parts[1])?;
            let x = parse_int("x", parts[2])?;
            let y = parse_int("y", parts[3])?;
            Ok(Request::Intent(Command::PlaceSpawner { owner, x, y }))
        }
        "UPGRADE_TOWER" if parts.len() >= 3 => {
            let x = parse_int("x", parts[1])?;
            let y = parse_int("y", parts[2])?;
            Ok(Request::Intent(Command::UpgradeTower { x, y }))
        }
        "START" => Ok(Request::Intent(Command::Start)),
        "RESET" => Ok(Request::Intent(Command::Reset)),
        _ => Err(ProtocolError::UnknownCommand),
    }
}

fn parse_int(field: &'static str, value: &str) -> Result<i32, ProtocolError> {
    value
        .parse::<i32>()
        .map_err(|source| ProtocolError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_owner(value: &str) -> Result<Player, ProtocolError> {
    let id = value
        .parse::<i64>()
        .map_err(|source| ProtocolError::InvalidNumber {
            field: "owner",
            value: value.to_string(),
            source,
        })?;

    u8::try_from(id)
        .ok()
        .and_then(Player::from_id)
        .ok_or(ProtocolError::InvalidOwner(id))
}

/// Longest unterminated line a connection may hold in its buffer.
pub const MAX_LINE_LEN: usize = 4096;

/// Accumulates bytes from a stream and yields complete `\n`-terminated lines.
///
/// A line split across several reads stays buffered until its terminator
/// arrives; a read carrying several lines yields them in order.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
        }
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// Removes and returns the next complete line, without the terminator.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|byte| *byte == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        Some(line)
    }

    /// Bytes received after the last terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True once the unterminated tail is longer than the limit. Callers
    /// drain complete lines first, then check this.
    pub fn is_overflowing(&self) -> bool {
        self.pending.len() > self.limit
    }
}
