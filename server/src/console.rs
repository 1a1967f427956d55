//! Local operator console: the same command grammar as the network, read
//! from stdin and pushed onto the shared command queue.

use crate::command_queue::CommandQueue;
use log::{info, warn};
use shared::{parse_request, Request};
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

/// Starts a detached thread reading commands from stdin until EOF.
///
/// A plain thread rather than a runtime task, so a pending stdin read
/// never holds up runtime shutdown.
pub fn spawn_console(queue: CommandQueue) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            info!("Console ready; type commands such as START or BUY_TOWER 1 300 200 basic");
            run_console_from(io::stdin().lock(), &queue);
            info!("Console closed");
        })
}

/// Reads lines until EOF or a read error, queueing every valid intent.
/// Returns how many commands were queued.
pub fn run_console_from<R: BufRead>(reader: R, queue: &CommandQueue) -> usize {
    let mut queued = 0;
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if handle_console_line(&line, queue) {
                    queued += 1;
                }
            }
            Err(e) => {
                warn!("Console read failed: {}", e);
                break;
            }
        }
    }
    queued
}

fn handle_console_line(line: &str, queue: &CommandQueue) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    match parse_request(line) {
        Ok(Request::Intent(command)) => {
            queue.push(command);
            true
        }
        Ok(Request::Subscribe) => {
            warn!("SUBSCRIBE only applies to network connections");
            false
        }
        Err(e) => {
            warn!("{}", e.reply());
            false
        }
    }
}
