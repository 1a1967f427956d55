//! # Tower Duel Server Library
//!
//! Authoritative simulation server for a 2v2 tower-defense contest. The
//! tower side builds and upgrades towers to defend the base at the right
//! edge of the arena, (940, 320), while the spawner side places spawners
//! whose enemies path around obstacles toward it. Towers win when the clock
//! runs out; enemies win the moment one reaches the base. The server owns
//! the only copy of the world; clients send intents and receive snapshots.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! A fixed-rate tick drains every pending intent, validates it against the
//! game rules and then advances spawners, enemies and towers by the elapsed
//! time. Rejected intents leave the world untouched and produce no reply.
//!
//! ### Connection Handling
//! Each TCP connection speaks a newline-delimited text protocol:
//! - `SUBSCRIBE` registers the connection for snapshot frames
//! - `BUY_TOWER`, `PLACE_SPAWNER`, `UPGRADE_TOWER`, `START` and `RESET`
//!   are parsed into intents and queued for the next tick
//! - malformed lines get an `ERR ...` reply and go no further
//!
//! ### State Broadcasting
//! A single broadcast loop encodes one JSON snapshot per cycle (10 Hz by
//! default) and hands it to every subscriber's bounded frame queue, which a
//! per-subscriber writer task drains. A subscriber that falls behind or
//! fails a write is dropped and its connection closed without affecting the
//! others or the broadcast cadence.
//!
//! ## Module Organization
//!
//! ### Geometry, Arena and Pathfinding (`geometry`, `arena`, `pathfinding`)
//! Vector math, the fixed arena constants, per-round obstacle layout and an
//! 8-connected A* search over a coarse occupancy grid.
//!
//! ### Entities and Game (`entity`, `game`)
//! Tower, spawner and enemy behaviour, and the `GameState` machine that
//! moves a round through SETUP, RUNNING and GAMEOVER.
//!
//! ### Plumbing (`command_queue`, `subscribers`, `network`, `console`)
//! The FIFO mailbox between producers and the tick, the subscriber set, the
//! TCP listener with its connection handlers and broadcast loop, and the
//! optional stdin console.
//!
//! ### Orchestration (`config`, `runtime`)
//! Process-start parameters and the `Server` that spawns and stops every
//! task.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::runtime::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::start(ServerConfig {
//!         port: 9999,
//!         round_time: 120.0,
//!         ..ServerConfig::default()
//!     })
//!     .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! The game state sits behind one `tokio::sync::RwLock`. The simulation
//! takes the write lock once per tick; the broadcast loop takes the read
//! lock only long enough to build a snapshot and writes to sockets after
//! releasing it. Connection handlers never touch the game state directly;
//! they push onto the command queue and return.

pub mod arena;
pub mod command_queue;
pub mod config;
pub mod console;
pub mod entity;
pub mod game;
pub mod geometry;
pub mod network;
pub mod pathfinding;
pub mod runtime;
pub mod subscribers;
