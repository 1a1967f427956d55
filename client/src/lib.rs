//! # Tower Duel Terminal Client
//!
//! A line-oriented client for the tower duel server. It connects over TCP,
//! forwards each line typed on stdin as a protocol command and prints what
//! the server sends back:
//!
//! - `OK ...` and `ERR ...` replies are printed verbatim with a `[HOST]`
//!   prefix
//! - snapshot frames are decoded and summarised as a one-line HUD, printed
//!   only when the summary changes
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Connection setup, the stdin forwarding thread and the session loop that
//! multiplexes typed commands with server output.
//!
//! ### HUD Module (`hud`)
//! Formatting of snapshot summaries and the round clock.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1", 9999).await?;
//!     client.run(true).await?;
//!     Ok(())
//! }
//! ```

pub mod hud;
pub mod network;
