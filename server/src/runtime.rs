//! Wires the simulation, broadcast loop, listener and console together.

use crate::command_queue::CommandQueue;
use crate::config::{ConfigError, ServerConfig};
use crate::console::spawn_console;
use crate::game::GameState;
use crate::network::{run_broadcast_loop, ConnectionContext, NetworkServer};
use crate::subscribers::SubscriberRegistry;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

/// Largest step the simulation takes in one tick, in seconds.
pub const MAX_DELTA_TIME: f32 = 1.0 / 20.0;
const STATS_INTERVAL_TICKS: u64 = 60;

/// A running server. Dropping it without calling [`Server::shutdown`]
/// leaves the background tasks running.
pub struct Server {
    game: Arc<RwLock<GameState>>,
    queue: CommandQueue,
    subscribers: SubscriberRegistry,
    local_addr: Option<SocketAddr>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Server {
    /// Starts every task the configuration asks for. A listener that fails
    /// to bind is logged and skipped; the simulation keeps running.
    pub async fn start(config: ServerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let game = Arc::new(RwLock::new(GameState::new(config.round_settings())));
        let queue = CommandQueue::new();
        let subscribers = SubscriberRegistry::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(run_simulation_loop(
            Arc::clone(&game),
            queue.clone(),
            config.tick_rate,
            shutdown_rx.clone(),
        )));
        tasks.push(tokio::spawn(run_broadcast_loop(
            Arc::clone(&game),
            subscribers.clone(),
            config.broadcast_rate,
            shutdown_rx.clone(),
        )));

        let mut local_addr = None;
        if config.network_enabled {
            let context = ConnectionContext {
                queue: queue.clone(),
                subscribers: subscribers.clone(),
                shutdown: shutdown_rx.clone(),
            };
            match NetworkServer::bind(config.bind_addr(), context).await {
                Ok(listener) => {
                    local_addr = listener.local_addr().ok();
                    tasks.push(tokio::spawn(listener.run()));
                }
                Err(e) => error!("{}; continuing without network", e),
            }
        } else {
            info!("Network listener disabled");
        }

        if config.console {
            if let Err(e) = spawn_console(queue.clone()) {
                error!("Failed to start console: {}", e);
            }
        }

        Ok(Self {
            game,
            queue,
            subscribers,
            local_addr,
            shutdown_tx,
            tasks,
        })
    }

    /// Address the listener is bound to, if it is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn game(&self) -> Arc<RwLock<GameState>> {
        Arc::clone(&self.game)
    }

    pub fn queue(&self) -> CommandQueue {
        self.queue.clone()
    }

    pub fn subscribers(&self) -> SubscriberRegistry {
        self.subscribers.clone()
    }

    /// Signals every task to stop and waits for them.
    pub async fn shutdown(self) {
        info!("Shutting down");
        // Every receiver lives in a task we own, so a send error only means
        // those tasks are already gone.
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Server task panicked: {}", e);
            }
        }
    }
}

/// Fixed-rate simulation loop. Each tick drains the command queue and
/// steps the game by the elapsed time, capped at [`MAX_DELTA_TIME`].
pub async fn run_simulation_loop(
    game: Arc<RwLock<GameState>>,
    queue: CommandQueue,
    tick_rate: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // The first tick completes immediately
    ticker.tick().await;
    let mut last_update = Instant::now();

    while !*shutdown.borrow() {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let now = Instant::now();
        let mut delta_time = (now - last_update).as_secs_f32();
        last_update = now;
        if delta_time > MAX_DELTA_TIME {
            warn!(
                "Large delta time detected ({:.3}s), capping to {:.3}s",
                delta_time, MAX_DELTA_TIME
            );
            delta_time = MAX_DELTA_TIME;
        }

        let commands = queue.drain();
        let mut state = game.write().await;
        state.step(commands, delta_time);

        if state.tick() % STATS_INTERVAL_TICKS == 0 {
            debug!(
                "Tick {}: {} {:.1}s left, {} towers, {} spawners, {} enemies",
                state.tick(),
                state.phase(),
                state.time_left(),
                state.towers().len(),
                state.spawners().len(),
                state.enemies().len()
            );
        }
    }

    debug!("Simulation loop stopped");
}
