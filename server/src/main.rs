use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::runtime::Server;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "9999")]
    port: u16,
    /// Round length in seconds
    #[clap(short, long, default_value = "180")]
    round_time: f32,
    /// Run the simulation without a network listener
    #[clap(long)]
    no_net: bool,
    /// Simulation ticks per second
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
    /// Snapshot broadcasts per second
    #[clap(short, long, default_value = "10")]
    broadcast_rate: u32,
    /// Money each player starts a round with
    #[clap(long, default_value = "200")]
    starting_money: u32,
    /// Also read commands from stdin
    #[clap(short, long)]
    console: bool,
    /// Seed for obstacle layouts and spawning
    #[clap(long)]
    seed: Option<u64>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            network_enabled: !args.no_net,
            round_time: args.round_time,
            tick_rate: args.tick_rate,
            broadcast_rate: args.broadcast_rate,
            starting_money: args.starting_money,
            console: args.console,
            seed: args.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());
    info!(
        "Starting tower duel server: {}s rounds, {} Hz tick, {} Hz broadcast",
        config.round_time, config.tick_rate, config.broadcast_rate
    );

    let server = Server::start(config).await?;
    if let Some(addr) = server.local_addr() {
        info!("Accepting connections on {}", addr);
    }

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully...");
    server.shutdown().await;

    Ok(())
}
