use clap::Parser;
use client::network::Client;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "9999")]
    port: u16,

    /// Send SUBSCRIBE right after connecting
    #[arg(short, long)]
    subscribe: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Connecting to {}:{}", args.host, args.port);
    let client = Client::connect(&args.host, args.port).await?;
    info!("Commands: SUBSCRIBE, BUY_TOWER <owner> <x> <y> <type>, PLACE_SPAWNER <owner> <x> <y>, UPGRADE_TOWER <x> <y>, START, RESET");

    let summary = client.run(args.subscribe).await?;
    info!(
        "Session ended: {} commands sent, {} replies, {} frames",
        summary.sent, summary.replies, summary.frames
    );

    Ok(())
}
