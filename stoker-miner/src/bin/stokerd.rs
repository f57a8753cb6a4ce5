//! Main entry point for the stoker-miner daemon.

use clap::Parser;

use stoker_miner::{config::Config, daemon::Daemon, tracing};

#[derive(Parser)]
#[command(name = "stokerd", version, about = "Stratum work-generation daemon")]
struct Args {
    /// Configuration file path.
    #[arg(short, long, default_value = "stoker.toml")]
    config: String,

    /// Override the pool URL from the config file.
    #[arg(long)]
    url: Option<String>,

    /// Override the worker username from the config file.
    #[arg(long)]
    user: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing::init();

    let mut config = Config::load(&args.config)?;
    if let Some(url) = args.url {
        config.pool.url = url;
    }
    if let Some(user) = args.user {
        config.pool.username = user;
    }

    Daemon::new(config).run().await
}
