use std::sync::Arc;

use clap::Parser;
use tracing::info;

use harbor::relay::delegate::{Delegate, HttpDelegate, NoopDelegate};
use harbor::relay::server::Relay;

/// Relay server for the Harbor chat client.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8123")]
    listen: String,

    /// Base URL of the account service; omit to run without persistence.
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let delegate: Arc<dyn Delegate> = match &args.api_url {
        Some(url) => {
            info!("mirroring traffic to account service at {url}");
            Arc::new(HttpDelegate::new(url))
        }
        None => {
            info!("no account service configured, running relay-only");
            Arc::new(NoopDelegate)
        }
    };

    let relay = Relay::bind(&args.listen, delegate).await?;
    info!("harbor listening on {}", relay.local_addr()?);

    // In-flight connections are not drained on shutdown; dropping the accept
    // loop closes the listener and the process exits.
    tokio::select! {
        res = relay.run() => res?,
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
    }

    Ok(())
}
