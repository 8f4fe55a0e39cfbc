//! Resolve an application through hydra registry servers.
//!
//! Usage:
//!
//! ```text
//! hydra-resolve <app-id> <registry-url>...
//! ```
//!
//! Set `RUST_LOG=hydra_discovery=debug` to watch cache hits, refreshes and
//! failovers.

use std::process::ExitCode;

use hydra::{ClientOptions, HydraError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(app) = args.next() else {
        eprintln!("usage: hydra-resolve <app-id> <registry-url>...");
        return ExitCode::from(2);
    };
    let servers: Vec<String> = args.collect();

    match run(&app, servers).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(app: &str, servers: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let client = hydra::new_client()?;
    client.configure(servers, ClientOptions::new())?;

    let config = client.config();
    tracing::info!(servers = ?config.servers, timeouts = ?config.timeouts, "Client configured");

    match client.resolve(app).await {
        Ok(endpoints) => {
            for endpoint in &endpoints {
                println!("{endpoint}");
            }
        }
        Err(HydraError::AppNotFound { body, .. }) => {
            return Err(format!("registry does not know {app}: {body}").into());
        }
        Err(e) => return Err(e.into()),
    }

    // A second lookup inside the TTL is served from the cache.
    let started = tokio::time::Instant::now();
    client.resolve(app).await?;
    tracing::info!(elapsed = ?started.elapsed(), "Cached lookup");

    Ok(())
}
