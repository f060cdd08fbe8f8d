use std::{env, io, sync::Arc};

use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, Loader};

mod cli;
mod routes;
mod source;
mod state;

const DEFAULT_LOG_FILTER: &str = "conflict_server=info,conflict_parser=info";

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = cli::parse(env::args().skip(1).collect());

    let loader = Loader::new(args.calendar, args.lunchtime, args.year, args.on_invalid_date)
        .map_err(io::Error::other)?;
    let state = AppState::new(loader).await;

    if let Some(interval) = args.refresh {
        state::spawn_refresh(Arc::clone(&state), interval);
    }

    let listener = TcpListener::bind(args.address).await?;
    info!("Listening at http://{}", args.address);

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
}
