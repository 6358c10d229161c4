pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use color_eyre::eyre;
use tokio::{net::TcpListener, task::JoinHandle, time::MissedTickBehavior};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;
use shopdesk_service::ShopdeskService;

#[derive(Debug, Parser)]
#[command(
	version = shopdesk_cli::VERSION,
	rename_all = "kebab",
	styles = shopdesk_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = shopdesk_config::load(&args.config)?;

	init_tracing(&config)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;

	if config.security.bind_localhost_only && !http_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"http_bind must be a loopback address when bind_localhost_only is true."
		));
	}
	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("admin_bind must be a loopback address."));
	}

	let state = AppState::new(config).await?;
	let refresher = spawn_catalog_refresh(state.service.clone());
	let app = routes::router(state.clone());
	let admin_app = routes::admin_router(state);
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, version = shopdesk_cli::VERSION, "HTTP server listening.");

	let http_server = axum::serve(http_listener, app);
	let admin_listener = TcpListener::bind(admin_addr).await?;

	tracing::info!(%admin_addr, "Admin server listening.");

	let admin_server = axum::serve(admin_listener, admin_app);
	let served = tokio::try_join!(http_server, admin_server);

	refresher.abort();
	served?;

	Ok(())
}

/// Loads the catalog once in the background, then again every `catalog.refresh_interval_secs`
/// when that is non-zero. Failures are logged and the previous catalog stays in place.
pub fn spawn_catalog_refresh(service: Arc<ShopdeskService>) -> JoinHandle<()> {
	tokio::spawn(async move {
		let every = service.cfg.catalog.refresh_interval_secs;

		refresh_once(&service).await;

		if every == 0 {
			return;
		}

		let mut ticker = tokio::time::interval(Duration::from_secs(every));

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		// The first tick completes immediately.
		ticker.tick().await;

		loop {
			ticker.tick().await;
			refresh_once(&service).await;
		}
	})
}

async fn refresh_once(service: &ShopdeskService) {
	if let Err(err) = service.refresh_catalog().await {
		tracing::error!(error = %err, "Catalog refresh failed.");
	}
}

fn init_tracing(config: &shopdesk_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.try_init()
		.map_err(|err| eyre::eyre!("Failed to initialize tracing: {err}"))?;

	Ok(())
}
