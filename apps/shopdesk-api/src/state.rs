use std::sync::Arc;

use shopdesk_config::Config;
use shopdesk_service::ShopdeskService;
use shopdesk_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ShopdeskService>,
}
impl AppState {
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(ShopdeskService::new(config, db)))
	}

	pub fn from_service(service: ShopdeskService) -> Self {
		Self { service: Arc::new(service) }
	}
}
