use std::sync::Arc;

use compass_config::Config;
use compass_service::CompassService;
use compass_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<CompassService>,
}
impl AppState {
	/// Connects to Postgres, applies the schema and builds the service.
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = CompassService::new(config, db)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: CompassService) -> Self {
		Self { service: Arc::new(service) }
	}
}
