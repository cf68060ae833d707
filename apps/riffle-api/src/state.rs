use std::sync::Arc;

use riffle_service::RiffleService;
use riffle_storage::qdrant::QdrantIndex;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RiffleService>,
}
impl AppState {
	pub fn new(config: riffle_config::Config) -> color_eyre::Result<Self> {
		let index = QdrantIndex::new(&config.storage.qdrant)?;
		let service = RiffleService::new(config, Arc::new(index));

		Ok(Self { service: Arc::new(service) })
	}
}
