use std::sync::Arc;

use batchplant_storage::DbPool;

use crate::blob::FsBlobStore;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub blobs: FsBlobStore,
    pub config: Arc<Config>,
}
