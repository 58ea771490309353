use std::sync::Arc;

use crate::config::Config;
use crate::repository::{UserRepository, VideoRepository};
use crate::services::{AssetResolver, AssetStore, MediaProbe, UploadIntake};

/// Everything a handler needs, injected once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserRepository>,
    pub videos: Arc<dyn VideoRepository>,
    pub intake: UploadIntake,
    pub resolver: AssetResolver,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserRepository>,
        videos: Arc<dyn VideoRepository>,
        store: Arc<dyn AssetStore>,
        probe: Arc<dyn MediaProbe>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            users,
            videos,
            intake: UploadIntake::new(store.clone(), probe),
            resolver: AssetResolver::new(store),
        }
    }
}
