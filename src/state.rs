use crate::auth::SessionStore;
use crate::config::Config;
use crate::models::AppData;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub data_path: PathBuf,
    pub data: Arc<Mutex<AppData>>,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl AppState {
    pub fn new(config: &Config, data: AppData) -> Self {
        Self {
            config: config.clone(),
            data_path: config.data_path.clone(),
            data: Arc::new(Mutex::new(data)),
            sessions: Arc::new(Mutex::new(SessionStore::new(config.session_ttl))),
        }
    }
}
