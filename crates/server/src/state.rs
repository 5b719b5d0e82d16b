use crate::config::Config;
use crate::router::SchemaRouter;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<SchemaRouter>,
    pub config: Arc<Config>,
}
