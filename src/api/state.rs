use std::sync::Arc;

use crate::config::Config;
use crate::observability::Metrics;
use crate::queue::JobBroker;
use crate::status::StatusStore;
use crate::tools::MediaFetcher;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub broker: Arc<JobBroker>,
    pub status: Arc<StatusStore>,
    /// Used directly only for metadata lookups; downloads go through the worker
    pub fetcher: Arc<dyn MediaFetcher>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        broker: Arc<JobBroker>,
        status: Arc<StatusStore>,
        fetcher: Arc<dyn MediaFetcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            broker,
            status,
            fetcher,
            metrics,
        }
    }
}
