use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::AppMetrics;
use crate::registry::MachineRegistry;
use crate::state::SharedState;

/// Shared application context passed to HTTP handlers and tick loops.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub registry: Arc<MachineRegistry>,
    pub metrics: AppMetrics,
    pub state: SharedState,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        registry: MachineRegistry,
        metrics: AppMetrics,
        state: SharedState,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            metrics,
            state,
        }
    }

    pub fn plant_name(&self) -> &str {
        &self.config.plant
    }
}
