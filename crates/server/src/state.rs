use crate::config::ServerConfig;
use leadflow::LeadPipeline;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Webhook pipeline (store, idempotency cache, pipeline config)
    pub pipeline: LeadPipeline,

    /// Prometheus renderer, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    pub fn new(config: ServerConfig, pipeline: LeadPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
