//! Prometheus-backed pipeline metrics.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `leadflow_webhook_events_total` | counter | `event` |
//! | `leadflow_webhook_outcomes_total` | counter | `outcome` |
//! | `leadflow_stage_duration_seconds` | histogram | `stage`, `result` |
//! | `leadflow_tenant_resolutions_total` | counter | `resolution` |
//! | `leadflow_webhook_duration_seconds` | histogram | |

use intake::{EventKind, IntakeError};
use leadflow::{PipelineError, PipelineMetrics};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its render handle.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Forwards pipeline observations to the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusPipelineMetrics;

fn stage(name: &'static str, latency: Duration, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    histogram!("leadflow_stage_duration_seconds", "stage" => name, "result" => result)
        .record(latency.as_secs_f64());
}

impl PipelineMetrics for PrometheusPipelineMetrics {
    fn record_event(&self, kind: &EventKind) {
        let event = match kind {
            // Label values stay bounded.
            EventKind::Other(_) => "other".to_string(),
            known => known.as_str().to_string(),
        };
        counter!("leadflow_webhook_events_total", "event" => event).increment(1);
    }

    fn record_intake(&self, latency: Duration, result: Result<(), IntakeError>) {
        stage("intake", latency, result.is_ok());
    }

    fn record_tenant(&self, latency: Duration, result: Result<&'static str, ()>) {
        stage("tenant", latency, result.is_ok());
        let resolution = result.unwrap_or("error");
        counter!("leadflow_tenant_resolutions_total", "resolution" => resolution).increment(1);
    }

    fn record_write(&self, latency: Duration, result: Result<(), PipelineError>) {
        stage("write", latency, result.is_ok());
    }

    fn record_outcome(&self, latency: Duration, outcome: &'static str) {
        counter!("leadflow_webhook_outcomes_total", "outcome" => outcome).increment(1);
        histogram!("leadflow_webhook_duration_seconds").record(latency.as_secs_f64());
    }
}
