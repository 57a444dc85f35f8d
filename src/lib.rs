//! Webhook-to-lead pipeline for a multi-tenant real-estate CRM.
//!
//! A voice-AI platform posts call events; `call_analyzed` events carry what
//! the AI learned about the caller. This crate turns those into leads:
//!
//! ```text
//! LeadPipeline::handle
//!   ├── idempotency guard     (call id seen recently?)
//!   ├── intake::prepare_lead  (extract + normalize, rejects bad phones)
//!   ├── resolve_tenant        (agent phone -> user_id)
//!   └── write_lead            (transcript dedupe, single insert)
//! ```
//!
//! Storage sits behind [`store::LeadStore`]; the HTTP surface lives in the
//! `leadflow-server` crate.

pub mod config;
pub mod dispatch;
pub mod idempotency;
pub mod tenant;
pub mod writer;

pub use config::{
    ConfigLoadError, DedupeConfig, IdempotencyConfig, LookupFailurePolicy, PipelineConfig,
    TenantConfig,
};
pub use dispatch::{DispatchOutcome, LeadPipeline};
pub use idempotency::{spawn_sweeper, sweep_task, IdempotencyCache, InMemoryIdempotencyCache};
pub use intake::{
    prepare_lead, CallPayload, CompletionStatus, EventKind, InboundEvent, IntakeError, LeadQuality, LeadStatus,
    LeadType, NewLead, NormalizedLead,
};
pub use store::{
    BackendConfig, InMemoryStore, LeadRef, LeadStore, StoreError, StoredLead, TenantProfile,
};
pub use tenant::{resolve_tenant, TenantResolution};
pub use writer::{write_lead, WriteOutcome};

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Errors that can occur while handling a webhook through the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The request body itself was unusable.
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// Tenant lookup failed and policy says reject.
    #[error("tenant lookup failed: {0}")]
    TenantLookup(StoreError),

    #[error("duplicate lead lookup failed: {0}")]
    DuplicateLookup(StoreError),

    #[error("failed to save lead: {0}")]
    Write(StoreError),
}

impl PipelineError {
    /// True when the sender should not retry: the body will never succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Intake(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineError::Intake(IntakeError::MalformedEnvelope(_)) => "malformed_envelope",
            PipelineError::Intake(IntakeError::MissingCallId) => "missing_call_id",
            PipelineError::Intake(err) if err.is_phone_error() => "invalid_phone",
            PipelineError::Intake(_) => "invalid_request",
            PipelineError::TenantLookup(_) => "tenant_lookup_failed",
            PipelineError::DuplicateLookup(_) => "duplicate_lookup_failed",
            PipelineError::Write(_) => "write_failed",
        }
    }

    /// The underlying store error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            PipelineError::TenantLookup(err)
            | PipelineError::DuplicateLookup(err)
            | PipelineError::Write(err) => Some(err),
            PipelineError::Intake(_) => None,
        }
    }
}

/// Metrics observer for pipeline stages.
pub trait PipelineMetrics: Send + Sync {
    /// One webhook with a well-formed envelope arrived.
    fn record_event(&self, kind: &EventKind);
    fn record_intake(&self, latency: Duration, result: Result<(), IntakeError>);
    /// `Ok` carries the resolution label.
    fn record_tenant(&self, latency: Duration, result: Result<&'static str, ()>);
    fn record_write(&self, latency: Duration, result: Result<(), PipelineError>);
    /// Final outcome label of a dispatched event.
    fn record_outcome(&self, latency: Duration, outcome: &'static str);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_event(self, kind: &EventKind) {
        self.recorder.record_event(kind);
    }

    pub(crate) fn record_intake(self, result: Result<(), IntakeError>) {
        self.recorder.record_intake(self.start.elapsed(), result);
    }

    pub(crate) fn record_tenant(self, result: Result<&'static str, ()>) {
        self.recorder.record_tenant(self.start.elapsed(), result);
    }

    pub(crate) fn record_write(self, result: Result<(), PipelineError>) {
        self.recorder.record_write(self.start.elapsed(), result);
    }

    pub(crate) fn record_outcome(self, result: &Result<DispatchOutcome, PipelineError>) {
        let label = match result {
            Ok(outcome) => outcome.label(),
            Err(err) => err.label(),
        };
        self.recorder.record_outcome(self.start.elapsed(), label);
    }
}
