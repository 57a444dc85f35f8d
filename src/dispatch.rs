//! Event dispatcher: routes webhook events through the lead pipeline.

use std::sync::Arc;
use std::time::Instant;

use intake::{prepare_lead, EventKind, InboundEvent, IntakeError};
use store::{LeadRef, LeadStore, StoredLead};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::PipelineConfig;
use crate::idempotency::{IdempotencyCache, InMemoryIdempotencyCache};
use crate::tenant::{resolve_tenant, TenantResolution};
use crate::writer::{write_lead, WriteOutcome};
use crate::{MetricsSpan, PipelineError};

/// Result of handling one webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Event carried no lead data (or was unrecognized) and was acknowledged.
    Acknowledged { event: EventKind },
    /// The call id was handled within the retention window.
    AlreadyProcessed { call_id: String },
    /// A lead with the same transcript already exists.
    LeadExists { call_id: String, lead: LeadRef },
    Created {
        call_id: String,
        lead: StoredLead,
        tenant: TenantResolution,
    },
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Acknowledged { .. } => "acknowledged",
            DispatchOutcome::AlreadyProcessed { .. } => "already_processed",
            DispatchOutcome::LeadExists { .. } => "lead_exists",
            DispatchOutcome::Created { .. } => "created",
        }
    }
}

/// The webhook pipeline: guard, extraction, tenant routing, and write.
///
/// Cheap to clone; all state is behind `Arc`s.
#[derive(Clone)]
pub struct LeadPipeline {
    store: Arc<dyn LeadStore>,
    cache: Arc<dyn IdempotencyCache>,
    config: PipelineConfig,
}

impl LeadPipeline {
    pub fn new(
        store: Arc<dyn LeadStore>,
        cache: Arc<dyn IdempotencyCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Pipeline with an in-process idempotency cache sized from `config`.
    pub fn with_store(store: Arc<dyn LeadStore>, config: PipelineConfig) -> Self {
        let cache = Arc::new(InMemoryIdempotencyCache::new(
            config.idempotency.retention(),
        ));
        Self::new(store, cache, config)
    }

    pub fn store(&self) -> &Arc<dyn LeadStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn IdempotencyCache> {
        &self.cache
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parse a raw request body and handle it.
    pub async fn handle_body(&self, body: &[u8]) -> Result<DispatchOutcome, PipelineError> {
        let event = InboundEvent::from_slice(body)
            .map_err(|e| IntakeError::MalformedEnvelope(e.to_string()))?;
        self.handle(event).await
    }

    /// Handle one parsed webhook event.
    ///
    /// Both `event` and `call` must be present; only `call_analyzed` reaches
    /// the lead stages.
    pub async fn handle(&self, event: InboundEvent) -> Result<DispatchOutcome, PipelineError> {
        let (kind, call_id) = match (event.kind(), event.call.as_ref()) {
            (Some(kind), Some(call)) => (kind, call.call_id().unwrap_or_default().to_string()),
            _ => {
                return Err(IntakeError::MalformedEnvelope(
                    "event and call are required".to_string(),
                )
                .into());
            }
        };

        if let Some(span) = MetricsSpan::start() {
            span.record_event(&kind);
        }

        let outcome_metrics = MetricsSpan::start();
        let span = info_span!("webhook", event = %kind, call_id = %call_id);
        let result = self.dispatch(kind, event).instrument(span).await;

        if let Some(span) = outcome_metrics {
            span.record_outcome(&result);
        }
        result
    }

    async fn dispatch(
        &self,
        kind: EventKind,
        event: InboundEvent,
    ) -> Result<DispatchOutcome, PipelineError> {
        match kind {
            EventKind::CallStarted | EventKind::CallEnded => {
                info!("call_lifecycle_event");
                Ok(DispatchOutcome::Acknowledged { event: kind })
            }
            EventKind::CallAnalyzed => self.process_analyzed(event).await,
            EventKind::Other(_) => {
                warn!("unrecognized_event");
                Ok(DispatchOutcome::Acknowledged { event: kind })
            }
        }
    }

    async fn process_analyzed(&self, event: InboundEvent) -> Result<DispatchOutcome, PipelineError> {
        let start = Instant::now();
        let Some(call) = event.call else {
            return Err(IntakeError::MalformedEnvelope("call is required".to_string()).into());
        };
        let Some(call_id) = call.call_id().map(str::to_string) else {
            return Err(IntakeError::MissingCallId.into());
        };

        if !self.cache.should_process(&call_id).await {
            info!("call_already_processed");
            return Ok(DispatchOutcome::AlreadyProcessed { call_id });
        }

        let mut intake_metrics = MetricsSpan::start();
        let prepared = prepare_lead(&call);
        if let Some(span) = intake_metrics.take() {
            span.record_intake(prepared.as_ref().map(|_| ()).map_err(|e| e.clone()));
        }
        let prepared = prepared?;

        let mut tenant_metrics = MetricsSpan::start();
        let tenant = resolve_tenant(
            self.store.as_ref(),
            &prepared.agent_phone_number,
            self.config.tenant.lookup_failure,
        )
        .await;
        if let Some(span) = tenant_metrics.take() {
            span.record_tenant(tenant.as_ref().map(TenantResolution::label).map_err(|_| ()));
        }
        let tenant = tenant.map_err(PipelineError::TenantLookup)?;
        debug!(tenant = tenant.label(), "tenant_resolved");

        let lead = prepared.into_new_lead(tenant.user_id());
        let mut write_metrics = MetricsSpan::start();
        let written = write_lead(
            self.store.as_ref(),
            self.cache.as_ref(),
            &call_id,
            lead,
            &self.config.dedupe,
        )
        .await;
        if let Some(span) = write_metrics.take() {
            span.record_write(written.as_ref().map(|_| ()).map_err(|e| e.clone()));
        }

        match written {
            Ok(WriteOutcome::Created(lead)) => {
                info!(
                    lead_id = %lead.id,
                    tenant = tenant.label(),
                    elapsed_micros = start.elapsed().as_micros(),
                    "lead_pipeline_success"
                );
                Ok(DispatchOutcome::Created {
                    call_id,
                    lead,
                    tenant,
                })
            }
            Ok(WriteOutcome::Duplicate(lead)) => Ok(DispatchOutcome::LeadExists { call_id, lead }),
            Err(err) => {
                warn!(
                    error = %err,
                    elapsed_micros = start.elapsed().as_micros(),
                    "lead_pipeline_failure"
                );
                Err(err)
            }
        }
    }
}
