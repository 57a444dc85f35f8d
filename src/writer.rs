//! Lead persistence: duplicate-content check, then a single insert.

use intake::NewLead;
use store::{LeadRef, LeadStore, StoredLead};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DedupeConfig;
use crate::idempotency::IdempotencyCache;
use crate::PipelineError;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// A new row was inserted.
    Created(StoredLead),
    /// A lead with the same transcript already existed; nothing was written.
    Duplicate(LeadRef),
}

impl WriteOutcome {
    pub fn lead_id(&self) -> Uuid {
        match self {
            WriteOutcome::Created(lead) => lead.id,
            WriteOutcome::Duplicate(existing) => existing.id,
        }
    }
}

/// Persist `lead` for `call_id`, marking the call as seen on success or on a
/// duplicate hit. Failures leave the guard untouched so a retry can succeed.
pub async fn write_lead(
    store: &dyn LeadStore,
    cache: &dyn IdempotencyCache,
    call_id: &str,
    lead: NewLead,
    dedupe: &DedupeConfig,
) -> Result<WriteOutcome, PipelineError> {
    let transcript = lead.call_transcript.as_str();
    if dedupe.match_empty_transcript || !transcript.is_empty() {
        let existing = store
            .find_lead_by_transcript(transcript)
            .await
            .map_err(PipelineError::DuplicateLookup)?;

        if let Some(existing) = existing {
            info!(call_id, lead_id = %existing.id, "lead_already_exists");
            cache.mark_seen(call_id).await;
            return Ok(WriteOutcome::Duplicate(existing));
        }
    }

    let stored = store
        .insert_lead(lead)
        .await
        .map_err(PipelineError::Write)?;

    debug!(call_id, lead_id = %stored.id, "lead_inserted");
    cache.mark_seen(call_id).await;
    Ok(WriteOutcome::Created(stored))
}
