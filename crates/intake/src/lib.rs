//! Lead intake layer
//!
//! This is where call webhooks become leads. A voice-AI platform posts
//! `{event, call}` bodies whose interesting fields are scattered across the
//! call object and two free-form bags; we pull them out, coerce them into the
//! fixed lead vocabulary and hand back a record the writer can persist.
//!
//! ## What we do here
//!
//! - **Parse leniently** - mistyped scalars are coerced, not rejected
//! - **Extract by precedence** - an explicit probe table per field ([`PROBE_TABLE`])
//! - **Normalize** - enums fall back to defaults, bad emails are dropped,
//!   free text is trimmed
//! - **Reject only what matters** - a lead without a usable phone number fails
//!
//! ## Main entry point
//!
//! Call [`prepare_lead`] with a [`CallPayload`], get back a [`NormalizedLead`].
//!
//! ```
//! use intake::{prepare_lead, InboundEvent, LeadQuality, LeadType};
//!
//! let body = br#"{
//!     "event": "call_analyzed",
//!     "call": {
//!         "call_id": "c1",
//!         "from_number": "555-123-4567",
//!         "call_analysis": {"custom_analysis_data": {"type": "SELLER", "lead_quality": "HOT"}}
//!     }
//! }"#;
//!
//! let event = InboundEvent::from_slice(body).unwrap();
//! let lead = prepare_lead(event.call.as_ref().unwrap()).unwrap();
//!
//! assert_eq!(lead.phone, "555-123-4567");
//! assert_eq!(lead.lead_type, LeadType::Seller);
//! assert_eq!(lead.lead_quality, LeadQuality::Hot);
//! ```
use std::time::Instant;

use tracing::{debug, warn};

mod error;
pub mod extract;
pub mod normalize;
mod types;

pub use crate::error::IntakeError;
pub use crate::extract::{extract, ExtractedFields, LeadField, PROBE_TABLE};
pub use crate::normalize::{
    normalize, normalize_email, normalize_enum, validate_email, validate_phone, NormalizedLead,
    Vocabulary, MIN_PHONE_DIGITS,
};
pub use crate::types::{
    CallAnalysis, CallPayload, CompletionStatus, EventKind, FieldBag, InboundEvent, LeadQuality,
    LeadStatus, LeadType, NewLead,
};

/// Extract and normalize a call into a lead.
pub fn prepare_lead(call: &CallPayload) -> Result<NormalizedLead, IntakeError> {
    let start = Instant::now();
    let call_id = call.call_id().unwrap_or_default();

    let fields = extract(call);
    match normalize(fields) {
        Ok(lead) => {
            debug!(
                call_id,
                lead_type = lead.lead_type.wire_name(),
                lead_quality = lead.lead_quality.wire_name(),
                status = lead.status.wire_name(),
                call_duration = lead.call_duration,
                elapsed_micros = start.elapsed().as_micros(),
                "intake_success"
            );
            Ok(lead)
        }
        Err(err) => {
            warn!(
                call_id,
                error = %err,
                elapsed_micros = start.elapsed().as_micros(),
                "intake_failure"
            );
            Err(err)
        }
    }
}
