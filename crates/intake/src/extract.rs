//! Field extraction from loosely-shaped call payloads.
//!
//! Every logical lead field can live in several places depending on the call
//! channel and on how the voice agent was configured. [`PROBE_TABLE`] lists,
//! per field, the locations to try in precedence order; the first present,
//! non-empty value wins and the field's fallback covers the rest.
//!
//! ```text
//! phone               call.from_number → dyn.customer_phone → analysis.number → analysis.phone
//! agent_phone_number  analysis.agent_phone-number → analysis.agent_phone_number → call.to_number → ""
//! name                analysis.name → dyn.customer_name → "Unknown"
//! email               analysis.email → dyn.customer_email → ""
//! type                analysis.type → dyn.lead_type → "buyer"
//! timeframe           analysis.timeframe → dyn.timeframe → "Unknown"
//! property_details    analysis.property_details → dyn.property_details → ""
//! lead_quality        analysis.lead_quality → dyn.lead_quality → "cold"
//! status              analysis.status → dyn.status → "new"
//! call_transcript     call.transcript → ""
//! call_recording_url  call.recording_url → none
//! ```
//!
//! Extraction never fails. Whether the result is usable is the normalizer's
//! call.
use serde::Serialize;

use crate::types::{scalar_string, CallPayload};

/// Logical lead fields filled by probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadField {
    Phone,
    AgentPhoneNumber,
    Name,
    Email,
    LeadType,
    Timeframe,
    PropertyDetails,
    LeadQuality,
    Status,
    CallTranscript,
    CallRecordingUrl,
}

/// Top-level scalars of the call object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallField {
    FromNumber,
    ToNumber,
    Transcript,
    RecordingUrl,
}

/// One candidate location for a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Call(CallField),
    /// Key inside `call_analysis.custom_analysis_data`.
    Analysis(&'static str),
    /// Key inside `retell_llm_dynamic_variables`.
    DynamicVars(&'static str),
}

/// Ordered probe list plus fallback for a single field.
#[derive(Debug, Clone, Copy)]
pub struct FieldProbe {
    pub field: LeadField,
    pub sources: &'static [Source],
    /// `None` means the field stays absent when no source matches.
    pub fallback: Option<&'static str>,
}

pub const PROBE_TABLE: &[FieldProbe] = &[
    FieldProbe {
        field: LeadField::Phone,
        sources: &[
            Source::Call(CallField::FromNumber),
            Source::DynamicVars("customer_phone"),
            Source::Analysis("number"),
            Source::Analysis("phone"),
        ],
        fallback: None,
    },
    FieldProbe {
        field: LeadField::AgentPhoneNumber,
        sources: &[
            Source::Analysis("agent_phone-number"),
            Source::Analysis("agent_phone_number"),
            Source::Call(CallField::ToNumber),
        ],
        fallback: Some(""),
    },
    FieldProbe {
        field: LeadField::Name,
        sources: &[Source::Analysis("name"), Source::DynamicVars("customer_name")],
        fallback: Some("Unknown"),
    },
    FieldProbe {
        field: LeadField::Email,
        sources: &[Source::Analysis("email"), Source::DynamicVars("customer_email")],
        fallback: Some(""),
    },
    FieldProbe {
        field: LeadField::LeadType,
        sources: &[Source::Analysis("type"), Source::DynamicVars("lead_type")],
        fallback: Some("buyer"),
    },
    FieldProbe {
        field: LeadField::Timeframe,
        sources: &[Source::Analysis("timeframe"), Source::DynamicVars("timeframe")],
        fallback: Some("Unknown"),
    },
    FieldProbe {
        field: LeadField::PropertyDetails,
        sources: &[
            Source::Analysis("property_details"),
            Source::DynamicVars("property_details"),
        ],
        fallback: Some(""),
    },
    FieldProbe {
        field: LeadField::LeadQuality,
        sources: &[
            Source::Analysis("lead_quality"),
            Source::DynamicVars("lead_quality"),
        ],
        fallback: Some("cold"),
    },
    FieldProbe {
        field: LeadField::Status,
        sources: &[Source::Analysis("status"), Source::DynamicVars("status")],
        fallback: Some("new"),
    },
    FieldProbe {
        field: LeadField::CallTranscript,
        sources: &[Source::Call(CallField::Transcript)],
        fallback: Some(""),
    },
    FieldProbe {
        field: LeadField::CallRecordingUrl,
        sources: &[Source::Call(CallField::RecordingUrl)],
        fallback: None,
    },
];

/// Raw, un-normalized field values pulled from a call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedFields {
    pub phone: Option<String>,
    pub agent_phone_number: String,
    pub name: String,
    pub email: String,
    pub lead_type: String,
    pub timeframe: String,
    pub property_details: String,
    pub lead_quality: String,
    pub status: String,
    pub call_duration: u64,
    pub call_transcript: String,
    pub call_recording_url: Option<String>,
}

/// Probe table entry for `field`.
///
/// `PROBE_TABLE` is laid out in `LeadField` declaration order.
pub fn probe_for(field: LeadField) -> &'static FieldProbe {
    &PROBE_TABLE[field as usize]
}

/// Read a single source location, ignoring empty strings.
pub fn read_source(call: &CallPayload, source: Source) -> Option<String> {
    let value = match source {
        Source::Call(CallField::FromNumber) => call.from_number.clone(),
        Source::Call(CallField::ToNumber) => call.to_number.clone(),
        Source::Call(CallField::Transcript) => call.transcript.clone(),
        Source::Call(CallField::RecordingUrl) => call.recording_url.clone(),
        Source::Analysis(key) => call
            .analysis_data()
            .and_then(|bag| bag.get(key))
            .and_then(scalar_string),
        Source::DynamicVars(key) => call
            .dynamic_variables()
            .and_then(|bag| bag.get(key))
            .and_then(scalar_string),
    };
    value.filter(|v| !v.is_empty())
}

/// First present, non-empty value for `field`, without applying the fallback.
pub fn probe(call: &CallPayload, field: LeadField) -> Option<String> {
    probe_for(field)
        .sources
        .iter()
        .find_map(|source| read_source(call, *source))
}

/// Probe `field` and fall back to its default (empty when it has none).
pub fn probe_or_default(call: &CallPayload, field: LeadField) -> String {
    let entry = probe_for(field);
    probe(call, field).unwrap_or_else(|| entry.fallback.unwrap_or_default().to_string())
}

/// Call length in whole seconds.
///
/// Uses `duration_ms` when present, otherwise `end_timestamp - start_timestamp`,
/// otherwise 0. Negative spans clamp to 0.
pub fn call_duration_secs(call: &CallPayload) -> u64 {
    let millis = match (call.duration_ms, call.start_timestamp, call.end_timestamp) {
        (Some(duration), _, _) => duration,
        (None, Some(start), Some(end)) => end - start,
        _ => 0.0,
    };
    let secs = (millis / 1000.0).floor();
    if secs.is_finite() && secs > 0.0 {
        secs as u64
    } else {
        0
    }
}

/// Pull every lead field out of `call`.
pub fn extract(call: &CallPayload) -> ExtractedFields {
    ExtractedFields {
        phone: probe(call, LeadField::Phone),
        agent_phone_number: probe_or_default(call, LeadField::AgentPhoneNumber),
        name: probe_or_default(call, LeadField::Name),
        email: probe_or_default(call, LeadField::Email),
        lead_type: probe_or_default(call, LeadField::LeadType),
        timeframe: probe_or_default(call, LeadField::Timeframe),
        property_details: probe_or_default(call, LeadField::PropertyDetails),
        lead_quality: probe_or_default(call, LeadField::LeadQuality),
        status: probe_or_default(call, LeadField::Status),
        call_duration: call_duration_secs(call),
        call_transcript: probe_or_default(call, LeadField::CallTranscript),
        call_recording_url: probe(call, LeadField::CallRecordingUrl),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn call(value: Value) -> CallPayload {
        serde_json::from_value(value).expect("valid call payload")
    }

    #[test]
    fn every_field_has_a_probe() {
        let fields = [
            LeadField::Phone,
            LeadField::AgentPhoneNumber,
            LeadField::Name,
            LeadField::Email,
            LeadField::LeadType,
            LeadField::Timeframe,
            LeadField::PropertyDetails,
            LeadField::LeadQuality,
            LeadField::Status,
            LeadField::CallTranscript,
            LeadField::CallRecordingUrl,
        ];
        for field in fields {
            assert_eq!(probe_for(field).field, field);
        }
        assert_eq!(PROBE_TABLE.len(), fields.len());
    }

    #[test]
    fn phone_precedence() {
        let full = json!({
            "from_number": "111-111-1111",
            "retell_llm_dynamic_variables": {"customer_phone": "222-222-2222"},
            "call_analysis": {"custom_analysis_data": {"number": "333-333-3333", "phone": "444-444-4444"}}
        });
        assert_eq!(probe(&call(full), LeadField::Phone).as_deref(), Some("111-111-1111"));

        let no_from = json!({
            "from_number": "",
            "retell_llm_dynamic_variables": {"customer_phone": "222-222-2222"},
            "call_analysis": {"custom_analysis_data": {"number": "333-333-3333"}}
        });
        assert_eq!(probe(&call(no_from), LeadField::Phone).as_deref(), Some("222-222-2222"));

        let analysis_only = json!({
            "call_analysis": {"custom_analysis_data": {"number": "333-333-3333", "phone": "444-444-4444"}}
        });
        assert_eq!(
            probe(&call(analysis_only), LeadField::Phone).as_deref(),
            Some("333-333-3333")
        );

        let phone_key = json!({"call_analysis": {"custom_analysis_data": {"phone": "444-444-4444"}}});
        assert_eq!(
            probe(&call(phone_key), LeadField::Phone).as_deref(),
            Some("444-444-4444")
        );

        assert_eq!(probe(&call(json!({})), LeadField::Phone), None);
    }

    #[test]
    fn agent_phone_prefers_hyphenated_key() {
        let c = call(json!({
            "to_number": "+15550000003",
            "call_analysis": {"custom_analysis_data": {
                "agent_phone-number": "+15550000001",
                "agent_phone_number": "+15550000002"
            }}
        }));
        assert_eq!(probe_or_default(&c, LeadField::AgentPhoneNumber), "+15550000001");

        let c = call(json!({
            "to_number": "+15550000003",
            "call_analysis": {"custom_analysis_data": {"agent_phone_number": "+15550000002"}}
        }));
        assert_eq!(probe_or_default(&c, LeadField::AgentPhoneNumber), "+15550000002");

        let c = call(json!({"to_number": "+15550000003"}));
        assert_eq!(probe_or_default(&c, LeadField::AgentPhoneNumber), "+15550000003");

        assert_eq!(probe_or_default(&call(json!({})), LeadField::AgentPhoneNumber), "");
    }

    #[test]
    fn analysis_beats_dynamic_variables() {
        let c = call(json!({
            "call_analysis": {"custom_analysis_data": {"name": "From Analysis"}},
            "retell_llm_dynamic_variables": {"customer_name": "From Vars", "lead_type": "seller"}
        }));
        let fields = extract(&c);
        assert_eq!(fields.name, "From Analysis");
        assert_eq!(fields.lead_type, "seller");
    }

    #[test]
    fn defaults_when_bags_missing() {
        let fields = extract(&call(json!({"call_id": "c1", "from_number": "555-123-4567"})));
        assert_eq!(fields.phone.as_deref(), Some("555-123-4567"));
        assert_eq!(fields.name, "Unknown");
        assert_eq!(fields.email, "");
        assert_eq!(fields.lead_type, "buyer");
        assert_eq!(fields.timeframe, "Unknown");
        assert_eq!(fields.property_details, "");
        assert_eq!(fields.lead_quality, "cold");
        assert_eq!(fields.status, "new");
        assert_eq!(fields.call_duration, 0);
        assert_eq!(fields.call_transcript, "");
        assert_eq!(fields.call_recording_url, None);
    }

    #[test]
    fn numeric_bag_values_are_stringified() {
        let c = call(json!({"call_analysis": {"custom_analysis_data": {"number": 5551234567u64}}}));
        assert_eq!(probe(&c, LeadField::Phone).as_deref(), Some("5551234567"));
    }

    #[test]
    fn duration_from_millis() {
        let c = call(json!({"duration_ms": 65999, "start_timestamp": 0, "end_timestamp": 1000}));
        assert_eq!(call_duration_secs(&c), 65);
    }

    #[test]
    fn duration_from_timestamps() {
        let c = call(json!({"start_timestamp": 1_700_000_000_000u64, "end_timestamp": 1_700_000_042_900u64}));
        assert_eq!(call_duration_secs(&c), 42);
    }

    #[test]
    fn duration_never_negative() {
        let c = call(json!({"start_timestamp": 5000, "end_timestamp": 1000}));
        assert_eq!(call_duration_secs(&c), 0);
        let c = call(json!({"duration_ms": -300}));
        assert_eq!(call_duration_secs(&c), 0);
        let c = call(json!({"start_timestamp": 5000}));
        assert_eq!(call_duration_secs(&c), 0);
    }

    #[test]
    fn recording_url_is_optional() {
        let c = call(json!({"recording_url": "https://cdn.example.com/r.wav"}));
        assert_eq!(
            extract(&c).call_recording_url.as_deref(),
            Some("https://cdn.example.com/r.wav")
        );
    }
}
