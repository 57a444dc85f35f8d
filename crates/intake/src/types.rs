//! Wire and domain types for the intake crate.
//!
//! Inbound webhook bodies are deserialized leniently: every scalar the voice
//! platform sends is read as "maybe a string", so a number where a string was
//! expected (or a stray `null`) never fails the whole request. Shape checks
//! that do matter (is there a `call` object at all?) are left to the
//! dispatcher.
//!
//! # Type Hierarchy
//!
//! ```text
//! InboundEvent
//! ├── event: Option<String>            -> EventKind
//! └── call: Option<CallPayload>
//!     ├── call_id, call_type, from_number, to_number
//!     ├── duration_ms | start_timestamp + end_timestamp
//!     ├── transcript, recording_url
//!     ├── call_analysis.custom_analysis_data   (analysis bag)
//!     └── retell_llm_dynamic_variables         (dynamic variables bag)
//!
//!         ↓ extract() + normalize()
//!
//! NormalizedLead  ──(tenant resolution)──▶  NewLead  ──(store)──▶  StoredLead
//! ```
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::normalize::Vocabulary;

/// Free-form key/value bag attached to a call.
pub type FieldBag = Map<String, Value>;

/// Top-level webhook body: `{ "event": ..., "call": {...} }`.
///
/// Only a JSON object is accepted; arrays and scalars fail to deserialize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundEvent {
    pub event: Option<String>,

    /// Only an object counts as a call; any other JSON value is treated as absent.
    pub call: Option<CallPayload>,
}

#[derive(Deserialize)]
struct EnvelopeFields {
    #[serde(default, deserialize_with = "lenient::string")]
    event: Option<String>,
    #[serde(default, deserialize_with = "lenient::call")]
    call: Option<CallPayload>,
}

impl<'de> Deserialize<'de> for InboundEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        let found = match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => {
                let fields: EnvelopeFields =
                    serde_json::from_value(value).map_err(D::Error::custom)?;
                return Ok(InboundEvent {
                    event: fields.event,
                    call: fields.call,
                });
            }
            Value::Array(_) => "array",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
        };
        Err(D::Error::custom(format!(
            "webhook body must be a JSON object, found {found}"
        )))
    }
}

impl InboundEvent {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Event kind, if the `event` field carried a non-empty value.
    pub fn kind(&self) -> Option<EventKind> {
        self.event
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(EventKind::from_wire)
    }
}

/// Event types emitted by the voice platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    CallStarted,
    CallEnded,
    /// The only event that carries lead data.
    CallAnalyzed,
    /// Anything else; acknowledged for forward compatibility.
    Other(String),
}

impl EventKind {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "call_started" => EventKind::CallStarted,
            "call_ended" => EventKind::CallEnded,
            "call_analyzed" => EventKind::CallAnalyzed,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::CallStarted => "call_started",
            EventKind::CallEnded => "call_ended",
            EventKind::CallAnalyzed => "call_analyzed",
            EventKind::Other(other) => other,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `call` object of a webhook.
///
/// Telephony calls populate `from_number`/`to_number`; web calls usually only
/// carry the analysis and dynamic-variable bags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CallPayload {
    #[serde(default, deserialize_with = "lenient::string")]
    pub call_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub call_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub from_number: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub to_number: Option<String>,

    #[serde(default, deserialize_with = "lenient::number")]
    pub duration_ms: Option<f64>,

    /// Epoch milliseconds.
    #[serde(default, deserialize_with = "lenient::number")]
    pub start_timestamp: Option<f64>,

    /// Epoch milliseconds.
    #[serde(default, deserialize_with = "lenient::number")]
    pub end_timestamp: Option<f64>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub transcript: Option<String>,

    #[serde(default, deserialize_with = "lenient::string")]
    pub recording_url: Option<String>,

    #[serde(default, deserialize_with = "lenient::analysis")]
    pub call_analysis: Option<CallAnalysis>,

    #[serde(
        default,
        rename = "retell_llm_dynamic_variables",
        deserialize_with = "lenient::object"
    )]
    pub dynamic_variables: Option<FieldBag>,
}

impl CallPayload {
    /// The call identifier, ignoring empty strings.
    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref().filter(|id| !id.is_empty())
    }

    /// `call_analysis.custom_analysis_data`, if present.
    pub fn analysis_data(&self) -> Option<&FieldBag> {
        self.call_analysis
            .as_ref()
            .and_then(|a| a.custom_analysis_data.as_ref())
    }

    pub fn dynamic_variables(&self) -> Option<&FieldBag> {
        self.dynamic_variables.as_ref()
    }
}

/// Post-call analysis block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CallAnalysis {
    #[serde(default, deserialize_with = "lenient::object")]
    pub custom_analysis_data: Option<FieldBag>,
}

/// Buyer or seller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadType {
    #[default]
    Buyer,
    Seller,
}

impl Vocabulary for LeadType {
    const VARIANTS: &'static [(&'static str, Self)] =
        &[("buyer", LeadType::Buyer), ("seller", LeadType::Seller)];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadQuality {
    Hot,
    Warm,
    #[default]
    Cold,
}

impl Vocabulary for LeadQuality {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("hot", LeadQuality::Hot),
        ("warm", LeadQuality::Warm),
        ("cold", LeadQuality::Cold),
    ];
}

/// Pipeline status of a lead. Only `New` is ever assigned by default here;
/// the others arrive from upstream analysis or are set later by tenants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Closed,
    Dead,
}

impl Vocabulary for LeadStatus {
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("new", LeadStatus::New),
        ("contacted", LeadStatus::Contacted),
        ("qualified", LeadStatus::Qualified),
        ("closed", LeadStatus::Closed),
        ("dead", LeadStatus::Dead),
    ];
}

/// Outcome recorded by a tenant after working a lead. Never set at ingest.
///
/// Values outside this set decode as `None` on stored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Successful,
    OnTheFence,
    Unsuccessful,
    Incomplete,
}

/// Insert shape of a lead: everything except the store-assigned columns.
///
/// Columns that other writers may leave `NULL` decode to their empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub phone: String,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub email: String,
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    pub timeframe: String,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub property_details: String,
    pub lead_quality: LeadQuality,
    pub status: LeadStatus,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub call_duration: u64,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub call_transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_recording_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub agent_phone_number: String,
    /// Owning tenant; `None` means the lead could not be routed.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub notes: Vec<String>,
    #[serde(default, deserialize_with = "lenient::null_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, deserialize_with = "lenient::completion_status")]
    pub completion_status: Option<CompletionStatus>,
}

/// Deserializers that coerce loosely-typed JSON instead of rejecting it.
mod lenient {
    use super::*;
    use serde::de::Error as _;

    pub(crate) fn scalar_string(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub(crate) fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(scalar_string))
    }

    pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite()))
    }

    pub(crate) fn object<'de, D>(deserializer: D) -> Result<Option<FieldBag>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Object(map)) => Ok(Some(map)),
            _ => Ok(None),
        }
    }

    pub(crate) fn analysis<'de, D>(deserializer: D) -> Result<Option<CallAnalysis>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            Some(value @ Value::Object(_)) => serde_json::from_value(value)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }

    pub(crate) fn completion_status<'de, D>(
        deserializer: D,
    ) -> Result<Option<CompletionStatus>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(deserializer)?
            .and_then(|value| serde_json::from_value(value).ok()))
    }

    pub(crate) fn call<'de, D>(deserializer: D) -> Result<Option<CallPayload>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            Some(value @ Value::Object(_)) => serde_json::from_value(value)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}

pub(crate) use lenient::scalar_string;
