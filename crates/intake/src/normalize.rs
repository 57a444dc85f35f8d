//! Normalization of extracted fields into domain values.
//!
//! Upstream data is untrusted, so everything here is tolerant: enumerations
//! fall back to their defaults, malformed emails are dropped, free text is
//! trimmed. The single exception is the contact phone number, without which a
//! lead is worthless; [`normalize`] rejects it with a typed error.
use serde::Serialize;
use tracing::warn;

use crate::error::IntakeError;
use crate::extract::ExtractedFields;
use crate::types::{LeadQuality, LeadStatus, LeadType, NewLead};

/// Minimum number of digits a phone number must contain.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Whitespace for shape checks and trimming: ASCII whitespace including
/// vertical tab, the Unicode space and line separators, and the byte order
/// mark. NEL (U+0085) does not count.
pub fn is_space(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r' | ' '
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

/// `s` without leading and trailing [`is_space`] characters.
pub fn trim_space(s: &str) -> &str {
    s.trim_matches(is_space)
}

/// A closed set of lowercase wire names mapped to enum values.
pub trait Vocabulary: Sized + Copy + Default + 'static {
    const VARIANTS: &'static [(&'static str, Self)];

    /// Exact match against the wire names after trimming and lowercasing.
    fn parse_loose(raw: &str) -> Option<Self> {
        let needle = trim_space(raw).to_lowercase();
        Self::VARIANTS
            .iter()
            .find(|(name, _)| *name == needle)
            .map(|(_, value)| *value)
    }

    fn wire_name(self) -> &'static str
    where
        Self: PartialEq,
    {
        Self::VARIANTS
            .iter()
            .find(|(_, value)| *value == self)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }
}

/// Map a raw value onto `T`, falling back to `T::default()` for anything
/// outside the vocabulary (including absence).
pub fn normalize_enum<T: Vocabulary>(raw: Option<&str>) -> T {
    raw.and_then(T::parse_loose).unwrap_or_default()
}

/// Phone shape check: only digits, whitespace and `+ - ( )`, with at least
/// [`MIN_PHONE_DIGITS`] digits.
pub fn validate_phone(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    let allowed = candidate
        .chars()
        .all(|c| c.is_ascii_digit() || is_space(c) || matches!(c, '+' | '-' | '(' | ')'));
    allowed && candidate.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}

/// Basic `local@domain.tld` shape check. Empty is valid since email is optional.
pub fn validate_email(candidate: &str) -> bool {
    if candidate.is_empty() {
        return true;
    }
    if candidate.chars().any(is_space) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Validated email, or empty when the candidate is malformed.
pub fn normalize_email(raw: &str) -> String {
    if validate_email(raw) {
        trim_space(raw).to_string()
    } else {
        warn!(email = %raw, "invalid_email_discarded");
        String::new()
    }
}

/// A lead after normalization, before tenant resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedLead {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub lead_type: LeadType,
    pub timeframe: String,
    pub property_details: String,
    pub lead_quality: LeadQuality,
    pub status: LeadStatus,
    pub call_duration: u64,
    pub call_transcript: String,
    pub call_recording_url: Option<String>,
    pub agent_phone_number: String,
}

impl NormalizedLead {
    /// Build the insert record, attaching the resolved owner.
    pub fn into_new_lead(self, user_id: Option<String>) -> NewLead {
        NewLead {
            name: self.name,
            phone: self.phone,
            email: self.email,
            lead_type: self.lead_type,
            timeframe: self.timeframe,
            property_details: self.property_details,
            lead_quality: self.lead_quality,
            status: self.status,
            call_duration: self.call_duration,
            call_transcript: self.call_transcript,
            call_recording_url: self.call_recording_url,
            agent_phone_number: self.agent_phone_number,
            user_id,
            notes: Vec::new(),
            tags: Vec::new(),
            is_archived: false,
            completion_status: None,
        }
    }
}

/// Normalize extracted fields. Fails only when no usable phone is present.
pub fn normalize(fields: ExtractedFields) -> Result<NormalizedLead, IntakeError> {
    let phone = match fields.phone {
        None => return Err(IntakeError::MissingPhone),
        Some(p) if !validate_phone(&p) => return Err(IntakeError::InvalidPhone(p)),
        Some(p) => trim_space(&p).to_string(),
    };

    Ok(NormalizedLead {
        name: trim_space(&fields.name).to_string(),
        phone,
        email: normalize_email(&fields.email),
        lead_type: normalize_enum(Some(&fields.lead_type)),
        timeframe: trim_space(&fields.timeframe).to_string(),
        property_details: trim_space(&fields.property_details).to_string(),
        lead_quality: normalize_enum(Some(&fields.lead_quality)),
        status: normalize_enum(Some(&fields.status)),
        call_duration: fields.call_duration,
        call_transcript: trim_space(&fields.call_transcript).to_string(),
        call_recording_url: fields
            .call_recording_url
            .map(|url| trim_space(&url).to_string())
            .filter(|url| !url.is_empty()),
        agent_phone_number: fields.agent_phone_number,
    })
}
