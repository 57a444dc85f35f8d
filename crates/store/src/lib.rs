//! Persistence contract for leads and tenant profiles.
//!
//! The pipeline talks to storage exclusively through [`LeadStore`]; the
//! backend behind it is picked at startup from a [`BackendConfig`]:
//!
//! - [`InMemoryStore`] for tests and local development
//! - [`RestStore`] for a PostgREST-style hosted Postgres (`rest` feature)
//!
//! All calls are single-shot. Retrying is the webhook sender's job, which is
//! why the pipeline cares about idempotency in the first place.
//!
//! # Example
//! ```
//! use store::{BackendConfig, LeadStore};
//!
//! let store = BackendConfig::in_memory().build().unwrap();
//! assert_eq!(store.name(), "memory");
//! ```
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake::NewLead;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
#[cfg(feature = "rest")]
pub mod rest;

pub use memory::InMemoryStore;
#[cfg(feature = "rest")]
pub use rest::{RestConfig, RestStore};

/// A lead as persisted, including store-assigned columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLead {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub lead: NewLead,
}

/// Identity of an existing lead, as returned by the duplicate check.
///
/// Only the key is read back; every other column belongs to the tenant UI
/// once the row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadRef {
    pub id: Uuid,
}

impl From<&StoredLead> for LeadRef {
    fn from(stored: &StoredLead) -> Self {
        LeadRef { id: stored.id }
    }
}

/// The slice of a tenant profile this service reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    pub user_id: String,
    #[serde(default)]
    pub agent_phone_number: Option<String>,
}

impl TenantProfile {
    pub fn new(user_id: impl Into<String>, agent_phone_number: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            agent_phone_number: Some(agent_phone_number.into()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store answered and refused the request (constraint, permission, ...).
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn backend<E: fmt::Display>(err: E) -> Self {
        StoreError::Backend(err.to_string())
    }

    /// The store-provided message without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            StoreError::Rejected { message, .. } => message,
            StoreError::Transport(msg)
            | StoreError::Decode(msg)
            | StoreError::Backend(msg)
            | StoreError::Config(msg) => msg,
        }
    }
}

/// Operations the lead pipeline needs from persistence.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Short backend name for logs and readiness output.
    fn name(&self) -> &'static str;

    /// Insert one lead and return the stored row.
    async fn insert_lead(&self, lead: NewLead) -> Result<StoredLead, StoreError>;

    /// First lead whose transcript equals `transcript` exactly.
    async fn find_lead_by_transcript(
        &self,
        transcript: &str,
    ) -> Result<Option<LeadRef>, StoreError>;

    /// Tenants registered under `agent_phone`. Backends return at most two
    /// rows; more than one match is a configuration error the caller handles.
    async fn find_tenants_by_agent_phone(
        &self,
        agent_phone: &str,
    ) -> Result<Vec<TenantProfile>, StoreError>;
}

/// Backend selection.
#[derive(Clone, Debug, Default)]
pub enum BackendConfig {
    /// Process-local store. Data is lost on restart.
    #[default]
    InMemory,
    /// PostgREST endpoint authenticated with a service credential.
    Rest {
        url: String,
        key: SecretString,
        timeout_secs: u64,
    },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn rest<U: Into<String>>(url: U, key: SecretString) -> Self {
        BackendConfig::Rest {
            url: url.into(),
            key,
            timeout_secs: 10,
        }
    }

    /// Build the configured backend.
    pub fn build(&self) -> Result<Arc<dyn LeadStore>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Arc::new(InMemoryStore::new())),
            BackendConfig::Rest {
                url,
                key,
                timeout_secs,
            } => {
                #[cfg(feature = "rest")]
                {
                    let config = RestConfig::new(url.clone(), key.clone())
                        .with_timeout(std::time::Duration::from_secs(*timeout_secs));
                    Ok(Arc::new(RestStore::new(config)?))
                }
                #[cfg(not(feature = "rest"))]
                {
                    let _ = (url, key, timeout_secs);
                    Err(StoreError::Config(
                        "rest backend disabled at compile time".to_string(),
                    ))
                }
            }
        }
    }
}
