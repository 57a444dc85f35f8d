//! PostgREST-compatible backend.
//!
//! Talks to `{url}/rest/v1/{table}` with a service credential sent both as
//! `apikey` and as a bearer token. The credential must be allowed to bypass
//! row-level security: this service writes leads on behalf of every tenant.
use std::time::Duration;

use async_trait::async_trait;
use intake::NewLead;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::{LeadRef, LeadStore, StoreError, StoredLead, TenantProfile};

const REST_PREFIX: &str = "/rest/v1";

#[derive(Clone, Debug)]
pub struct RestConfig {
    pub url: String,
    pub key: SecretString,
    pub timeout: Duration,
    pub leads_table: String,
    pub tenants_table: String,
}

impl RestConfig {
    pub fn new(url: impl Into<String>, key: SecretString) -> Self {
        Self {
            url: url.into(),
            key,
            timeout: Duration::from_secs(10),
            leads_table: "leads".to_string(),
            tenants_table: "user_profiles".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
    details: Option<String>,
}

pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    leads_table: String,
    tenants_table: String,
}

impl RestStore {
    pub fn new(config: RestConfig) -> Result<Self, StoreError> {
        if config.url.trim().is_empty() {
            return Err(StoreError::Config("store url is empty".to_string()));
        }
        if config.key.expose_secret().is_empty() {
            return Err(StoreError::Config("store credential is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(auth_headers(&config.key)?)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: format!("{}{}", config.url.trim_end_matches('/'), REST_PREFIX),
            leads_table: config.leads_table,
            tenants_table: config.tenants_table,
        })
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn read_rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, StoreError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

fn auth_headers(key: &SecretString) -> Result<HeaderMap, StoreError> {
    let secret = key.expose_secret();
    let mut apikey = HeaderValue::from_str(secret)
        .map_err(|_| StoreError::Config("store credential is not a valid header".to_string()))?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {secret}"))
        .map_err(|_| StoreError::Config("store credential is not a valid header".to_string()))?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert("apikey", apikey);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

fn rejection(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<PostgrestError>(body)
        .ok()
        .and_then(|e| e.message.or(e.details))
        .unwrap_or_else(|| body.trim().to_string());
    StoreError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

#[async_trait]
impl LeadStore for RestStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<StoredLead, StoreError> {
        let response = self
            .client
            .post(self.endpoint(&self.leads_table))
            .header("Prefer", "return=representation")
            .json(&[lead])
            .send()
            .await
            .map_err(transport)?;

        let mut rows: Vec<StoredLead> = Self::read_rows(response).await?;
        debug!(rows = rows.len(), "lead_insert_returned");
        if rows.is_empty() {
            return Err(StoreError::Decode(
                "insert returned no representation".to_string(),
            ));
        }
        Ok(rows.swap_remove(0))
    }

    async fn find_lead_by_transcript(
        &self,
        transcript: &str,
    ) -> Result<Option<LeadRef>, StoreError> {
        let filter = format!("eq.{transcript}");
        let response = self
            .client
            .get(self.endpoint(&self.leads_table))
            .query(&[("select", "id"), ("call_transcript", &filter), ("limit", "1")])
            .send()
            .await
            .map_err(transport)?;

        let rows: Vec<LeadRef> = Self::read_rows(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_tenants_by_agent_phone(
        &self,
        agent_phone: &str,
    ) -> Result<Vec<TenantProfile>, StoreError> {
        let filter = format!("eq.{agent_phone}");
        let response = self
            .client
            .get(self.endpoint(&self.tenants_table))
            .query(&[
                ("select", "user_id,agent_phone_number"),
                ("agent_phone_number", &filter),
                ("limit", "2"),
            ])
            .send()
            .await
            .map_err(transport)?;

        Self::read_rows(response).await
    }
}
