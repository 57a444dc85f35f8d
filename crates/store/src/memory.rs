use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use intake::NewLead;
use uuid::Uuid;

use crate::{LeadRef, LeadStore, StoreError, StoredLead, TenantProfile};

/// An in-memory backend using `RwLock`-guarded vectors.
///
/// Locks are never held across an await point.
#[derive(Default)]
pub struct InMemoryStore {
    leads: RwLock<Vec<StoredLead>>,
    tenants: RwLock<Vec<TenantProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenants<I>(tenants: I) -> Self
    where
        I: IntoIterator<Item = TenantProfile>,
    {
        Self {
            leads: RwLock::new(Vec::new()),
            tenants: RwLock::new(tenants.into_iter().collect()),
        }
    }

    pub fn add_tenant(&self, profile: TenantProfile) -> Result<(), StoreError> {
        self.tenants
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .push(profile);
        Ok(())
    }

    /// Snapshot of every stored lead, in insertion order.
    pub fn leads(&self) -> Vec<StoredLead> {
        self.leads
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn lead_count(&self) -> usize {
        self.leads.read().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LeadStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<StoredLead, StoreError> {
        let now = Utc::now();
        let stored = StoredLead {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            lead,
        };
        self.leads
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .push(stored.clone());
        Ok(stored)
    }

    async fn find_lead_by_transcript(
        &self,
        transcript: &str,
    ) -> Result<Option<LeadRef>, StoreError> {
        let guard = self
            .leads
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard
            .iter()
            .find(|stored| stored.lead.call_transcript == transcript)
            .map(LeadRef::from))
    }

    async fn find_tenants_by_agent_phone(
        &self,
        agent_phone: &str,
    ) -> Result<Vec<TenantProfile>, StoreError> {
        let guard = self
            .tenants
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard
            .iter()
            .filter(|t| t.agent_phone_number.as_deref() == Some(agent_phone))
            .take(2)
            .cloned()
            .collect())
    }
}
