//! Tenant routing: agent phone number to owning `user_id`.

use store::{LeadStore, StoreError};
use tracing::{error, warn};

use crate::config::LookupFailurePolicy;

/// How a routing key was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantResolution {
    /// Exactly one tenant owns the agent number.
    Owned(String),
    /// Empty routing key; no lookup was made.
    NoRoutingKey,
    NotFound,
    /// More than one tenant claims the number.
    Ambiguous,
    /// The lookup failed and policy routed the lead unowned anyway.
    LookupFailed,
}

impl TenantResolution {
    pub fn user_id(&self) -> Option<String> {
        match self {
            TenantResolution::Owned(id) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TenantResolution::Owned(_) => "owned",
            TenantResolution::NoRoutingKey => "no_routing_key",
            TenantResolution::NotFound => "not_found",
            TenantResolution::Ambiguous => "ambiguous",
            TenantResolution::LookupFailed => "lookup_failed",
        }
    }
}

/// Resolve `agent_phone` to a tenant.
///
/// Only a store failure under [`LookupFailurePolicy::Reject`] returns `Err`;
/// every other outcome lets the write proceed.
pub async fn resolve_tenant(
    store: &dyn LeadStore,
    agent_phone: &str,
    policy: LookupFailurePolicy,
) -> Result<TenantResolution, StoreError> {
    if agent_phone.is_empty() {
        return Ok(TenantResolution::NoRoutingKey);
    }

    let mut tenants = match store.find_tenants_by_agent_phone(agent_phone).await {
        Ok(tenants) => tenants,
        Err(err) => {
            return match policy {
                LookupFailurePolicy::RouteUnowned => {
                    warn!(
                        agent_phone,
                        error = %err,
                        "tenant_lookup_failed_routing_unowned"
                    );
                    Ok(TenantResolution::LookupFailed)
                }
                LookupFailurePolicy::Reject => {
                    error!(agent_phone, error = %err, "tenant_lookup_failed");
                    Err(err)
                }
            };
        }
    };

    match tenants.len() {
        0 => {
            warn!(agent_phone, "no_tenant_for_agent_phone");
            Ok(TenantResolution::NotFound)
        }
        1 => Ok(TenantResolution::Owned(tenants.swap_remove(0).user_id)),
        matches => {
            error!(
                agent_phone,
                matches, "agent_phone_claimed_by_multiple_tenants"
            );
            Ok(TenantResolution::Ambiguous)
        }
    }
}
