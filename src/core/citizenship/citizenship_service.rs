// Citizenship records for the roleplay government.
//
// The one structural rule here: a user holds at most ONE citizenship, full
// stop. The record lives in a map keyed by user id, so duplicates cannot be
// represented at all - no cleanup command needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::core::registry::{FederalRegistry, RegistryError, RegistryService, RegistryStore};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitizenStatus {
    Active,
    Suspended,
    Revoked,
}

impl std::fmt::Display for CitizenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CitizenStatus::Active => write!(f, "Active"),
            CitizenStatus::Suspended => write!(f, "Suspended"),
            CitizenStatus::Revoked => write!(f, "Revoked"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citizen {
    pub user_id: u64,
    pub name: String,
    pub region: String,
    pub status: CitizenStatus,
    pub registered_at: DateTime<Utc>,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CitizenshipError {
    #[error("User is already a citizen of {0}")]
    AlreadyRegistered(String),

    #[error("User is not a citizen")]
    NotACitizen,

    #[error("Citizen is {0}, not Active")]
    NotActive(CitizenStatus),

    #[error("Citizen is already suspended")]
    AlreadySuspended,

    #[error("Citizen is not suspended")]
    NotSuspended,

    #[error("Citizenship has been revoked and cannot change")]
    Revoked,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ============================================================================
// HELPERS USED BY OTHER SERVICES
// ============================================================================

/// Look up a citizen and require `Active` status. The legislature, election
/// and corporation services all gate participation on this.
pub fn require_active(
    registry: &FederalRegistry,
    user_id: u64,
) -> Result<&Citizen, CitizenshipError> {
    let citizen = registry
        .citizens
        .get(&user_id)
        .ok_or(CitizenshipError::NotACitizen)?;
    if citizen.status != CitizenStatus::Active {
        return Err(CitizenshipError::NotActive(citizen.status));
    }
    Ok(citizen)
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct CitizenshipService<S: RegistryStore> {
    registry: Arc<RegistryService<S>>,
}

impl<S: RegistryStore> CitizenshipService<S> {
    pub fn new(registry: Arc<RegistryService<S>>) -> Self {
        Self { registry }
    }

    /// Register a new citizen. Fails if the user already holds a citizenship
    /// anywhere - relocation is a separate, explicit operation.
    pub async fn register(
        &self,
        user_id: u64,
        name: String,
        region: String,
    ) -> Result<Citizen, CitizenshipError> {
        self.registry
            .mutate(|reg| {
                if let Some(existing) = reg.citizens.get(&user_id) {
                    return Err(CitizenshipError::AlreadyRegistered(existing.region.clone()));
                }
                let citizen = Citizen {
                    user_id,
                    name,
                    region,
                    status: CitizenStatus::Active,
                    registered_at: Utc::now(),
                };
                reg.citizens.insert(user_id, citizen.clone());
                Ok(citizen)
            })
            .await
    }

    /// Move a citizen to another region. The old citizenship is replaced in
    /// place; there is never a moment where the user holds two.
    pub async fn relocate(
        &self,
        user_id: u64,
        new_region: String,
    ) -> Result<Citizen, CitizenshipError> {
        self.registry
            .mutate(|reg| {
                let citizen = reg
                    .citizens
                    .get_mut(&user_id)
                    .ok_or(CitizenshipError::NotACitizen)?;
                match citizen.status {
                    CitizenStatus::Active => {}
                    CitizenStatus::Revoked => return Err(CitizenshipError::Revoked),
                    status => return Err(CitizenshipError::NotActive(status)),
                }
                citizen.region = new_region;
                Ok(citizen.clone())
            })
            .await
    }

    pub async fn suspend(&self, user_id: u64) -> Result<Citizen, CitizenshipError> {
        self.registry
            .mutate(|reg| {
                let citizen = reg
                    .citizens
                    .get_mut(&user_id)
                    .ok_or(CitizenshipError::NotACitizen)?;
                match citizen.status {
                    CitizenStatus::Suspended => return Err(CitizenshipError::AlreadySuspended),
                    CitizenStatus::Revoked => return Err(CitizenshipError::Revoked),
                    CitizenStatus::Active => {}
                }
                citizen.status = CitizenStatus::Suspended;
                Ok(citizen.clone())
            })
            .await
    }

    pub async fn reinstate(&self, user_id: u64) -> Result<Citizen, CitizenshipError> {
        self.registry
            .mutate(|reg| {
                let citizen = reg
                    .citizens
                    .get_mut(&user_id)
                    .ok_or(CitizenshipError::NotACitizen)?;
                match citizen.status {
                    CitizenStatus::Suspended => {}
                    CitizenStatus::Revoked => return Err(CitizenshipError::Revoked),
                    CitizenStatus::Active => return Err(CitizenshipError::NotSuspended),
                }
                citizen.status = CitizenStatus::Active;
                Ok(citizen.clone())
            })
            .await
    }

    /// Revoke a citizenship. Terminal: a revoked citizen must re-register
    /// through an admin wiping the record, which is deliberately not a
    /// command here.
    pub async fn revoke(&self, user_id: u64) -> Result<Citizen, CitizenshipError> {
        self.registry
            .mutate(|reg| {
                let citizen = reg
                    .citizens
                    .get_mut(&user_id)
                    .ok_or(CitizenshipError::NotACitizen)?;
                if citizen.status == CitizenStatus::Revoked {
                    return Err(CitizenshipError::Revoked);
                }
                citizen.status = CitizenStatus::Revoked;
                Ok(citizen.clone())
            })
            .await
    }

    pub async fn citizen(&self, user_id: u64) -> Result<Citizen, CitizenshipError> {
        self.registry
            .read(|reg| reg.citizens.get(&user_id).cloned())
            .await
            .ok_or(CitizenshipError::NotACitizen)
    }

    /// All citizens of a region, active or not, sorted by registration date.
    pub async fn roster(&self, region: &str) -> Vec<Citizen> {
        let mut citizens = self
            .registry
            .read(|reg| {
                reg.citizens
                    .values()
                    .filter(|c| c.region.eq_ignore_ascii_case(region))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        citizens.sort_by_key(|c| c.registered_at);
        citizens
    }

    /// Active citizens per region. This feeds seat apportionment.
    pub async fn population_by_region(&self) -> BTreeMap<String, u64> {
        self.registry
            .read(|reg| {
                let mut populations: BTreeMap<String, u64> = BTreeMap::new();
                for citizen in reg.citizens.values() {
                    if citizen.status == CitizenStatus::Active {
                        *populations.entry(citizen.region.clone()).or_default() += 1;
                    }
                }
                populations
            })
            .await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::registry::InMemoryRegistryStore;

    async fn service() -> CitizenshipService<InMemoryRegistryStore> {
        let registry = RegistryService::new(InMemoryRegistryStore::new())
            .await
            .unwrap();
        CitizenshipService::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_register_is_exclusive() {
        let svc = service().await;
        svc.register(1, "Ada".to_string(), "Columbia".to_string())
            .await
            .unwrap();

        let err = svc
            .register(1, "Ada".to_string(), "Cascadia".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CitizenshipError::AlreadyRegistered(region) if region == "Columbia"));
    }

    #[tokio::test]
    async fn test_relocate_replaces_region() {
        let svc = service().await;
        svc.register(1, "Ada".to_string(), "Columbia".to_string())
            .await
            .unwrap();

        let citizen = svc.relocate(1, "Cascadia".to_string()).await.unwrap();
        assert_eq!(citizen.region, "Cascadia");
        assert_eq!(svc.roster("Columbia").await.len(), 0);
        assert_eq!(svc.roster("Cascadia").await.len(), 1);
    }

    #[tokio::test]
    async fn test_suspend_and_reinstate_transitions() {
        let svc = service().await;
        svc.register(1, "Ada".to_string(), "Columbia".to_string())
            .await
            .unwrap();

        // Reinstating an active citizen is an error.
        assert!(matches!(
            svc.reinstate(1).await.unwrap_err(),
            CitizenshipError::NotSuspended
        ));

        svc.suspend(1).await.unwrap();
        assert!(matches!(
            svc.suspend(1).await.unwrap_err(),
            CitizenshipError::AlreadySuspended
        ));

        let citizen = svc.reinstate(1).await.unwrap();
        assert_eq!(citizen.status, CitizenStatus::Active);
    }

    #[tokio::test]
    async fn test_revoked_is_terminal() {
        let svc = service().await;
        svc.register(1, "Ada".to_string(), "Columbia".to_string())
            .await
            .unwrap();
        svc.revoke(1).await.unwrap();

        assert!(matches!(
            svc.relocate(1, "Cascadia".to_string()).await.unwrap_err(),
            CitizenshipError::Revoked
        ));
        assert!(matches!(
            svc.reinstate(1).await.unwrap_err(),
            CitizenshipError::Revoked
        ));
    }

    #[tokio::test]
    async fn test_population_counts_only_active() {
        let svc = service().await;
        svc.register(1, "Ada".to_string(), "Columbia".to_string())
            .await
            .unwrap();
        svc.register(2, "Bob".to_string(), "Columbia".to_string())
            .await
            .unwrap();
        svc.register(3, "Eve".to_string(), "Cascadia".to_string())
            .await
            .unwrap();
        svc.suspend(2).await.unwrap();

        let populations = svc.population_by_region().await;
        assert_eq!(populations.get("Columbia"), Some(&1));
        assert_eq!(populations.get("Cascadia"), Some(&1));
    }
}
