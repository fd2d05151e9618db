// Corporate registry - registration, renewals, and a flat revenue tax.
//
// Renewal is the only moving part: corporations lapse when their renewal date
// passes (a background sweep marks them), and renewing from Lapsed cures the
// lapse. Dissolution is terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::core::citizenship::{self, CitizenshipError};
use crate::core::registry::{RegistryError, RegistryService, RegistryStore};

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorporationStatus {
    Active,
    Lapsed,
    Dissolved,
}

impl std::fmt::Display for CorporationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorporationStatus::Active => write!(f, "Active"),
            CorporationStatus::Lapsed => write!(f, "Lapsed"),
            CorporationStatus::Dissolved => write!(f, "Dissolved"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corporation {
    /// Registration number, e.g. `C-48213907`.
    pub reg_no: String,
    pub name: String,
    pub owner_id: u64,
    pub registered_at: DateTime<Utc>,
    pub renewal_due: DateTime<Utc>,
    pub status: CorporationStatus,
    /// Revenue declared since the last assessment.
    pub declared_revenue: i64,
}

#[derive(Debug, Clone)]
pub struct TaxAssessment {
    pub reg_no: String,
    pub revenue: i64,
    pub rate: f64,
    pub tax_due: i64,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CorporationError {
    #[error("No corporation with registration number {0}")]
    UnknownCorporation(String),

    #[error("A corporation named \"{0}\" is already registered")]
    NameTaken(String),

    #[error("Corporation is dissolved")]
    Dissolved,

    #[error("Declared revenue must be positive")]
    BadRevenue,

    #[error(transparent)]
    Citizenship(#[from] CitizenshipError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CorporationConfig {
    /// How long a registration lasts before it must be renewed.
    pub renewal_period_days: i64,

    /// Flat tax rate applied to declared revenue at assessment.
    pub tax_rate: f64,
}

impl Default for CorporationConfig {
    fn default() -> Self {
        Self {
            renewal_period_days: 90,
            tax_rate: 0.10,
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct CorporationService<S: RegistryStore> {
    registry: Arc<RegistryService<S>>,
    config: CorporationConfig,
}

impl<S: RegistryStore> CorporationService<S> {
    pub fn new(registry: Arc<RegistryService<S>>) -> Self {
        Self {
            registry,
            config: CorporationConfig::default(),
        }
    }

    pub fn new_with_config(registry: Arc<RegistryService<S>>, config: CorporationConfig) -> Self {
        Self { registry, config }
    }

    /// Register a corporation. Names are unique case-insensitively.
    pub async fn register(
        &self,
        owner_id: u64,
        name: String,
    ) -> Result<Corporation, CorporationError> {
        let period = Duration::days(self.config.renewal_period_days);
        self.registry
            .mutate(|reg| {
                citizenship::require_active(reg, owner_id)?;
                if reg
                    .corporations
                    .values()
                    .any(|c| c.name.eq_ignore_ascii_case(&name))
                {
                    return Err(CorporationError::NameTaken(name));
                }

                let reg_no = Self::issue_reg_no(owner_id, |candidate| {
                    reg.corporations.contains_key(candidate)
                });
                let now = Utc::now();
                let corporation = Corporation {
                    reg_no: reg_no.clone(),
                    name,
                    owner_id,
                    registered_at: now,
                    renewal_due: now + period,
                    status: CorporationStatus::Active,
                    declared_revenue: 0,
                };
                reg.corporations.insert(reg_no, corporation.clone());
                Ok(corporation)
            })
            .await
    }

    /// Renew a registration. Extends from the later of now and the current
    /// due date, so renewing early does not shorten the term. Renewing a
    /// lapsed corporation reactivates it.
    pub async fn renew(&self, reg_no: &str) -> Result<Corporation, CorporationError> {
        let period = Duration::days(self.config.renewal_period_days);
        self.registry
            .mutate(|reg| {
                let corporation = reg
                    .corporations
                    .get_mut(reg_no)
                    .ok_or_else(|| CorporationError::UnknownCorporation(reg_no.to_string()))?;
                if corporation.status == CorporationStatus::Dissolved {
                    return Err(CorporationError::Dissolved);
                }
                let base = corporation.renewal_due.max(Utc::now());
                corporation.renewal_due = base + period;
                corporation.status = CorporationStatus::Active;
                Ok(corporation.clone())
            })
            .await
    }

    /// Add to the revenue figure the next assessment will tax.
    pub async fn declare_revenue(
        &self,
        reg_no: &str,
        amount: i64,
    ) -> Result<Corporation, CorporationError> {
        if amount <= 0 {
            return Err(CorporationError::BadRevenue);
        }
        self.registry
            .mutate(|reg| {
                let corporation = reg
                    .corporations
                    .get_mut(reg_no)
                    .ok_or_else(|| CorporationError::UnknownCorporation(reg_no.to_string()))?;
                if corporation.status == CorporationStatus::Dissolved {
                    return Err(CorporationError::Dissolved);
                }
                corporation.declared_revenue = corporation.declared_revenue.saturating_add(amount);
                Ok(corporation.clone())
            })
            .await
    }

    /// Assess tax on everything declared since the last assessment and reset
    /// the declared figure.
    pub async fn assess_tax(&self, reg_no: &str) -> Result<TaxAssessment, CorporationError> {
        let rate = self.config.tax_rate;
        self.registry
            .mutate(|reg| {
                let corporation = reg
                    .corporations
                    .get_mut(reg_no)
                    .ok_or_else(|| CorporationError::UnknownCorporation(reg_no.to_string()))?;
                if corporation.status == CorporationStatus::Dissolved {
                    return Err(CorporationError::Dissolved);
                }
                let revenue = corporation.declared_revenue;
                corporation.declared_revenue = 0;
                Ok(TaxAssessment {
                    reg_no: reg_no.to_string(),
                    revenue,
                    rate,
                    tax_due: (revenue as f64 * rate).floor() as i64,
                })
            })
            .await
    }

    /// Mark overdue corporations as lapsed. Returns the ones that lapsed on
    /// this pass; the background sweep logs them.
    pub async fn lapse_sweep(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Corporation>, CorporationError> {
        // An idle sweep must not write: a save rotates the registry backups,
        // and a few no-op sweeps would overwrite every good generation.
        let any_due = self
            .registry
            .read(|reg| {
                reg.corporations
                    .values()
                    .any(|c| c.status == CorporationStatus::Active && c.renewal_due <= now)
            })
            .await;
        if !any_due {
            return Ok(Vec::new());
        }

        self.registry
            .mutate(|reg| {
                let mut lapsed = Vec::new();
                for corporation in reg.corporations.values_mut() {
                    if corporation.status == CorporationStatus::Active
                        && corporation.renewal_due <= now
                    {
                        corporation.status = CorporationStatus::Lapsed;
                        lapsed.push(corporation.clone());
                    }
                }
                Ok::<_, CorporationError>(lapsed)
            })
            .await
    }

    pub async fn dissolve(&self, reg_no: &str) -> Result<Corporation, CorporationError> {
        self.registry
            .mutate(|reg| {
                let corporation = reg
                    .corporations
                    .get_mut(reg_no)
                    .ok_or_else(|| CorporationError::UnknownCorporation(reg_no.to_string()))?;
                if corporation.status == CorporationStatus::Dissolved {
                    return Err(CorporationError::Dissolved);
                }
                corporation.status = CorporationStatus::Dissolved;
                Ok(corporation.clone())
            })
            .await
    }

    pub async fn corporation(&self, reg_no: &str) -> Result<Corporation, CorporationError> {
        self.registry
            .read(|reg| reg.corporations.get(reg_no).cloned())
            .await
            .ok_or_else(|| CorporationError::UnknownCorporation(reg_no.to_string()))
    }

    pub async fn owned_by(&self, owner_id: u64) -> Vec<Corporation> {
        self.registry
            .read(|reg| {
                reg.corporations
                    .values()
                    .filter(|c| c.owner_id == owner_id)
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Generate an unused `C-XXXXXXXX` registration number. Seeded from the
    /// clock and owner id; StdRng is Send so this works inside the mutate
    /// closure.
    fn issue_reg_no(owner_id: u64, taken: impl Fn(&str) -> bool) -> String {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::time::SystemTime;

        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
            ^ owner_id;
        let mut rng = StdRng::seed_from_u64(seed);

        loop {
            let candidate = format!("C-{:08}", rng.gen_range(0..100_000_000u64));
            if !taken(&candidate) {
                return candidate;
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::citizenship::CitizenshipService;
    use crate::core::registry::FederalRegistry;
    use crate::infra::registry::InMemoryRegistryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory store that counts how many times it is written.
    struct SaveCountingStore {
        inner: InMemoryRegistryStore,
        saves: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RegistryStore for SaveCountingStore {
        async fn load(&self) -> Result<FederalRegistry, RegistryError> {
            self.inner.load().await
        }

        async fn save(&self, registry: &FederalRegistry) -> Result<(), RegistryError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(registry).await
        }
    }

    async fn setup() -> CorporationService<InMemoryRegistryStore> {
        let registry = Arc::new(
            RegistryService::new(InMemoryRegistryStore::new())
                .await
                .unwrap(),
        );
        let citizenship = CitizenshipService::new(Arc::clone(&registry));
        citizenship
            .register(1, "Ada".to_string(), "Columbia".to_string())
            .await
            .unwrap();
        CorporationService::new(registry)
    }

    #[tokio::test]
    async fn test_register_issues_unique_number() {
        let svc = setup().await;
        let a = svc.register(1, "Acme".to_string()).await.unwrap();
        let b = svc.register(1, "Globex".to_string()).await.unwrap();

        assert!(a.reg_no.starts_with("C-"));
        assert_eq!(a.reg_no.len(), 10);
        assert_ne!(a.reg_no, b.reg_no);
    }

    #[tokio::test]
    async fn test_names_unique_case_insensitive() {
        let svc = setup().await;
        svc.register(1, "Acme".to_string()).await.unwrap();
        let err = svc.register(1, "ACME".to_string()).await.unwrap_err();
        assert!(matches!(err, CorporationError::NameTaken(_)));
    }

    #[tokio::test]
    async fn test_lapse_and_renewal_cure() {
        let svc = setup().await;
        let corp = svc.register(1, "Acme".to_string()).await.unwrap();

        // Nothing lapses before the due date.
        assert!(svc.lapse_sweep(Utc::now()).await.unwrap().is_empty());

        let after_due = corp.renewal_due + Duration::days(1);
        let lapsed = svc.lapse_sweep(after_due).await.unwrap();
        assert_eq!(lapsed.len(), 1);
        assert_eq!(lapsed[0].status, CorporationStatus::Lapsed);

        let renewed = svc.renew(&corp.reg_no).await.unwrap();
        assert_eq!(renewed.status, CorporationStatus::Active);
        assert!(renewed.renewal_due > corp.renewal_due);
    }

    #[tokio::test]
    async fn test_early_renewal_extends_from_due_date() {
        let svc = setup().await;
        let corp = svc.register(1, "Acme".to_string()).await.unwrap();
        let renewed = svc.renew(&corp.reg_no).await.unwrap();

        // Renewing on day one still buys a full extra period.
        let expected = corp.renewal_due + Duration::days(90);
        assert_eq!(renewed.renewal_due, expected);
    }

    #[tokio::test]
    async fn test_tax_assessment_resets_declared_revenue() {
        let svc = setup().await;
        let corp = svc.register(1, "Acme".to_string()).await.unwrap();

        svc.declare_revenue(&corp.reg_no, 1_000).await.unwrap();
        svc.declare_revenue(&corp.reg_no, 234).await.unwrap();

        let assessment = svc.assess_tax(&corp.reg_no).await.unwrap();
        assert_eq!(assessment.revenue, 1_234);
        assert_eq!(assessment.tax_due, 123); // floor(1234 * 0.10)

        // Second assessment has nothing left to tax.
        let assessment = svc.assess_tax(&corp.reg_no).await.unwrap();
        assert_eq!(assessment.revenue, 0);
        assert_eq!(assessment.tax_due, 0);
    }

    #[tokio::test]
    async fn test_dissolved_is_terminal() {
        let svc = setup().await;
        let corp = svc.register(1, "Acme".to_string()).await.unwrap();
        svc.dissolve(&corp.reg_no).await.unwrap();

        assert!(matches!(
            svc.renew(&corp.reg_no).await.unwrap_err(),
            CorporationError::Dissolved
        ));
        assert!(matches!(
            svc.declare_revenue(&corp.reg_no, 10).await.unwrap_err(),
            CorporationError::Dissolved
        ));
    }

    #[tokio::test]
    async fn test_suspended_citizen_cannot_register() {
        let registry = Arc::new(
            RegistryService::new(InMemoryRegistryStore::new())
                .await
                .unwrap(),
        );
        let citizenship = CitizenshipService::new(Arc::clone(&registry));
        citizenship
            .register(1, "Ada".to_string(), "Columbia".to_string())
            .await
            .unwrap();
        citizenship.suspend(1).await.unwrap();

        let svc = CorporationService::new(registry);
        let err = svc.register(1, "Acme".to_string()).await.unwrap_err();
        assert!(matches!(err, CorporationError::Citizenship(_)));
    }

    #[tokio::test]
    async fn test_idle_lapse_sweep_does_not_save() {
        let saves = Arc::new(AtomicUsize::new(0));
        let store = SaveCountingStore {
            inner: InMemoryRegistryStore::new(),
            saves: Arc::clone(&saves),
        };
        let registry = Arc::new(RegistryService::new(store).await.unwrap());
        let citizenship = CitizenshipService::new(Arc::clone(&registry));
        citizenship
            .register(1, "Ada".to_string(), "Columbia".to_string())
            .await
            .unwrap();
        let svc = CorporationService::new(registry);
        let corp = svc.register(1, "Acme".to_string()).await.unwrap();

        // Nothing due yet: repeated sweeps must not touch the store.
        let baseline = saves.load(Ordering::SeqCst);
        for _ in 0..3 {
            assert!(svc.lapse_sweep(Utc::now()).await.unwrap().is_empty());
        }
        assert_eq!(saves.load(Ordering::SeqCst), baseline);

        // One lapse, one save.
        let after_due = corp.renewal_due + Duration::days(1);
        assert_eq!(svc.lapse_sweep(after_due).await.unwrap().len(), 1);
        assert_eq!(saves.load(Ordering::SeqCst), baseline + 1);

        // Already lapsed, so the next sweep is idle again.
        assert!(svc.lapse_sweep(after_due).await.unwrap().is_empty());
        assert_eq!(saves.load(Ordering::SeqCst), baseline + 1);
    }

    #[tokio::test]
    async fn test_bad_revenue_rejected() {
        let svc = setup().await;
        let corp = svc.register(1, "Acme".to_string()).await.unwrap();
        assert!(matches!(
            svc.declare_revenue(&corp.reg_no, 0).await.unwrap_err(),
            CorporationError::BadRevenue
        ));
    }
}
