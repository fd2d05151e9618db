// The federal registry - the single shared state document of the roleplay
// government. Citizens, bills, committees, election contests and corporations
// all live in one serialized document, so one save covers a whole command's
// worth of mutations and there is exactly one file to back up and restore.
//
// This module has NO Discord-specific code. It defines the document shape,
// the storage port, and a service that keeps an in-memory copy in sync with
// whatever store backs it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::citizenship::Citizen;
use crate::core::corporations::Corporation;
use crate::core::elections::Contest;
use crate::core::legislature::{Bill, Committee, FloorVote};

// ============================================================================
// DOCUMENT
// ============================================================================

/// Monotonic id counters, one per section that issues sequential ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_bill: u64,
    pub next_contest: u64,
}

/// The whole government state as one document.
///
/// `BTreeMap` keeps the serialized form stable across saves, which makes the
/// on-disk diffs between backup generations readable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FederalRegistry {
    #[serde(default)]
    pub citizens: BTreeMap<u64, Citizen>,
    #[serde(default)]
    pub bills: BTreeMap<String, Bill>,
    #[serde(default)]
    pub committees: BTreeMap<String, Committee>,
    /// Open floor votes, keyed by bill id. At most one per bill.
    #[serde(default)]
    pub floor_votes: BTreeMap<String, FloorVote>,
    #[serde(default)]
    pub contests: BTreeMap<u64, Contest>,
    /// Corporations keyed by registration number.
    #[serde(default)]
    pub corporations: BTreeMap<String, Corporation>,
    #[serde(default)]
    pub counters: Counters,
}

impl FederalRegistry {
    /// Issue the next bill id (`B-1`, `B-2`, ...).
    pub fn next_bill_id(&mut self) -> String {
        self.counters.next_bill += 1;
        format!("B-{}", self.counters.next_bill)
    }

    /// Issue the next contest id.
    pub fn next_contest_id(&mut self) -> u64 {
        self.counters.next_contest += 1;
        self.counters.next_contest
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry storage error: {0}")]
    Storage(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting the registry document.
///
/// The core defines WHAT it needs; the infra layer decides HOW (an atomic
/// JSON file with backup rotation in production, a plain map in tests).
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Load the registry. A store with no saved state returns the empty
    /// registry rather than an error.
    async fn load(&self) -> Result<FederalRegistry, RegistryError>;

    /// Persist the registry. Must not leave a partially written state behind
    /// on failure.
    async fn save(&self, registry: &FederalRegistry) -> Result<(), RegistryError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Keeps an in-memory copy of the registry and writes it through the store on
/// every successful mutation.
///
/// All the government services share one of these, so the `RwLock` also
/// serializes writers across features the way a mutex-per-cog did in older
/// bots - but reads stay concurrent.
pub struct RegistryService<S: RegistryStore> {
    store: S,
    cache: RwLock<FederalRegistry>,
}

impl<S: RegistryStore> RegistryService<S> {
    /// Load the registry from the store and wrap it.
    pub async fn new(store: S) -> Result<Self, RegistryError> {
        let registry = store.load().await?;
        Ok(Self {
            store,
            cache: RwLock::new(registry),
        })
    }

    /// Run a read-only closure against the current registry.
    pub async fn read<T>(&self, f: impl FnOnce(&FederalRegistry) -> T) -> T {
        let cache = self.cache.read().await;
        f(&cache)
    }

    /// Apply a mutation and persist it.
    ///
    /// The closure runs against a working copy; if it returns `Err`, or the
    /// save fails, neither the cache nor the disk state changes. The closure's
    /// output is only returned once the new state is durable.
    pub async fn mutate<T, E>(
        &self,
        f: impl FnOnce(&mut FederalRegistry) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RegistryError>,
    {
        let mut cache = self.cache.write().await;
        let mut working = cache.clone();
        let out = f(&mut working)?;
        self.store.save(&working).await?;
        *cache = working;
        Ok(out)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::registry::InMemoryRegistryStore;

    #[tokio::test]
    async fn test_mutate_persists_on_ok() {
        let registry = RegistryService::new(InMemoryRegistryStore::new())
            .await
            .unwrap();

        let id = registry
            .mutate(|reg| Ok::<_, RegistryError>(reg.next_bill_id()))
            .await
            .unwrap();
        assert_eq!(id, "B-1");

        let next = registry.read(|reg| reg.counters.next_bill).await;
        assert_eq!(next, 1);
    }

    #[tokio::test]
    async fn test_mutate_rolls_back_on_err() {
        let registry = RegistryService::new(InMemoryRegistryStore::new())
            .await
            .unwrap();

        let result: Result<(), RegistryError> = registry
            .mutate(|reg| {
                // Mutate first, then fail: nothing may stick.
                reg.next_bill_id();
                Err(RegistryError::Storage("nope".to_string()))
            })
            .await;
        assert!(result.is_err());

        let next = registry.read(|reg| reg.counters.next_bill).await;
        assert_eq!(next, 0);
    }

    #[tokio::test]
    async fn test_bill_ids_are_sequential() {
        let registry = RegistryService::new(InMemoryRegistryStore::new())
            .await
            .unwrap();

        for expected in 1..=3u64 {
            let id = registry
                .mutate(|reg| Ok::<_, RegistryError>(reg.next_bill_id()))
                .await
                .unwrap();
            assert_eq!(id, format!("B-{}", expected));
        }
    }
}
