// JSON file store for the federal registry.
//
// The registry is the one file everyone's roleplay state lives in, so this
// store is paranoid about it:
//   - writes go to a temp file and rename over the target, never in place
//   - each save rotates the previous good copy into registry.json.bak1..N
//   - a load that fails to parse quarantines the bad file and walks the
//     backups newest-first before giving up and starting empty

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::registry::{FederalRegistry, RegistryError, RegistryStore};

/// How many backup generations to keep.
const BACKUP_DEPTH: usize = 3;

pub struct JsonRegistryStore {
    path: PathBuf,
    backup_depth: usize,
}

impl JsonRegistryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            backup_depth: BACKUP_DEPTH,
        }
    }

    fn backup_path(&self, generation: usize) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(format!(".bak{}", generation));
        PathBuf::from(os)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".tmp");
        PathBuf::from(os)
    }

    async fn try_parse(path: &Path) -> Option<FederalRegistry> {
        let text = fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&text) {
            Ok(registry) => Some(registry),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "Registry file failed to parse");
                None
            }
        }
    }

    /// Move the unparseable file aside so the next save doesn't bury the
    /// evidence. Best effort; losing the rename is not fatal.
    async fn quarantine(&self) {
        let mut os = self.path.clone().into_os_string();
        os.push(format!(".corrupt-{}", chrono::Utc::now().timestamp()));
        let target = PathBuf::from(os);
        match fs::rename(&self.path, &target).await {
            Ok(()) => {
                tracing::warn!(quarantined = %target.display(), "Quarantined corrupt registry file")
            }
            Err(err) => tracing::warn!(%err, "Failed to quarantine corrupt registry file"),
        }
    }

    /// Shift bak1 -> bak2 -> ... and copy the current file into bak1.
    async fn rotate_backups(&self) {
        for generation in (1..self.backup_depth).rev() {
            let from = self.backup_path(generation);
            if fs::try_exists(&from).await.unwrap_or(false) {
                let _ = fs::rename(&from, self.backup_path(generation + 1)).await;
            }
        }
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            if let Err(err) = fs::copy(&self.path, self.backup_path(1)).await {
                tracing::warn!(%err, "Failed to write registry backup");
            }
        }
    }
}

#[async_trait]
impl RegistryStore for JsonRegistryStore {
    async fn load(&self) -> Result<FederalRegistry, RegistryError> {
        if !fs::try_exists(&self.path)
            .await
            .map_err(|e| RegistryError::Storage(e.to_string()))?
        {
            tracing::info!(path = %self.path.display(), "No registry file; starting empty");
            return Ok(FederalRegistry::default());
        }

        if let Some(registry) = Self::try_parse(&self.path).await {
            return Ok(registry);
        }

        // Corrupt main file: quarantine it, then walk backups newest-first.
        self.quarantine().await;
        for generation in 1..=self.backup_depth {
            let backup = self.backup_path(generation);
            if let Some(registry) = Self::try_parse(&backup).await {
                tracing::warn!(
                    backup = %backup.display(),
                    "Recovered registry from backup"
                );
                return Ok(registry);
            }
        }

        tracing::error!("Registry and all backups unreadable; starting empty");
        Ok(FederalRegistry::default())
    }

    async fn save(&self, registry: &FederalRegistry) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| RegistryError::Storage(e.to_string()))?;
            }
        }

        let text = serde_json::to_string_pretty(registry)
            .map_err(|e| RegistryError::Storage(e.to_string()))?;

        self.rotate_backups().await;

        // Write-then-rename so a crash mid-write can't truncate the registry.
        let tmp = self.tmp_path();
        fs::write(&tmp, text)
            .await
            .map_err(|e| RegistryError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RegistryError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn registry_with_bills(n: u64) -> FederalRegistry {
        let mut registry = FederalRegistry::default();
        for _ in 0..n {
            registry.next_bill_id();
        }
        registry
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path().join("registry.json"));
        let registry = store.load().await.unwrap();
        assert_eq!(registry.counters.next_bill, 0);
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path().join("registry.json"));

        store.save(&registry_with_bills(4)).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.counters.next_bill, 4);
    }

    #[tokio::test]
    async fn test_backup_rotation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let store = JsonRegistryStore::new(&path);

        for n in 1..=5 {
            store.save(&registry_with_bills(n)).await.unwrap();
        }

        // bak1 holds the previous save, bak2 the one before, etc.
        for (generation, expected) in [(1usize, 4u64), (2, 3), (3, 2)] {
            let text = std::fs::read_to_string(store.backup_path(generation)).unwrap();
            let backup: FederalRegistry = serde_json::from_str(&text).unwrap();
            assert_eq!(backup.counters.next_bill, expected);
        }
        // Depth is bounded.
        assert!(!store.backup_path(4).exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_recovers_from_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let store = JsonRegistryStore::new(&path);

        store.save(&registry_with_bills(2)).await.unwrap();
        store.save(&registry_with_bills(7)).await.unwrap();

        // Smash the main file. bak1 holds the 2-bill generation.
        std::fs::write(&path, "{ definitely not json").unwrap();

        let recovered = store.load().await.unwrap();
        assert_eq!(recovered.counters.next_bill, 2);

        // The corrupt file was moved aside, not overwritten in place.
        assert!(!path.exists());
        let quarantined = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().contains(".corrupt-"));
        assert!(quarantined);
    }

    #[tokio::test]
    async fn test_no_parseable_state_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let store = JsonRegistryStore::new(&path);

        std::fs::write(&path, "garbage").unwrap();
        let registry = store.load().await.unwrap();
        assert_eq!(registry.counters.next_bill, 0);
    }

    #[tokio::test]
    async fn test_no_tmp_file_left_behind() {
        let dir = tempdir().unwrap();
        let store = JsonRegistryStore::new(dir.path().join("registry.json"));
        store.save(&registry_with_bills(1)).await.unwrap();
        assert!(!store.tmp_path().exists());
    }
}
