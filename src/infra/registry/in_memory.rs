// In-memory registry store. Used by the service tests; also handy for
// running the bot without persistence during development.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::core::registry::{FederalRegistry, RegistryError, RegistryStore};

#[derive(Default)]
pub struct InMemoryRegistryStore {
    data: Mutex<FederalRegistry>,
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn load(&self) -> Result<FederalRegistry, RegistryError> {
        let data = self
            .data
            .lock()
            .map_err(|_| RegistryError::Storage("poisoned lock".to_string()))?;
        Ok(data.clone())
    }

    async fn save(&self, registry: &FederalRegistry) -> Result<(), RegistryError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| RegistryError::Storage("poisoned lock".to_string()))?;
        *data = registry.clone();
        Ok(())
    }
}
