use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CustomerPreferences, PreferenceError, PreferenceRepository};

/// Process-lifetime repository. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPreferenceRepository {
    entries: Arc<RwLock<HashMap<String, CustomerPreferences>>>,
}

impl InMemoryPreferenceRepository {
    #[must_use]
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl PreferenceRepository for InMemoryPreferenceRepository {
    async fn get(&self, customer_id: &str) -> Result<Option<CustomerPreferences>, PreferenceError> {
        Ok(self.entries.read().await.get(customer_id).cloned())
    }

    async fn set(
        &self,
        mut preferences: CustomerPreferences,
        expected_version: u64,
    ) -> Result<CustomerPreferences, PreferenceError> {
        let mut entries = self.entries.write().await;
        let actual = entries.get(&preferences.customer_id).map_or(0, |stored| stored.version);
        if actual != expected_version {
            return Err(PreferenceError::VersionConflict {
                customer_id: preferences.customer_id,
                expected: expected_version,
                actual,
            });
        }

        preferences.version = actual + 1;
        drop(entries.insert(preferences.customer_id.clone(), preferences.clone()));
        Ok(preferences)
    }

    async fn delete(&self, customer_id: &str) -> Result<bool, PreferenceError> {
        Ok(self.entries.write().await.remove(customer_id).is_some())
    }
}
