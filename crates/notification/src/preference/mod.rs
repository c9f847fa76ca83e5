//! Per-customer channel preferences behind an injected repository.
//!
//! Writes are optimistic: a write names the version it read and fails with
//! [`PreferenceError::VersionConflict`] if another writer got there first.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub use self::memory::InMemoryPreferenceRepository;
use crate::channel::{Channel, ChannelSet};

const CONFLICT_RETRIES: usize = 8;

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Immediate,
    Daily,
    Weekly,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPreferences {
    pub customer_id: String,
    pub channels: ChannelSet,
    pub language: String,
    pub frequency: Frequency,
    pub opt_out: bool,
    /// Zero until first stored; incremented by every successful write.
    pub version: u64,
}

impl CustomerPreferences {
    /// Preferences of a customer who never set any.
    #[must_use]
    pub fn defaults(customer_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            channels: ChannelSet::ALL,
            language: language.into(),
            frequency: Frequency::Immediate,
            opt_out: false,
            version: 0,
        }
    }

    #[must_use]
    pub const fn accepts(&self, channel: Channel) -> bool {
        !self.opt_out && self.channels.contains(channel)
    }
}

/// Partial update merged into stored preferences. Absent fields are kept.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<ChannelSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt_out: Option<bool>,
}

impl PreferencesUpdate {
    fn apply(&self, preferences: &mut CustomerPreferences) {
        if let Some(channels) = self.channels {
            preferences.channels = channels;
        }
        if let Some(language) = &self.language {
            preferences.language.clone_from(language);
        }
        if let Some(frequency) = self.frequency {
            preferences.frequency = frequency;
        }
        if let Some(opt_out) = self.opt_out {
            preferences.opt_out = opt_out;
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PreferenceError {
    #[snafu(display(
        "Preferences of `{customer_id}` changed concurrently: expected version {expected}, found {actual}"
    ))]
    VersionConflict { customer_id: String, expected: u64, actual: u64 },

    #[snafu(display("Preference backend failed: {message}"))]
    Backend { message: String },
}

/// Storage for [`CustomerPreferences`].
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    async fn get(&self, customer_id: &str) -> Result<Option<CustomerPreferences>, PreferenceError>;

    /// Store `preferences` if the stored version equals `expected_version`
    /// (zero for absent). Returns the stored value with its new version.
    async fn set(
        &self,
        preferences: CustomerPreferences,
        expected_version: u64,
    ) -> Result<CustomerPreferences, PreferenceError>;

    /// Returns whether anything was removed.
    async fn delete(&self, customer_id: &str) -> Result<bool, PreferenceError>;
}

/// Preference access with defaults and conflict-retrying updates.
pub struct PreferenceStore {
    repository: Box<dyn PreferenceRepository>,
    default_language: String,
}

impl Default for PreferenceStore {
    fn default() -> Self { Self::new(InMemoryPreferenceRepository::new(), "tr") }
}

impl PreferenceStore {
    #[must_use]
    pub fn new<R>(repository: R, default_language: impl Into<String>) -> Self
    where
        R: PreferenceRepository + 'static,
    {
        Self { repository: Box::new(repository), default_language: default_language.into() }
    }

    #[must_use]
    pub fn default_language(&self) -> &str { &self.default_language }

    /// Stored preferences, or the defaults when none exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn get(&self, customer_id: &str) -> Result<CustomerPreferences, PreferenceError> {
        Ok(self
            .repository
            .get(customer_id)
            .await?
            .unwrap_or_else(|| CustomerPreferences::defaults(customer_id, self.default_language.as_str())))
    }

    /// Merge `update` into the current preferences, retrying on concurrent
    /// writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails or conflicts persist.
    pub async fn update(
        &self,
        customer_id: &str,
        update: &PreferencesUpdate,
    ) -> Result<CustomerPreferences, PreferenceError> {
        let mut attempt = 0;
        loop {
            let mut preferences = self.get(customer_id).await?;
            let expected = preferences.version;
            update.apply(&mut preferences);

            match self.repository.set(preferences, expected).await {
                Err(PreferenceError::VersionConflict { .. }) if attempt < CONFLICT_RETRIES => {
                    tracing::debug!(customer_id, attempt, "Preference write conflicted, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Replace preferences wholesale, guarded by `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`PreferenceError::VersionConflict`] if the stored version
    /// differs.
    pub async fn set(
        &self,
        preferences: CustomerPreferences,
        expected_version: u64,
    ) -> Result<CustomerPreferences, PreferenceError> {
        self.repository.set(preferences, expected_version).await
    }

    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn opt_out(&self, customer_id: &str) -> Result<CustomerPreferences, PreferenceError> {
        tracing::info!(customer_id, "Customer opted out");
        self.update(customer_id, &PreferencesUpdate { opt_out: Some(true), ..PreferencesUpdate::default() })
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn opt_in(&self, customer_id: &str) -> Result<CustomerPreferences, PreferenceError> {
        tracing::info!(customer_id, "Customer opted in");
        self.update(customer_id, &PreferencesUpdate { opt_out: Some(false), ..PreferencesUpdate::default() })
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn delete(&self, customer_id: &str) -> Result<bool, PreferenceError> {
        self.repository.delete(customer_id).await
    }
}
