use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    message::validate_phone, sms_segments, Message, Provider, ProviderError, Quota, QuotaTracker,
    Receipt,
};
use crate::channel::Channel;

const NAME: &str = "mock";

/// Failure a mock provider reports on every send.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MockFailure {
    Transport,
    Timeout,
    QuotaExceeded,
    Rejected,
}

impl MockFailure {
    fn error(self) -> ProviderError {
        let provider = NAME.to_string();
        match self {
            Self::Transport => {
                ProviderError::Transport { provider, reason: "simulated outage".to_string() }
            }
            Self::Timeout => ProviderError::Timeout { provider, timeout_ms: 0 },
            Self::QuotaExceeded => ProviderError::QuotaExceeded { provider },
            Self::Rejected => {
                ProviderError::Rejected { provider, reason: "simulated rejection".to_string() }
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MockConfig {
    #[serde(default = "MockConfig::default_latency_ms")]
    pub latency_ms: u64,

    #[serde(default)]
    pub jitter_ms: u64,

    #[serde(default = "MockConfig::default_monthly_quota")]
    pub monthly_quota: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<MockFailure>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency_ms: Self::default_latency_ms(),
            jitter_ms: 0,
            monthly_quota: Self::default_monthly_quota(),
            failure: None,
        }
    }
}

impl MockConfig {
    #[inline]
    #[must_use]
    pub const fn default_latency_ms() -> u64 { 50 }

    #[inline]
    #[must_use]
    pub const fn default_monthly_quota() -> u64 { 10_000 }
}

/// Always-available provider for every channel.
///
/// Message ids look like `mock_<channel>_<uuid>`.
#[derive(Debug)]
pub struct MockProvider {
    config: MockConfig,
    quota: QuotaTracker,
}

impl Default for MockProvider {
    fn default() -> Self { Self::new(MockConfig { latency_ms: 0, ..MockConfig::default() }) }
}

impl MockProvider {
    #[must_use]
    pub fn new(config: MockConfig) -> Self {
        let quota = QuotaTracker::new(config.monthly_quota);
        Self { config, quota }
    }

    fn latency(&self) -> Duration {
        let jitter = if self.config.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.config.jitter_ms)
        };
        Duration::from_millis(self.config.latency_ms.saturating_add(jitter))
    }
}

#[async_trait]
impl<M: Message> Provider<M> for MockProvider {
    fn name(&self) -> &str { NAME }

    fn is_available(&self) -> bool { true }

    async fn send(&self, message: &M) -> Result<Receipt, ProviderError> {
        if M::CHANNEL != Channel::Email {
            validate_phone(NAME, message.destination())?;
        }
        tokio::time::sleep(self.latency()).await;

        if let Some(failure) = self.config.failure {
            return Err(failure.error());
        }

        if M::CHANNEL == Channel::Sms {
            self.quota.record(sms_segments(message.body()));
        }
        let message_id = format!("mock_{}_{}", M::CHANNEL, Uuid::new_v4());
        tracing::debug!(channel = %M::CHANNEL, message_id = %message_id, "Mock delivery");
        Ok(Receipt::new(message_id))
    }

    async fn verify_connection(&self) -> bool { true }

    fn quota(&self) -> Option<Quota> {
        (M::CHANNEL == Channel::Sms).then(|| self.quota.snapshot())
    }
}
