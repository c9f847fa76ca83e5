use serde::{Deserialize, Serialize};

use super::NotificationService;
use crate::channel::{ChannelStatus, ProviderCheck};

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    /// Every channel has an available provider.
    pub healthy: bool,
    pub channels: Vec<ChannelStatus>,
    /// Dispatch records currently held.
    pub dispatches: usize,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceVerification {
    /// Every channel has at least one provider that verified.
    pub all_channels_verified: bool,
    pub checks: Vec<ProviderCheck>,
}

impl NotificationService {
    #[must_use]
    pub fn service_status(&self) -> ServiceStatus {
        let channels = vec![self.whatsapp.status(), self.sms.status(), self.email.status()];
        let healthy = channels.iter().all(|channel| channel.default_provider.is_some());
        ServiceStatus { healthy, channels, dispatches: self.log.len() }
    }

    /// Verify every provider of every channel.
    pub async fn verify_all_services(&self) -> ServiceVerification {
        let mut checks = self.whatsapp.verify_all().await;
        checks.extend(self.sms.verify_all().await);
        checks.extend(self.email.verify_all().await);

        let all_channels_verified = [self.whatsapp.channel(), self.sms.channel(), self.email.channel()]
            .into_iter()
            .all(|channel| checks.iter().any(|check| check.channel == channel && check.verified));
        ServiceVerification { all_channels_verified, checks }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{channel::Channel, orchestrator::NotificationService, provider::MockProvider};

    #[tokio::test]
    async fn test_status_without_email_provider() {
        let mock = Arc::new(MockProvider::default());
        let service =
            NotificationService::builder().sms_provider(mock.clone()).whatsapp_provider(mock).build();

        let status = service.service_status();
        assert!(!status.healthy);
        assert_eq!(status.channels.len(), 3);
        assert_eq!(status.channels[2].channel, Channel::Email);
        assert!(status.channels[2].default_provider.is_none());

        let verification = service.verify_all_services().await;
        assert!(!verification.all_channels_verified);
        assert_eq!(verification.checks.len(), 2);
    }
}
