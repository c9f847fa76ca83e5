use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use super::Channel;
use crate::{
    dispatch::{mask_destination, DispatchLog, DispatchRecord},
    provider::{
        EmailMessage, Message, ProviderError, Quota, Receipt, SharedProvider, SmsMessage,
        WhatsAppMessage,
    },
    retry::{with_timeout, Classify},
    template::Variables,
};

pub type EmailService = ChannelService<EmailMessage>;
pub type SmsService = ChannelService<SmsMessage>;
pub type WhatsAppService = ChannelService<WhatsAppMessage>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A message accepted by one provider.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatched {
    pub provider: String,
    pub receipt: Receipt,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<Quota>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    pub providers: Vec<ProviderStatus>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProviderCheck {
    pub channel: Channel,
    pub provider: String,
    pub available: bool,
    pub verified: bool,
}

/// Dispatches messages of one channel through its providers, in priority
/// order. Unavailable providers are never selected.
pub struct ChannelService<M: Message> {
    providers: Vec<SharedProvider<M>>,
    log: DispatchLog,
    timeout: Duration,
}

impl<M: Message> ChannelService<M> {
    /// `providers` are in priority order, highest first.
    #[must_use]
    pub fn new(providers: Vec<SharedProvider<M>>, log: DispatchLog) -> Self {
        Self { providers, log, timeout: DEFAULT_TIMEOUT }
    }

    /// Bound every provider call by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn channel(&self) -> Channel { M::CHANNEL }

    #[must_use]
    pub fn providers(&self) -> &[SharedProvider<M>] { &self.providers }

    /// First available provider of the priority list.
    #[must_use]
    pub fn default_provider(&self) -> Option<&SharedProvider<M>> {
        self.providers.iter().find(|provider| provider.is_available())
    }

    /// Available providers in fallback order. Providers local to the
    /// destination's country come first, the rest keep priority order.
    #[must_use]
    pub fn fallback_order(&self, destination: &str) -> Vec<&SharedProvider<M>> {
        let number = destination.trim_start_matches('+');
        let (mut local, remote): (Vec<_>, Vec<_>) = self
            .providers
            .iter()
            .filter(|provider| provider.is_available())
            .partition(|provider| {
                provider.home_country_code().is_some_and(|code| number.starts_with(code))
            });
        local.extend(remote);
        local
    }

    /// Render `message` and send it through the default provider only.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, or [`ProviderError::NoProvider`] when no
    /// provider is available.
    pub async fn send(&self, message: &M, variables: &Variables) -> Result<Dispatched, ProviderError> {
        let message = message.render(variables);
        let provider = self.default_provider().ok_or(ProviderError::NoProvider { channel: M::CHANNEL })?;
        self.attempt(provider, &message).await
    }

    /// Render `message` and try available providers in fallback order until
    /// one accepts it.
    ///
    /// # Errors
    ///
    /// Returns the last provider's error if every provider fails, or
    /// [`ProviderError::NoProvider`] when none is available.
    pub async fn send_with_fallback(
        &self,
        message: &M,
        variables: &Variables,
    ) -> Result<Dispatched, ProviderError> {
        let message = message.render(variables);
        let mut last_error = ProviderError::NoProvider { channel: M::CHANNEL };
        for provider in self.fallback_order(message.destination()) {
            match self.attempt(provider, &message).await {
                Ok(dispatched) => return Ok(dispatched),
                Err(err) => last_error = err,
            }
        }
        Err(last_error)
    }

    async fn attempt(&self, provider: &SharedProvider<M>, message: &M) -> Result<Dispatched, ProviderError> {
        let started = Instant::now();
        let result = with_timeout(provider.send(message), self.timeout)
            .await
            .unwrap_or_else(|_elapsed| {
                Err(ProviderError::Timeout {
                    provider: provider.name().to_string(),
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            });
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let destination = mask_destination(message.destination());

        match &result {
            Ok(receipt) => tracing::debug!(
                channel = %M::CHANNEL,
                provider = provider.name(),
                destination = %destination,
                message_id = %receipt.message_id,
                elapsed_ms,
                "Message accepted"
            ),
            Err(err) => tracing::warn!(
                channel = %M::CHANNEL,
                provider = provider.name(),
                destination = %destination,
                class = %err.class(),
                elapsed_ms,
                "Provider failed: {err}"
            ),
        }

        self.log.record(DispatchRecord {
            id: Uuid::new_v4(),
            channel: M::CHANNEL,
            provider: provider.name().to_string(),
            destination,
            success: result.is_ok(),
            message_id: result.as_ref().ok().map(|receipt| receipt.message_id.clone()),
            error: result.as_ref().err().map(ToString::to_string),
            error_class: result.as_ref().err().map(Classify::class),
            elapsed_ms,
            recorded_at: Utc::now(),
        });

        result.map(|receipt| Dispatched { provider: provider.name().to_string(), receipt })
    }

    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        ChannelStatus {
            channel: M::CHANNEL,
            default_provider: self.default_provider().map(|provider| provider.name().to_string()),
            providers: self
                .providers
                .iter()
                .map(|provider| ProviderStatus {
                    name: provider.name().to_string(),
                    available: provider.is_available(),
                    home_country_code: provider.home_country_code().map(ToString::to_string),
                    quota: provider.quota(),
                })
                .collect(),
        }
    }

    /// Verify every provider, in priority order.
    pub async fn verify_all(&self) -> Vec<ProviderCheck> {
        let mut checks = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let verified = provider.verify_connection().await;
            tracing::info!(channel = %M::CHANNEL, provider = provider.name(), verified, "Verified provider");
            checks.push(ProviderCheck {
                channel: M::CHANNEL,
                provider: provider.name().to_string(),
                available: provider.is_available(),
                verified,
            });
        }
        checks
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::provider::Provider;

    struct Scripted {
        name: &'static str,
        available: bool,
        fail: bool,
        home: Option<&'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str) -> Self {
            Self { name, available: true, fail: false, home: None, delay: Duration::ZERO, calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
    }

    #[async_trait]
    impl Provider<SmsMessage> for Scripted {
        fn name(&self) -> &str { self.name }

        fn is_available(&self) -> bool { self.available }

        async fn send(&self, _message: &SmsMessage) -> Result<Receipt, ProviderError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(ProviderError::Transport { provider: self.name.to_string(), reason: "down".to_string() })
            } else {
                Ok(Receipt::new(format!("{}-id", self.name)))
            }
        }

        async fn verify_connection(&self) -> bool { self.available }

        fn home_country_code(&self) -> Option<&str> { self.home }
    }

    fn service(providers: &[Arc<Scripted>]) -> SmsService {
        let providers = providers
            .iter()
            .map(|p| {
                let provider: SharedProvider<SmsMessage> = Arc::<Scripted>::clone(p);
                provider
            })
            .collect();
        SmsService::new(providers, DispatchLog::new(16))
    }

    fn message(to: &str) -> SmsMessage { SmsMessage { to: to.to_string(), body: "Kod: {otp}".to_string() } }

    #[tokio::test]
    async fn test_fallback_stops_at_first_success() {
        let a = Arc::new(Scripted { fail: true, ..Scripted::new("a") });
        let b = Arc::new(Scripted::new("b"));
        let c = Arc::new(Scripted::new("c"));
        let service = service(&[Arc::clone(&a), Arc::clone(&b), Arc::clone(&c)]);

        let dispatched = service.send_with_fallback(&message("+447700900123"), &Variables::new()).await.unwrap();

        assert_eq!(dispatched.provider, "b");
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 0));
        assert_eq!(service.log.len(), 2);
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let a = Arc::new(Scripted { fail: true, ..Scripted::new("a") });
        let b = Arc::new(Scripted { fail: true, ..Scripted::new("b") });
        let service = service(&[a, b]);

        let err = service.send_with_fallback(&message("+447700900123"), &Variables::new()).await.unwrap_err();

        assert_eq!(err.provider(), Some("b"));
    }

    #[tokio::test]
    async fn test_no_available_provider_fails_without_attempt() {
        let a = Arc::new(Scripted { available: false, ..Scripted::new("a") });
        let service = service(&[Arc::clone(&a)]);

        let err = service.send(&message("+905551112233"), &Variables::new()).await.unwrap_err();

        assert_eq!(err, ProviderError::NoProvider { channel: Channel::Sms });
        assert_eq!(a.calls(), 0);
        assert!(service.log.is_empty());
    }

    #[tokio::test]
    async fn test_send_uses_default_provider_only() {
        let a = Arc::new(Scripted { available: false, ..Scripted::new("a") });
        let b = Arc::new(Scripted { fail: true, ..Scripted::new("b") });
        let c = Arc::new(Scripted::new("c"));
        let service = service(&[a, Arc::clone(&b), Arc::clone(&c)]);

        assert!(service.send(&message("+905551112233"), &Variables::new()).await.is_err());
        assert_eq!((b.calls(), c.calls()), (1, 0));
    }

    #[test]
    fn test_local_gateways_come_first() {
        let twilio = Arc::new(Scripted::new("twilio"));
        let netgsm = Arc::new(Scripted { home: Some("90"), ..Scripted::new("netgsm") });
        let foreign = Arc::new(Scripted { home: Some("44"), ..Scripted::new("foreign") });
        let service = service(&[twilio, netgsm, foreign]);

        let names = |to: &str| -> Vec<String> {
            service.fallback_order(to).iter().map(|p| p.name().to_string()).collect()
        };
        assert_eq!(names("+905551112233"), vec!["netgsm", "twilio", "foreign"]);
        assert_eq!(names("+447700900123"), vec!["foreign", "twilio", "netgsm"]);
        assert_eq!(names("+15005550006"), vec!["twilio", "netgsm", "foreign"]);
    }

    #[tokio::test]
    async fn test_message_is_rendered_before_dispatch() {
        struct Capture(std::sync::Mutex<Option<String>>);

        #[async_trait]
        impl Provider<SmsMessage> for Capture {
            fn name(&self) -> &str { "capture" }

            fn is_available(&self) -> bool { true }

            async fn send(&self, message: &SmsMessage) -> Result<Receipt, ProviderError> {
                if let Ok(mut body) = self.0.lock() {
                    *body = Some(message.body.clone());
                }
                Ok(Receipt::new("id"))
            }

            async fn verify_connection(&self) -> bool { true }
        }

        let capture = Arc::new(Capture(std::sync::Mutex::new(None)));
        let provider: SharedProvider<SmsMessage> = Arc::<Capture>::clone(&capture);
        let service = SmsService::new(vec![provider], DispatchLog::new(1));
        let variables = Variables::from([("otp".to_string(), "4321".to_string())]);

        let _dispatched = service.send(&message("+905551112233"), &variables).await.unwrap();

        assert_eq!(capture.0.lock().unwrap().as_deref(), Some("Kod: 4321"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_and_falls_back() {
        let slow = Arc::new(Scripted { delay: Duration::from_secs(60), ..Scripted::new("slow") });
        let fast = Arc::new(Scripted::new("fast"));
        let service = service(&[slow, fast]).with_timeout(Duration::from_secs(1));

        let dispatched = service.send_with_fallback(&message("+905551112233"), &Variables::new()).await.unwrap();

        assert_eq!(dispatched.provider, "fast");
        let records = service.log.recent(2);
        assert_eq!(records[1].error_class, Some(crate::retry::ErrorClass::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_status_and_verification() {
        let a = Arc::new(Scripted { available: false, ..Scripted::new("a") });
        let b = Arc::new(Scripted { home: Some("90"), ..Scripted::new("b") });
        let service = service(&[a, b]);

        let status = service.status();
        assert_eq!(status.default_provider.as_deref(), Some("b"));
        assert_eq!(status.providers[1].home_country_code.as_deref(), Some("90"));

        let checks = service.verify_all().await;
        assert_eq!(checks.iter().map(|check| check.verified).collect::<Vec<_>>(), vec![false, true]);
    }
}
