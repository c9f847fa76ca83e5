//! Serializable engine configuration and [`NotificationService::from_config`].

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    error::{self, Error},
    orchestrator::NotificationService,
    preference::{InMemoryPreferenceRepository, PreferenceStore},
    provider::{
        gmail::{self, GmailProvider},
        iletimerkezi::{self, IletiMerkeziProvider},
        netgsm::{self, NetGsmProvider},
        sendgrid::{self, SendGridProvider},
        smtp::{self, SmtpProvider},
        twilio::{self, TwilioProvider},
        whatsapp_business::{self, WhatsAppBusinessProvider},
        EmailMessage, MockConfig, MockProvider, SharedProvider, SmsMessage, WhatsAppMessage,
    },
    retry::RetryOptions,
    template::Template,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NotificationConfig {
    #[serde(default = "NotificationConfig::default_language")]
    pub default_language: String,

    #[serde(default = "NotificationConfig::default_dispatch_log_capacity")]
    pub dispatch_log_capacity: usize,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub sms: SmsConfig,

    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Added to the built-in catalog, replacing entries with the same id.
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl NotificationConfig {
    #[inline]
    #[must_use]
    pub fn default_language() -> String { "tr".to_string() }

    #[inline]
    #[must_use]
    pub const fn default_dispatch_log_capacity() -> usize { 1000 }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_language: Self::default_language(),
            dispatch_log_capacity: Self::default_dispatch_log_capacity(),
            retry: RetryConfig::default(),
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            templates: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "RetryConfig::default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "RetryConfig::default_backoff_factor")]
    pub backoff_factor: f64,

    #[serde(default = "RetryConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Bound on a single provider call.
    #[serde(default = "RetryConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RetryConfig {
    #[inline]
    #[must_use]
    pub const fn default_max_retries() -> u32 { 3 }

    #[inline]
    #[must_use]
    pub const fn default_base_delay_ms() -> u64 { 1000 }

    #[inline]
    #[must_use]
    pub const fn default_backoff_factor() -> f64 { 2.0 }

    #[inline]
    #[must_use]
    pub const fn default_max_delay_ms() -> u64 { 10_000 }

    #[inline]
    #[must_use]
    pub const fn default_timeout_ms() -> u64 { 30_000 }

    /// # Errors
    ///
    /// Returns an error if the factor is below one or not finite, or the
    /// timeout is zero.
    pub fn options(&self, language: &str) -> Result<RetryOptions, Error> {
        ensure!(
            self.backoff_factor.is_finite() && self.backoff_factor >= 1.0,
            error::InvalidRetryPolicySnafu {
                reason: format!("backoff_factor must be at least 1, got {}", self.backoff_factor)
            }
        );
        ensure!(
            self.timeout_ms > 0,
            error::InvalidRetryPolicySnafu { reason: "timeout_ms must be positive".to_string() }
        );

        Ok(RetryOptions {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
            language: language.to_string(),
        })
    }

    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            base_delay_ms: Self::default_base_delay_ms(),
            backoff_factor: Self::default_backoff_factor(),
            max_delay_ms: Self::default_max_delay_ms(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailProviderKind {
    Smtp,
    Sendgrid,
    Gmail,
    Mock,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SmsProviderKind {
    Netgsm,
    Iletimerkezi,
    Twilio,
    Mock,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhatsAppProviderKind {
    WhatsappBusiness,
    Mock,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EmailConfig {
    /// Providers in fallback order. Duplicates are ignored.
    #[serde(default = "EmailConfig::default_priority")]
    pub priority: Vec<EmailProviderKind>,

    #[serde(default)]
    pub smtp: smtp::Config,

    #[serde(default)]
    pub sendgrid: sendgrid::Config,

    #[serde(default)]
    pub gmail: gmail::Config,

    #[serde(default)]
    pub mock: MockConfig,
}

impl EmailConfig {
    #[inline]
    #[must_use]
    pub fn default_priority() -> Vec<EmailProviderKind> {
        vec![
            EmailProviderKind::Smtp,
            EmailProviderKind::Sendgrid,
            EmailProviderKind::Gmail,
            EmailProviderKind::Mock,
        ]
    }

    fn providers(&self) -> Result<Vec<SharedProvider<EmailMessage>>, Error> {
        let mut providers: Vec<SharedProvider<EmailMessage>> = Vec::new();
        for kind in dedup(&self.priority) {
            let provider: SharedProvider<EmailMessage> = match kind {
                EmailProviderKind::Smtp => Arc::new(SmtpProvider::new(self.smtp.clone())?),
                EmailProviderKind::Sendgrid => Arc::new(SendGridProvider::new(self.sendgrid.clone())?),
                EmailProviderKind::Gmail => Arc::new(GmailProvider::new(self.gmail.clone())?),
                EmailProviderKind::Mock => Arc::new(MockProvider::new(self.mock.clone())),
            };
            providers.push(provider);
        }
        Ok(providers)
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            priority: Self::default_priority(),
            smtp: smtp::Config::default(),
            sendgrid: sendgrid::Config::default(),
            gmail: gmail::Config::default(),
            mock: MockConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SmsConfig {
    /// Providers in fallback order. Those local to the destination still
    /// come first.
    #[serde(default = "SmsConfig::default_priority")]
    pub priority: Vec<SmsProviderKind>,

    #[serde(default)]
    pub netgsm: netgsm::Config,

    #[serde(default)]
    pub iletimerkezi: iletimerkezi::Config,

    #[serde(default)]
    pub twilio: twilio::Config,

    #[serde(default)]
    pub mock: MockConfig,
}

impl SmsConfig {
    #[inline]
    #[must_use]
    pub fn default_priority() -> Vec<SmsProviderKind> {
        vec![
            SmsProviderKind::Netgsm,
            SmsProviderKind::Iletimerkezi,
            SmsProviderKind::Twilio,
            SmsProviderKind::Mock,
        ]
    }

    fn providers(&self) -> Vec<SharedProvider<SmsMessage>> {
        dedup(&self.priority)
            .into_iter()
            .map(|kind| -> SharedProvider<SmsMessage> {
                match kind {
                    SmsProviderKind::Netgsm => Arc::new(NetGsmProvider::new(self.netgsm.clone())),
                    SmsProviderKind::Iletimerkezi => {
                        Arc::new(IletiMerkeziProvider::new(self.iletimerkezi.clone()))
                    }
                    SmsProviderKind::Twilio => Arc::new(TwilioProvider::new(self.twilio.clone())),
                    SmsProviderKind::Mock => Arc::new(MockProvider::new(self.mock.clone())),
                }
            })
            .collect()
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            priority: Self::default_priority(),
            netgsm: netgsm::Config::default(),
            iletimerkezi: iletimerkezi::Config::default(),
            twilio: twilio::Config::default(),
            mock: MockConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WhatsAppConfig {
    #[serde(default = "WhatsAppConfig::default_priority")]
    pub priority: Vec<WhatsAppProviderKind>,

    #[serde(default)]
    pub whatsapp_business: whatsapp_business::Config,

    #[serde(default)]
    pub mock: MockConfig,
}

impl WhatsAppConfig {
    #[inline]
    #[must_use]
    pub fn default_priority() -> Vec<WhatsAppProviderKind> {
        vec![WhatsAppProviderKind::WhatsappBusiness, WhatsAppProviderKind::Mock]
    }

    fn providers(&self) -> Vec<SharedProvider<WhatsAppMessage>> {
        dedup(&self.priority)
            .into_iter()
            .map(|kind| -> SharedProvider<WhatsAppMessage> {
                match kind {
                    WhatsAppProviderKind::WhatsappBusiness => {
                        Arc::new(WhatsAppBusinessProvider::new(self.whatsapp_business.clone()))
                    }
                    WhatsAppProviderKind::Mock => Arc::new(MockProvider::new(self.mock.clone())),
                }
            })
            .collect()
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            priority: Self::default_priority(),
            whatsapp_business: whatsapp_business::Config::default(),
            mock: MockConfig::default(),
        }
    }
}

/// First occurrence of each kind, in order.
fn dedup<K: Copy + PartialEq>(kinds: &[K]) -> Vec<K> {
    let mut unique = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !unique.contains(kind) {
            unique.push(*kind);
        }
    }
    unique
}

impl NotificationService {
    /// Build the engine with an in-memory preference store.
    ///
    /// # Errors
    ///
    /// Returns an error if a sender address, the retry policy or a template id
    /// is invalid.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, Error> {
        let retry = config.retry.options(&config.default_language)?;
        let mut builder = Self::builder()
            .retry(retry)
            .provider_timeout(config.retry.timeout())
            .dispatch_log_capacity(config.dispatch_log_capacity)
            .preferences(PreferenceStore::new(
                InMemoryPreferenceRepository::new(),
                config.default_language.as_str(),
            ));

        for template in &config.templates {
            ensure!(
                template.id.ends_with(&format!("_{}", template.locale)),
                error::InvalidTemplateIdSnafu {
                    template_id: template.id.clone(),
                    locale: template.locale.clone()
                }
            );
            builder = builder.register_template(template.clone());
        }
        for provider in config.email.providers()? {
            builder = builder.email_provider(provider);
        }
        for provider in config.sms.providers() {
            builder = builder.sms_provider(provider);
        }
        for provider in config.whatsapp.providers() {
            builder = builder.whatsapp_provider(provider);
        }

        let service = builder.build();
        tracing::info!(
            templates = service.templates().len(),
            email_providers = service.email().providers().len(),
            sms_providers = service.sms().providers().len(),
            whatsapp_providers = service.whatsapp().providers().len(),
            "Notification service configured"
        );
        Ok(service)
    }
}
