//! Request-level delivery across channels, honoring customer preferences.

mod flows;
mod plan;
mod status;

use std::{collections::BTreeMap, panic::AssertUnwindSafe, time::Duration};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, Snafu};

pub use self::{
    flows::{Flow, UnknownFlow},
    plan::{should_attempt, PriorOutcome},
    status::{ServiceStatus, ServiceVerification},
};
use crate::{
    channel::{Channel, ChannelService, ChannelSet, EmailService, SmsService, WhatsAppService},
    dispatch::{DispatchLog, DispatchRecord},
    error::{self, Error},
    preference::{CustomerPreferences, PreferenceStore, PreferencesUpdate},
    provider::{
        EmailMessage, Message, ProviderError, SendResult, SharedProvider, SmsMessage,
        WhatsAppMessage,
    },
    retry::{with_retry, Classify, ErrorClass, RetryError, RetryOptions},
    template::{Template, TemplateError, TemplateRegistry, Variables},
};

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

const INTERNAL_FAILURE: &str = "Internal error while dispatching notification";

/// Where each channel delivers.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// E.164 number used by SMS and WhatsApp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Delivery {
    #[default]
    Immediate,
    /// Wait until `at` before resolving preferences. Past instants send at once.
    Scheduled { at: DateTime<Utc> },
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub customer_id: String,

    /// Exposed to templates as `{reservationId}` unless `variables` has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,

    /// Template name without locale suffix, e.g. `booking_confirmation`.
    pub template: String,

    #[serde(default)]
    pub variables: Variables,

    /// Overrides the customer's preferred channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<ChannelSet>,

    #[serde(default)]
    pub recipient: Recipient,

    #[serde(default)]
    pub delivery: Delivery,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct NotificationResult {
    /// At least one channel delivered.
    pub success: bool,

    /// Outcome of every channel that was prepared or attempted.
    pub channels: BTreeMap<Channel, SendResult>,

    /// `"{channel}: {error}"` for channel failures, or one request-level error.
    pub errors: Vec<String>,
}

impl NotificationResult {
    fn failure(error: impl Into<String>) -> Self {
        Self { success: false, channels: BTreeMap::new(), errors: vec![error.into()] }
    }

    fn delivered(&mut self, result: SendResult) {
        self.success = true;
        drop(self.channels.insert(result.channel, result));
    }

    fn failed(&mut self, channel: Channel, provider: Option<&str>, error: &ChannelError) {
        self.errors.push(format!("{channel}: {error}"));
        let failed = SendResult::failed(channel, provider, error).with_user_message(error.user_message());
        drop(self.channels.insert(channel, failed));
    }

    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&SendResult> { self.channels.get(&channel) }

    #[must_use]
    pub fn succeeded(&self, channel: Channel) -> bool { self.get(channel).is_some_and(|result| result.success) }
}

/// Why one channel of a request produced nothing.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ChannelError {
    #[snafu(display("{source}"))]
    Template { source: TemplateError },

    #[snafu(display("No {channel} destination given"))]
    MissingDestination { channel: Channel },

    #[snafu(display("Template content does not match channel {channel}"))]
    ContentMismatch { channel: Channel },

    #[snafu(display("{source}"))]
    Delivery { source: RetryError<ProviderError> },

    #[snafu(display("Internal error while dispatching notification"))]
    Panicked,
}

impl ChannelError {
    /// Localized message for the customer, once retries are exhausted.
    #[must_use]
    pub const fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Delivery { source } => Some(source.user_message),
            _ => None,
        }
    }
}

impl Classify for ChannelError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Template { source } => source.class(),
            Self::MissingDestination { .. } | Self::ContentMismatch { .. } => ErrorClass::InvalidArgument,
            Self::Delivery { source } => source.class,
            Self::Panicked => ErrorClass::Unknown,
        }
    }
}

/// Delivers [`NotificationRequest`]s over WhatsApp, SMS and email.
pub struct NotificationService {
    templates: TemplateRegistry,
    email: EmailService,
    sms: SmsService,
    whatsapp: WhatsAppService,
    preferences: PreferenceStore,
    retry: RetryOptions,
    log: DispatchLog,
}

impl NotificationService {
    #[must_use]
    pub fn builder() -> NotificationServiceBuilder { NotificationServiceBuilder::default() }

    #[must_use]
    pub const fn templates(&self) -> &TemplateRegistry { &self.templates }

    #[must_use]
    pub const fn email(&self) -> &EmailService { &self.email }

    #[must_use]
    pub const fn sms(&self) -> &SmsService { &self.sms }

    #[must_use]
    pub const fn whatsapp(&self) -> &WhatsAppService { &self.whatsapp }

    #[must_use]
    pub const fn retry_options(&self) -> &RetryOptions { &self.retry }

    /// Deliver `request` on every enabled channel. Never fails: every problem
    /// is reported in the result. A panicking channel is recorded as that
    /// channel's failure; only a panic outside delivery drops the whole result.
    pub async fn send_notification(&self, request: NotificationRequest) -> NotificationResult {
        let customer_id = request.customer_id.clone();
        let template = request.template.clone();
        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(result) => result,
            Err(_panic) => {
                tracing::error!(customer_id = %customer_id, template = %template, "Notification dispatch panicked");
                NotificationResult::failure(INTERNAL_FAILURE)
            }
        }
    }

    async fn dispatch(&self, request: NotificationRequest) -> NotificationResult {
        let NotificationRequest {
            customer_id,
            reservation_id,
            template,
            mut variables,
            channels,
            recipient,
            delivery,
        } = request;

        if let Delivery::Scheduled { at } = delivery {
            wait_until(&customer_id, at).await;
        }

        let preferences = match self.preferences.get(&customer_id).await {
            Ok(preferences) => preferences,
            Err(err) => {
                tracing::warn!(customer_id = %customer_id, "Could not load preferences, nothing sent: {err}");
                return NotificationResult::failure(format!("preferences: {err}"));
            }
        };
        if preferences.opt_out {
            tracing::info!(customer_id = %customer_id, template = %template, "Customer opted out, nothing sent");
            return NotificationResult::failure(format!("Customer `{customer_id}` has opted out"));
        }

        let channels = channels.unwrap_or(preferences.channels);
        if channels.is_empty() {
            tracing::info!(customer_id = %customer_id, template = %template, "No channel enabled, nothing sent");
            return NotificationResult::failure(format!("No channel enabled for customer `{customer_id}`"));
        }
        let template_id = format!("{template}_{}", preferences.language);
        if let Some(reservation_id) = reservation_id {
            let _: &mut String = variables.entry("reservationId".to_string()).or_insert(reservation_id);
        }
        let retry = RetryOptions { language: preferences.language.clone(), ..self.retry.clone() };

        tracing::debug!(customer_id = %customer_id, template_id = %template_id, ?channels, "Dispatching notification");

        let mut result = NotificationResult::default();
        let phone = recipient.phone.as_deref();
        let whatsapp =
            self.prepare::<WhatsAppMessage>(channels, &template_id, &variables, phone, &mut result);
        let sms = self.prepare::<SmsMessage>(channels, &template_id, &variables, phone, &mut result);
        let email = self.prepare::<EmailMessage>(
            channels,
            &template_id,
            &variables,
            recipient.email.as_deref(),
            &mut result,
        );

        let mut prior = if channels.whatsapp { PriorOutcome::Skipped } else { PriorOutcome::NotRequested };
        if let Some(message) = &whatsapp {
            deliver(&self.whatsapp, message, &retry, &mut result).await;
            prior = if result.succeeded(Channel::WhatsApp) {
                PriorOutcome::Succeeded
            } else {
                PriorOutcome::Failed
            };
        }
        if let Some(message) = &sms {
            if should_attempt(Channel::Sms, true, prior) {
                deliver(&self.sms, message, &retry, &mut result).await;
            } else {
                tracing::debug!(customer_id = %customer_id, template_id = %template_id, "WhatsApp delivered, SMS skipped");
            }
        }
        if let Some(message) = &email {
            if should_attempt(Channel::Email, true, prior) {
                deliver(&self.email, message, &retry, &mut result).await;
            }
        }

        tracing::info!(
            customer_id = %customer_id,
            template_id = %template_id,
            success = result.success,
            errors = result.errors.len(),
            "Notification processed"
        );
        result
    }

    /// Render the channel's message. `None` when the channel is disabled or
    /// preparation failed; a failure is recorded in `result`.
    fn prepare<M: Message>(
        &self,
        channels: ChannelSet,
        template_id: &str,
        variables: &Variables,
        destination: Option<&str>,
        result: &mut NotificationResult,
    ) -> Option<M> {
        if !channels.contains(M::CHANNEL) {
            return None;
        }
        match self.build_message::<M>(template_id, variables, destination) {
            Ok(message) => Some(message),
            Err(err) => {
                tracing::warn!(channel = %M::CHANNEL, template_id, "Channel skipped: {err}");
                result.failed(M::CHANNEL, None, &err);
                None
            }
        }
    }

    fn build_message<M: Message>(
        &self,
        template_id: &str,
        variables: &Variables,
        destination: Option<&str>,
    ) -> Result<M, ChannelError> {
        let content = self.templates.prepare(M::CHANNEL, template_id, variables).context(TemplateSnafu)?;
        let destination = destination.context(MissingDestinationSnafu { channel: M::CHANNEL })?;
        M::from_content(destination.to_string(), content).context(ContentMismatchSnafu { channel: M::CHANNEL })
    }

    /// # Errors
    ///
    /// Returns an error if the preference repository fails.
    pub async fn get_customer_preferences(&self, customer_id: &str) -> Result<CustomerPreferences, Error> {
        self.preferences.get(customer_id).await.context(error::PreferenceSnafu)
    }

    /// Merge `update` into the stored preferences.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails or writes keep conflicting.
    pub async fn set_customer_preferences(
        &self,
        customer_id: &str,
        update: &PreferencesUpdate,
    ) -> Result<CustomerPreferences, Error> {
        self.preferences.update(customer_id, update).await.context(error::PreferenceSnafu)
    }

    /// # Errors
    ///
    /// Returns an error if the preference repository fails.
    pub async fn opt_out_customer(&self, customer_id: &str) -> Result<CustomerPreferences, Error> {
        self.preferences.opt_out(customer_id).await.context(error::PreferenceSnafu)
    }

    /// # Errors
    ///
    /// Returns an error if the preference repository fails.
    pub async fn opt_in_customer(&self, customer_id: &str) -> Result<CustomerPreferences, Error> {
        self.preferences.opt_in(customer_id).await.context(error::PreferenceSnafu)
    }

    /// Returns whether stored preferences existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the preference repository fails.
    pub async fn delete_customer_preferences(&self, customer_id: &str) -> Result<bool, Error> {
        self.preferences.delete(customer_id).await.context(error::PreferenceSnafu)
    }

    /// Most recent provider attempts, newest first.
    #[must_use]
    pub fn recent_dispatches(&self, limit: usize) -> Vec<DispatchRecord> { self.log.recent(limit) }
}

/// Deliver through `service` under the retry policy, recording the outcome
/// in `result`.
async fn deliver<M: Message>(
    service: &ChannelService<M>,
    message: &M,
    retry: &RetryOptions,
    result: &mut NotificationResult,
) {
    let channel = M::CHANNEL;
    let context = format!("{channel} delivery");
    let rendered = Variables::new();
    let attempt = with_retry(|| service.send_with_fallback(message, &rendered), retry, &context);
    match AssertUnwindSafe(attempt).catch_unwind().await {
        Ok(Ok(dispatched)) => {
            result.delivered(SendResult::delivered(channel, &dispatched.provider, dispatched.receipt));
        }
        Ok(Err(err)) => {
            let provider = err.source.provider().map(ToString::to_string);
            result.failed(channel, provider.as_deref(), &ChannelError::Delivery { source: err });
        }
        Err(_panic) => {
            tracing::error!(channel = %channel, "Delivery panicked");
            result.failed(channel, None, &PanickedSnafu.build());
        }
    }
}

async fn wait_until(customer_id: &str, at: DateTime<Utc>) {
    if let Ok(delay) = (at - Utc::now()).to_std() {
        tracing::debug!(customer_id, %at, "Waiting for scheduled delivery");
        tokio::time::sleep(delay).await;
    }
}

/// Assembles a [`NotificationService`]. Providers are tried in the order they
/// are added.
pub struct NotificationServiceBuilder {
    templates: TemplateRegistry,
    email: Vec<SharedProvider<EmailMessage>>,
    sms: Vec<SharedProvider<SmsMessage>>,
    whatsapp: Vec<SharedProvider<WhatsAppMessage>>,
    provider_timeout: Duration,
    retry: RetryOptions,
    preferences: Option<PreferenceStore>,
    dispatch_log_capacity: usize,
}

impl Default for NotificationServiceBuilder {
    fn default() -> Self {
        Self {
            templates: TemplateRegistry::builtin(),
            email: Vec::new(),
            sms: Vec::new(),
            whatsapp: Vec::new(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            retry: RetryOptions::default(),
            preferences: None,
            dispatch_log_capacity: DispatchLog::default().capacity(),
        }
    }
}

impl NotificationServiceBuilder {
    /// Add or replace a template of the built-in catalog.
    #[must_use]
    pub fn register_template(mut self, template: Template) -> Self {
        drop(self.templates.register(template));
        self
    }

    /// Replace the whole template registry.
    #[must_use]
    pub fn templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = templates;
        self
    }

    #[must_use]
    pub fn email_provider(mut self, provider: SharedProvider<EmailMessage>) -> Self {
        self.email.push(provider);
        self
    }

    #[must_use]
    pub fn sms_provider(mut self, provider: SharedProvider<SmsMessage>) -> Self {
        self.sms.push(provider);
        self
    }

    #[must_use]
    pub fn whatsapp_provider(mut self, provider: SharedProvider<WhatsAppMessage>) -> Self {
        self.whatsapp.push(provider);
        self
    }

    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn preferences(mut self, preferences: PreferenceStore) -> Self {
        self.preferences = Some(preferences);
        self
    }

    #[must_use]
    pub const fn dispatch_log_capacity(mut self, capacity: usize) -> Self {
        self.dispatch_log_capacity = capacity;
        self
    }

    #[must_use]
    pub fn build(self) -> NotificationService {
        let log = DispatchLog::new(self.dispatch_log_capacity);
        let timeout = self.provider_timeout;
        NotificationService {
            templates: self.templates,
            email: ChannelService::new(self.email, log.clone()).with_timeout(timeout),
            sms: ChannelService::new(self.sms, log.clone()).with_timeout(timeout),
            whatsapp: ChannelService::new(self.whatsapp, log.clone()).with_timeout(timeout),
            preferences: self.preferences.unwrap_or_default(),
            retry: self.retry,
            log,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::provider::{MockConfig, MockFailure, MockProvider};

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    fn booking_variables() -> Variables {
        vars(&[
            ("customerName", "Ayşe"),
            ("pickupLocation", "IST Airport"),
            ("dropoffLocation", "Taksim"),
            ("pickupTime", "2026-10-20 14:30"),
        ])
    }

    fn recipient() -> Recipient {
        Recipient { email: Some("ayse@example.com".to_string()), phone: Some("+905551234567".to_string()) }
    }

    fn mock_service() -> NotificationService {
        let mock = Arc::new(MockProvider::default());
        NotificationService::builder()
            .email_provider(mock.clone())
            .sms_provider(mock.clone())
            .whatsapp_provider(mock)
            .retry(RetryOptions::no_retry())
            .build()
    }

    #[tokio::test]
    async fn test_reservation_id_is_injected() {
        let service = mock_service();
        let request = Flow::BookingConfirmation.request(
            "cust-1",
            Some("RSV-1".to_string()),
            recipient(),
            booking_variables(),
        );

        let result = service.send_notification(request).await;

        assert!(result.success, "{:?}", result.errors);
        assert!(result.errors.is_empty());
        assert!(result.get(Channel::WhatsApp).is_some_and(|r| r.success));
        assert!(result.get(Channel::Sms).is_none());
        assert!(result.get(Channel::Email).is_some_and(|r| r.success));
    }

    #[tokio::test]
    async fn test_missing_destination_is_channel_scoped() {
        let service = mock_service();
        let request = Flow::BookingConfirmation.request(
            "cust-1",
            Some("RSV-1".to_string()),
            Recipient { email: Some("ayse@example.com".to_string()), phone: None },
            booking_variables(),
        );

        let result = service.send_notification(request).await;

        assert!(result.success);
        let whatsapp = result.get(Channel::WhatsApp).unwrap();
        assert_eq!(whatsapp.error_class, Some(ErrorClass::InvalidArgument));
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("whatsapp: "));
        assert!(result.errors[1].starts_with("sms: "));
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_provider_name() {
        let failing = Arc::new(MockProvider::new(MockConfig {
            latency_ms: 0,
            failure: Some(MockFailure::Rejected),
            ..MockConfig::default()
        }));
        let service = NotificationService::builder()
            .email_provider(failing)
            .retry(RetryOptions::no_retry())
            .build();
        let request = NotificationRequest {
            channels: Some(ChannelSet::only(Channel::Email)),
            ..Flow::PaymentSuccess.request(
                "cust-1",
                Some("RSV-1".to_string()),
                recipient(),
                vars(&[("customerName", "A"), ("amount", "10"), ("currency", "EUR")]),
            )
        };

        let result = service.send_notification(request).await;

        assert!(!result.success);
        let email = result.get(Channel::Email).unwrap();
        assert_eq!(email.provider.as_deref(), Some("mock"));
        assert_eq!(email.error_class, Some(ErrorClass::PermissionDenied));
        assert_eq!(service.recent_dispatches(10).len(), 1);
    }

    #[tokio::test]
    async fn test_customer_language_selects_template() {
        let service = mock_service();
        let _stored = service
            .set_customer_preferences(
                "cust-1",
                &PreferencesUpdate {
                    language: Some("de".to_string()),
                    ..PreferencesUpdate::default()
                },
            )
            .await
            .unwrap();

        let result = service.send_otp("cust-1", "+905551234567", "1234").await;

        assert!(!result.success);
        assert!(result.errors[0].contains("otp_de"));
    }
}
