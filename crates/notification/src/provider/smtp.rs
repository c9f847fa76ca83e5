//! SMTP relay adapter.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use super::{
    error::InvalidContentSnafu, EmailMessage, Provider, ProviderError, Receipt, SimulatedTransport,
    VendorBody, VendorRequest,
};
use crate::error::{Error, InvalidSenderAddressSnafu};

const NAME: &str = "smtp";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub host: String,

    #[serde(default = "Config::default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub from_address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: Self::default_port(),
            username: String::new(),
            password: String::new(),
            from_address: String::new(),
        }
    }
}

impl Config {
    #[inline]
    #[must_use]
    pub const fn default_port() -> u16 { 587 }

    fn is_complete(&self) -> bool {
        !self.host.is_empty()
            && self.port != 0
            && !self.username.is_empty()
            && !self.password.is_empty()
            && !self.from_address.is_empty()
    }
}

/// Parse a configured sender, leaving an empty address unset.
pub(crate) fn sender(provider: &'static str, address: &str) -> Result<Option<Mailbox>, Error> {
    if address.is_empty() {
        return Ok(None);
    }
    address.parse::<Mailbox>().map(Some).context(InvalidSenderAddressSnafu { provider, address })
}

/// Build a `multipart/alternative` message with plain-text and HTML parts.
pub(crate) fn build_mime(
    provider: &str,
    from: &Mailbox,
    message: &EmailMessage,
) -> Result<lettre::Message, ProviderError> {
    lettre::Message::builder()
        .from(from.clone())
        .to(message.mailbox(provider)?)
        .subject(message.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(message.text.clone(), message.html.clone()))
        .map_err(|err| InvalidContentSnafu { provider, reason: err.to_string() }.build())
}

#[derive(Debug)]
pub struct SmtpProvider {
    config: Config,
    from: Option<Mailbox>,
    transport: SimulatedTransport,
}

impl SmtpProvider {
    /// # Errors
    ///
    /// Returns an error if the sender address is set but not a mailbox.
    pub fn new(config: Config) -> Result<Self, Error> {
        let from = sender(NAME, &config.from_address)?;
        Ok(Self { config, from, transport: SimulatedTransport::new(NAME, "smtp-") })
    }

    fn sender(&self) -> Result<&Mailbox, ProviderError> {
        match (&self.from, self.config.is_complete()) {
            (Some(from), true) => Ok(from),
            _ => Err(ProviderError::Unavailable { provider: NAME.to_string() }),
        }
    }

    pub(crate) fn build_request(&self, message: &EmailMessage) -> Result<VendorRequest, ProviderError> {
        let mime = build_mime(NAME, self.sender()?, message)?;
        let endpoint = format!("smtp://{}:{}", self.config.host, self.config.port);
        Ok(VendorRequest::post(endpoint, VendorBody::Mime(mime.formatted()))
            .header("AUTH", format!("PLAIN {}", self.config.username)))
    }
}

#[async_trait]
impl Provider<EmailMessage> for SmtpProvider {
    fn name(&self) -> &str { NAME }

    fn is_available(&self) -> bool { self.from.is_some() && self.config.is_complete() }

    async fn send(&self, message: &EmailMessage) -> Result<Receipt, ProviderError> {
        let request = self.build_request(message)?;
        let message_id = self.transport.execute(&request).await?;
        Ok(Receipt::new(format!("{message_id}@{}", self.config.host)))
    }

    async fn verify_connection(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        let request = VendorRequest::post(
            format!("smtp://{}:{}", self.config.host, self.config.port),
            VendorBody::Form("EHLO".to_string()),
        );
        self.transport.execute(&request).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from_address: "Transfers <noreply@example.com>".to_string(),
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: "ahmet@example.com".to_string(),
            subject: "Booking confirmed".to_string(),
            html: "<p>Confirmed</p>".to_string(),
            text: "Confirmed".to_string(),
        }
    }

    #[test]
    fn test_availability_requires_every_value() {
        assert!(SmtpProvider::new(config()).unwrap().is_available());
        assert!(!SmtpProvider::new(Config { password: String::new(), ..config() })
            .unwrap()
            .is_available());
        assert!(!SmtpProvider::new(Config::default()).unwrap().is_available());
    }

    #[test]
    fn test_invalid_sender_fails_construction() {
        let result = SmtpProvider::new(Config { from_address: "nope".to_string(), ..config() });

        assert!(matches!(result, Err(Error::InvalidSenderAddress { provider: "smtp", .. })));
    }

    #[test]
    fn test_request_carries_multipart_mime() {
        let request = SmtpProvider::new(config()).unwrap().build_request(&message()).unwrap();

        let VendorBody::Mime(bytes) = request.body else { panic!("expected MIME body") };
        let formatted = String::from_utf8(bytes).unwrap();
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("ahmet@example.com"));
        assert!(formatted.contains("Booking confirmed"));
    }

    #[tokio::test]
    async fn test_unavailable_provider_refuses_to_send() {
        let provider = SmtpProvider::new(Config::default()).unwrap();

        assert!(matches!(
            provider.send(&message()).await,
            Err(ProviderError::Unavailable { .. })
        ));
        assert!(!provider.verify_connection().await);
    }
}
