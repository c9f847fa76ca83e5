use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};

use super::error::{InvalidDestinationSnafu, ProviderError};
use crate::{
    channel::Channel,
    template::{placeholder, TemplateContent, Variables},
};

/// A deliverable message of one channel.
pub trait Message: Clone + Send + Sync + 'static {
    const CHANNEL: Channel;

    fn destination(&self) -> &str;

    /// Main text, used for SMS segment billing.
    fn body(&self) -> &str;

    /// Substitute `variables` into every text field.
    #[must_use]
    fn render(&self, variables: &Variables) -> Self;

    /// Build a message from rendered template content. Returns `None` when
    /// the content belongs to another channel.
    fn from_content(destination: String, content: TemplateContent) -> Option<Self>;
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailMessage {
    /// # Errors
    ///
    /// Returns an error if `to` is not an RFC 5322 mailbox.
    pub fn mailbox(&self, provider: &str) -> Result<Mailbox, ProviderError> {
        self.to.parse::<Mailbox>().map_err(|err| {
            InvalidDestinationSnafu {
                provider,
                destination: self.to.as_str(),
                reason: err.to_string(),
            }
            .build()
        })
    }
}

impl Message for EmailMessage {
    const CHANNEL: Channel = Channel::Email;

    fn destination(&self) -> &str { &self.to }

    fn body(&self) -> &str { &self.text }

    fn render(&self, variables: &Variables) -> Self {
        Self {
            to: self.to.clone(),
            subject: placeholder::render(&self.subject, variables),
            html: placeholder::render(&self.html, variables),
            text: placeholder::render(&self.text, variables),
        }
    }

    fn from_content(destination: String, content: TemplateContent) -> Option<Self> {
        match content {
            TemplateContent::Email { subject, html, text } => {
                Some(Self { to: destination, subject, html, text })
            }
            _ => None,
        }
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SmsMessage {
    /// E.164 phone number.
    pub to: String,
    pub body: String,
}

impl Message for SmsMessage {
    const CHANNEL: Channel = Channel::Sms;

    fn destination(&self) -> &str { &self.to }

    fn body(&self) -> &str { &self.body }

    fn render(&self, variables: &Variables) -> Self {
        Self { to: self.to.clone(), body: placeholder::render(&self.body, variables) }
    }

    fn from_content(destination: String, content: TemplateContent) -> Option<Self> {
        match content {
            TemplateContent::Sms { body } => Some(Self { to: destination, body }),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WhatsAppMessage {
    /// E.164 phone number.
    pub to: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl Message for WhatsAppMessage {
    const CHANNEL: Channel = Channel::WhatsApp;

    fn destination(&self) -> &str { &self.to }

    fn body(&self) -> &str { &self.body }

    fn render(&self, variables: &Variables) -> Self {
        Self {
            to: self.to.clone(),
            body: placeholder::render(&self.body, variables),
            media_url: self.media_url.as_deref().map(|url| placeholder::render(url, variables)),
        }
    }

    fn from_content(destination: String, content: TemplateContent) -> Option<Self> {
        match content {
            TemplateContent::WhatsApp { body, media_url } => {
                Some(Self { to: destination, body, media_url })
            }
            _ => None,
        }
    }
}

/// Check that `number` is E.164: `+`, a non-zero digit, 8 to 15 digits total.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidDestination`] otherwise.
pub(crate) fn validate_phone(provider: &str, number: &str) -> Result<(), ProviderError> {
    let reason = match number.strip_prefix('+') {
        None => Some("missing leading `+`"),
        Some(digits) if !digits.bytes().all(|b| b.is_ascii_digit()) => Some("non-digit characters"),
        Some(digits) if digits.starts_with('0') => Some("country code cannot start with 0"),
        Some(digits) if !(8..=15).contains(&digits.len()) => Some("must have 8 to 15 digits"),
        Some(_) => None,
    };

    match reason {
        Some(reason) => InvalidDestinationSnafu { provider, destination: number, reason }.fail(),
        None => Ok(()),
    }
}

/// Number of billable segments for an SMS body.
///
/// Bodies made only of ASCII characters use the GSM 7-bit budget of 160 (153
/// per part when concatenated); anything else is UCS-2 with 70 (67).
#[must_use]
pub fn sms_segments(body: &str) -> u64 {
    let (single, multi) = if body.is_ascii() { (160, 153) } else { (70, 67) };
    let length = body.chars().count();
    let segments = if length <= single { 1 } else { length.div_ceil(multi) };
    u64::try_from(segments).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("mock", "+905551112233").is_ok());
        assert!(validate_phone("mock", "905551112233").is_err());
        assert!(validate_phone("mock", "+90 555 111").is_err());
        assert!(validate_phone("mock", "+0123456789").is_err());
        assert!(validate_phone("mock", "+1234").is_err());
    }

    #[test]
    fn test_sms_segments() {
        assert_eq!(sms_segments(""), 1);
        assert_eq!(sms_segments(&"a".repeat(160)), 1);
        assert_eq!(sms_segments(&"a".repeat(161)), 2);
        assert_eq!(sms_segments(&"ş".repeat(70)), 1);
        assert_eq!(sms_segments(&"ş".repeat(71)), 2);
    }

    #[test]
    fn test_from_content_rejects_other_channel() {
        let content = TemplateContent::Sms { body: "hi".to_string() };

        assert!(EmailMessage::from_content("a@b.co".to_string(), content.clone()).is_none());
        assert_eq!(
            SmsMessage::from_content("+905551112233".to_string(), content),
            Some(SmsMessage { to: "+905551112233".to_string(), body: "hi".to_string() })
        );
    }

    #[test]
    fn test_mailbox_validation() {
        let mut message = EmailMessage {
            to: "Ahmet <ahmet@example.com>".to_string(),
            subject: String::new(),
            html: String::new(),
            text: String::new(),
        };
        assert!(message.mailbox("smtp").is_ok());

        message.to = "not-an-address".to_string();
        assert!(matches!(message.mailbox("smtp"), Err(ProviderError::InvalidDestination { .. })));
    }
}
