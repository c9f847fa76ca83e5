//! API-key email adapter for SendGrid's v3 mail endpoint.

use async_trait::async_trait;
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};

use super::{
    smtp::sender, EmailMessage, Provider, ProviderError, Receipt, SimulatedTransport, VendorBody,
    VendorRequest,
};
use crate::error::Error;

const NAME: &str = "sendgrid";
const ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub from_address: String,
}

#[derive(Debug)]
pub struct SendGridProvider {
    api_key: String,
    from: Option<Mailbox>,
    transport: SimulatedTransport,
}

impl SendGridProvider {
    /// # Errors
    ///
    /// Returns an error if the sender address is set but not a mailbox.
    pub fn new(config: Config) -> Result<Self, Error> {
        let from = sender(NAME, &config.from_address)?;
        Ok(Self { api_key: config.api_key, from, transport: SimulatedTransport::new(NAME, "sg_") })
    }

    pub(crate) fn build_request(&self, message: &EmailMessage) -> Result<VendorRequest, ProviderError> {
        let from = match (&self.from, self.api_key.is_empty()) {
            (Some(from), false) => from,
            _ => return Err(ProviderError::Unavailable { provider: NAME.to_string() }),
        };
        let to = message.mailbox(NAME)?;

        let body = serde_json::json!({
            "personalizations": [{ "to": [{ "email": to.email.to_string() }] }],
            "from": { "email": from.email.to_string(), "name": from.name },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html },
            ],
        });
        Ok(VendorRequest::post(ENDPOINT, VendorBody::Json(body))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json"))
    }
}

#[async_trait]
impl Provider<EmailMessage> for SendGridProvider {
    fn name(&self) -> &str { NAME }

    fn is_available(&self) -> bool { self.from.is_some() && !self.api_key.is_empty() }

    async fn send(&self, message: &EmailMessage) -> Result<Receipt, ProviderError> {
        let request = self.build_request(message)?;
        self.transport.execute(&request).await.map(Receipt::new)
    }

    async fn verify_connection(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        let request = VendorRequest {
            method: "GET",
            endpoint: "https://api.sendgrid.com/v3/scopes".to_string(),
            headers: vec![("Authorization".to_string(), format!("Bearer {}", self.api_key))],
            body: VendorBody::Json(serde_json::Value::Null),
        };
        self.transport.execute(&request).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let provider = SendGridProvider::new(Config {
            api_key: "SG.key".to_string(),
            from_address: "Transfers <noreply@example.com>".to_string(),
        })
        .unwrap();
        let message = EmailMessage {
            to: "ahmet@example.com".to_string(),
            subject: "Payment received".to_string(),
            html: "<p>ok</p>".to_string(),
            text: "ok".to_string(),
        };

        let request = provider.build_request(&message).unwrap();
        let VendorBody::Json(body) = &request.body else { panic!("expected JSON body") };
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "ahmet@example.com");
        assert_eq!(body["from"]["name"], "Transfers");
        assert_eq!(request.header_value("Authorization"), Some("Bearer SG.key"));
    }

    #[test]
    fn test_missing_api_key_is_unavailable() {
        let provider = SendGridProvider::new(Config {
            api_key: String::new(),
            from_address: "noreply@example.com".to_string(),
        })
        .unwrap();

        assert!(!provider.is_available());
    }
}
