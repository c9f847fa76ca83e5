//! Gmail API adapter authenticated with an OAuth refresh token.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, time::Instant};

use super::{
    smtp::{build_mime, sender},
    EmailMessage, Provider, ProviderError, Receipt, SimulatedTransport, VendorBody, VendorRequest,
};
use crate::error::Error;

const NAME: &str = "gmail";
const SEND_ENDPOINT: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Gmail API scopes required for sending emails.
const SCOPES: [&str; 1] = ["https://www.googleapis.com/auth/gmail.send"];

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    pub refresh_token: String,

    #[serde(default)]
    pub from_address: String,
}

impl Config {
    fn is_complete(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.refresh_token.is_empty()
            && !self.from_address.is_empty()
    }
}

#[derive(Clone, Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct GmailProvider {
    config: Config,
    from: Option<Mailbox>,
    token: Mutex<Option<AccessToken>>,
    transport: SimulatedTransport,
    oauth: SimulatedTransport,
}

impl GmailProvider {
    /// # Errors
    ///
    /// Returns an error if the sender address is set but not a mailbox.
    pub fn new(config: Config) -> Result<Self, Error> {
        let from = sender(NAME, &config.from_address)?;
        Ok(Self {
            config,
            from,
            token: Mutex::new(None),
            transport: SimulatedTransport::new(NAME, ""),
            oauth: SimulatedTransport::new(NAME, "ya29."),
        })
    }

    /// Cached access token, refreshed when missing or expired.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref().filter(|cached| cached.expires_at > Instant::now()) {
            return Ok(cached.value.clone());
        }

        let form = format!(
            "client_id={}&client_secret={}&refresh_token={}&grant_type=refresh_token&scope={}",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.client_secret),
            urlencoding::encode(&self.config.refresh_token),
            urlencoding::encode(&SCOPES.join(" ")),
        );
        let request = VendorRequest::post(TOKEN_ENDPOINT, VendorBody::Form(form))
            .header("Content-Type", "application/x-www-form-urlencoded");
        let value = self.oauth.execute(&request).await.map_err(|err| {
            ProviderError::Unauthorized { provider: NAME.to_string(), reason: err.to_string() }
        })?;

        tracing::debug!(provider = NAME, "Refreshed OAuth access token");
        *token = Some(AccessToken { value: value.clone(), expires_at: Instant::now() + TOKEN_LIFETIME });
        Ok(value)
    }

    pub(crate) fn build_request(
        &self,
        message: &EmailMessage,
        access_token: &str,
    ) -> Result<VendorRequest, ProviderError> {
        let from = match (&self.from, self.config.is_complete()) {
            (Some(from), true) => from,
            _ => return Err(ProviderError::Unavailable { provider: NAME.to_string() }),
        };
        let email = build_mime(NAME, from, message)?;
        let encoded_email = URL_SAFE.encode(email.formatted());

        let auth_header = if access_token.starts_with("Bearer ") {
            access_token.to_string()
        } else {
            format!("Bearer {access_token}")
        };
        Ok(VendorRequest::post(SEND_ENDPOINT, VendorBody::Json(serde_json::json!({ "raw": encoded_email })))
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json"))
    }
}

#[async_trait]
impl Provider<EmailMessage> for GmailProvider {
    fn name(&self) -> &str { NAME }

    fn is_available(&self) -> bool { self.from.is_some() && self.config.is_complete() }

    async fn send(&self, message: &EmailMessage) -> Result<Receipt, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::Unavailable { provider: NAME.to_string() });
        }
        let token = self.access_token().await?;
        let request = self.build_request(message, &token)?;
        let message_id = self.transport.execute(&request).await?;

        tracing::info!(provider = NAME, "Email accepted by Gmail API");
        Ok(Receipt::new(message_id))
    }

    async fn verify_connection(&self) -> bool {
        self.is_available() && self.access_token().await.is_ok()
    }
}
