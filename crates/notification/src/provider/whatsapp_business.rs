//! WhatsApp Business Cloud API adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    message::validate_phone, Provider, ProviderError, Receipt, SimulatedTransport, VendorBody,
    VendorRequest, WhatsAppMessage,
};

const NAME: &str = "whatsapp-business";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub phone_number_id: String,

    #[serde(default)]
    pub business_account_id: String,

    #[serde(default = "Config::default_api_version")]
    pub api_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            business_account_id: String::new(),
            api_version: Self::default_api_version(),
        }
    }
}

impl Config {
    #[inline]
    #[must_use]
    pub fn default_api_version() -> String { "v18.0".to_string() }
}

#[derive(Debug)]
pub struct WhatsAppBusinessProvider {
    config: Config,
    transport: SimulatedTransport,
}

impl WhatsAppBusinessProvider {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, transport: SimulatedTransport::new(NAME, "wamid.") }
    }

    fn graph_url(&self, path: &str) -> String {
        format!("https://graph.facebook.com/{}/{path}", self.config.api_version)
    }

    pub(crate) fn build_request(
        &self,
        message: &WhatsAppMessage,
    ) -> Result<VendorRequest, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::Unavailable { provider: NAME.to_string() });
        }
        validate_phone(NAME, &message.to)?;

        let to = message.to.trim_start_matches('+');
        let body = match &message.media_url {
            Some(link) => serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "image",
                "image": { "link": link, "caption": message.body },
            }),
            None => serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": message.body },
            }),
        };
        Ok(VendorRequest::post(
            self.graph_url(&format!("{}/messages", self.config.phone_number_id)),
            VendorBody::Json(body),
        )
        .header("Authorization", format!("Bearer {}", self.config.access_token)))
    }
}

#[async_trait]
impl Provider<WhatsAppMessage> for WhatsAppBusinessProvider {
    fn name(&self) -> &str { NAME }

    fn is_available(&self) -> bool {
        !self.config.access_token.is_empty()
            && !self.config.phone_number_id.is_empty()
            && !self.config.business_account_id.is_empty()
    }

    async fn send(&self, message: &WhatsAppMessage) -> Result<Receipt, ProviderError> {
        let request = self.build_request(message)?;
        self.transport.execute(&request).await.map(Receipt::new)
    }

    async fn verify_connection(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        let request = VendorRequest {
            method: "GET",
            endpoint: self.graph_url(&self.config.business_account_id),
            headers: vec![(
                "Authorization".to_string(),
                format!("Bearer {}", self.config.access_token),
            )],
            body: VendorBody::Json(serde_json::Value::Null),
        };
        self.transport.execute(&request).await.is_ok()
    }
}
