//! İleti Merkezi, a Turkish SMS gateway authenticated with a key and hash.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    message::validate_phone, quota::segment_cost, sms_segments, Provider, ProviderError, Quota,
    QuotaTracker, Receipt, SimulatedTransport, SmsMessage, VendorBody, VendorRequest,
};

const NAME: &str = "iletimerkezi";
const ENDPOINT: &str = "https://api.iletimerkezi.com/v1/send-sms/json";
const HOME_COUNTRY_CODE: &str = "90";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_hash: String,

    #[serde(default)]
    pub sender: String,

    #[serde(default = "Config::default_monthly_quota")]
    pub monthly_quota: u64,

    #[serde(default = "Config::default_price_per_segment")]
    pub price_per_segment: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_hash: String::new(),
            sender: String::new(),
            monthly_quota: Self::default_monthly_quota(),
            price_per_segment: Self::default_price_per_segment(),
        }
    }
}

impl Config {
    #[inline]
    #[must_use]
    pub const fn default_monthly_quota() -> u64 { 10_000 }

    #[inline]
    #[must_use]
    pub const fn default_price_per_segment() -> f64 { 0.22 }
}

#[derive(Debug)]
pub struct IletiMerkeziProvider {
    config: Config,
    quota: QuotaTracker,
    transport: SimulatedTransport,
}

impl IletiMerkeziProvider {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let quota = QuotaTracker::new(config.monthly_quota);
        Self { config, quota, transport: SimulatedTransport::new(NAME, "im-") }
    }

    fn authentication(&self) -> serde_json::Value {
        serde_json::json!({ "key": self.config.api_key, "hash": self.config.api_hash })
    }

    pub(crate) fn build_request(&self, message: &SmsMessage) -> Result<VendorRequest, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::Unavailable { provider: NAME.to_string() });
        }
        validate_phone(NAME, &message.to)?;

        let body = serde_json::json!({
            "request": {
                "authentication": self.authentication(),
                "order": {
                    "sender": self.config.sender,
                    "message": {
                        "text": message.body,
                        "receipents": { "number": [message.to.trim_start_matches('+')] },
                    },
                },
            },
        });
        Ok(VendorRequest::post(ENDPOINT, VendorBody::Json(body)))
    }
}

#[async_trait]
impl Provider<SmsMessage> for IletiMerkeziProvider {
    fn name(&self) -> &str { NAME }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
            && !self.config.api_hash.is_empty()
            && !self.config.sender.is_empty()
    }

    async fn send(&self, message: &SmsMessage) -> Result<Receipt, ProviderError> {
        let request = self.build_request(message)?;
        let order_id = self.transport.execute(&request).await?;

        let segments = sms_segments(&message.body);
        self.quota.record(segments);
        Ok(Receipt::new(order_id).with_cost(segment_cost(segments, self.config.price_per_segment)))
    }

    async fn verify_connection(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        let request = VendorRequest::post(
            "https://api.iletimerkezi.com/v1/get-balance/json",
            VendorBody::Json(serde_json::json!({
                "request": { "authentication": self.authentication() },
            })),
        );
        self.transport.execute(&request).await.is_ok()
    }

    fn quota(&self) -> Option<Quota> { Some(self.quota.snapshot()) }

    fn home_country_code(&self) -> Option<&str> { Some(HOME_COUNTRY_CODE) }
}
