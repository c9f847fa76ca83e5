//! Twilio Programmable Messaging, used for international numbers.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::{
    message::validate_phone, quota::segment_cost, sms_segments, Provider, ProviderError, Quota,
    QuotaTracker, Receipt, SimulatedTransport, SmsMessage, VendorBody, VendorRequest,
};

const NAME: &str = "twilio";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub account_sid: String,

    #[serde(default)]
    pub auth_token: String,

    /// E.164 sender number.
    #[serde(default)]
    pub from_number: String,

    #[serde(default = "Config::default_monthly_quota")]
    pub monthly_quota: u64,

    /// Price of one segment, in USD.
    #[serde(default = "Config::default_price_per_segment")]
    pub price_per_segment: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            monthly_quota: Self::default_monthly_quota(),
            price_per_segment: Self::default_price_per_segment(),
        }
    }
}

impl Config {
    #[inline]
    #[must_use]
    pub const fn default_monthly_quota() -> u64 { 5_000 }

    #[inline]
    #[must_use]
    pub const fn default_price_per_segment() -> f64 { 0.0079 }
}

#[derive(Debug)]
pub struct TwilioProvider {
    config: Config,
    quota: QuotaTracker,
    transport: SimulatedTransport,
}

impl TwilioProvider {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let quota = QuotaTracker::new(config.monthly_quota);
        Self { config, quota, transport: SimulatedTransport::new(NAME, "SM") }
    }

    fn authorization(&self) -> String {
        let credentials =
            STANDARD.encode(format!("{}:{}", self.config.account_sid, self.config.auth_token));
        format!("Basic {credentials}")
    }

    pub(crate) fn build_request(&self, message: &SmsMessage) -> Result<VendorRequest, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::Unavailable { provider: NAME.to_string() });
        }
        validate_phone(NAME, &message.to)?;

        let endpoint = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        );
        let form = format!(
            "To={}&From={}&Body={}",
            urlencoding::encode(&message.to),
            urlencoding::encode(&self.config.from_number),
            urlencoding::encode(&message.body),
        );
        Ok(VendorRequest::post(endpoint, VendorBody::Form(form))
            .header("Authorization", self.authorization())
            .header("Content-Type", "application/x-www-form-urlencoded"))
    }
}

#[async_trait]
impl Provider<SmsMessage> for TwilioProvider {
    fn name(&self) -> &str { NAME }

    fn is_available(&self) -> bool {
        !self.config.account_sid.is_empty()
            && !self.config.auth_token.is_empty()
            && !self.config.from_number.is_empty()
    }

    async fn send(&self, message: &SmsMessage) -> Result<Receipt, ProviderError> {
        let request = self.build_request(message)?;
        let sid = self.transport.execute(&request).await?;

        let segments = sms_segments(&message.body);
        self.quota.record(segments);
        Ok(Receipt::new(sid).with_cost(segment_cost(segments, self.config.price_per_segment)))
    }

    async fn verify_connection(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        let request = VendorRequest {
            method: "GET",
            endpoint: format!(
                "https://api.twilio.com/2010-04-01/Accounts/{}.json",
                self.config.account_sid
            ),
            headers: vec![("Authorization".to_string(), self.authorization())],
            body: VendorBody::Form(String::new()),
        };
        self.transport.execute(&request).await.is_ok()
    }

    fn quota(&self) -> Option<Quota> { Some(self.quota.snapshot()) }
}
