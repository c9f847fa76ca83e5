//! NetGSM, a Turkish SMS gateway.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::{
    message::validate_phone, quota::segment_cost, sms_segments, Provider, ProviderError, Quota,
    QuotaTracker, Receipt, SimulatedTransport, SmsMessage, VendorBody, VendorRequest,
};

const NAME: &str = "netgsm";
const ENDPOINT: &str = "https://api.netgsm.com.tr/sms/rest/v2/send";
const HOME_COUNTRY_CODE: &str = "90";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub user_code: String,

    #[serde(default)]
    pub password: String,

    /// Approved sender title shown to the recipient.
    #[serde(default)]
    pub message_header: String,

    #[serde(default = "Config::default_monthly_quota")]
    pub monthly_quota: u64,

    /// Price of one segment, in TRY.
    #[serde(default = "Config::default_price_per_segment")]
    pub price_per_segment: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_code: String::new(),
            password: String::new(),
            message_header: String::new(),
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
    pub const fn default_price_per_segment() -> f64 { 0.25 }
}

#[derive(Debug)]
pub struct NetGsmProvider {
    config: Config,
    quota: QuotaTracker,
    transport: SimulatedTransport,
}

impl NetGsmProvider {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let quota = QuotaTracker::new(config.monthly_quota);
        Self { config, quota, transport: SimulatedTransport::new(NAME, "") }
    }

    pub(crate) fn build_request(&self, message: &SmsMessage) -> Result<VendorRequest, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::Unavailable { provider: NAME.to_string() });
        }
        validate_phone(NAME, &message.to)?;

        // NetGSM takes numbers without the leading `+`.
        let number = message.to.trim_start_matches('+');
        let encoding = if message.body.is_ascii() { "" } else { "TR" };
        let body = serde_json::json!({
            "msgheader": self.config.message_header,
            "encoding": encoding,
            "messages": [{ "msg": message.body, "no": number }],
        });
        let credentials = STANDARD.encode(format!("{}:{}", self.config.user_code, self.config.password));
        Ok(VendorRequest::post(ENDPOINT, VendorBody::Json(body))
            .header("Authorization", format!("Basic {credentials}")))
    }
}

#[async_trait]
impl Provider<SmsMessage> for NetGsmProvider {
    fn name(&self) -> &str { NAME }

    fn is_available(&self) -> bool {
        !self.config.user_code.is_empty()
            && !self.config.password.is_empty()
            && !self.config.message_header.is_empty()
    }

    async fn send(&self, message: &SmsMessage) -> Result<Receipt, ProviderError> {
        let request = self.build_request(message)?;
        let job_id = self.transport.execute(&request).await?;

        let segments = sms_segments(&message.body);
        self.quota.record(segments);
        Ok(Receipt::new(job_id).with_cost(segment_cost(segments, self.config.price_per_segment)))
    }

    async fn verify_connection(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        let request = VendorRequest::post(
            "https://api.netgsm.com.tr/balance",
            VendorBody::Json(serde_json::json!({ "usercode": self.config.user_code, "stip": 2 })),
        );
        self.transport.execute(&request).await.is_ok()
    }

    fn quota(&self) -> Option<Quota> { Some(self.quota.snapshot()) }

    fn home_country_code(&self) -> Option<&str> { Some(HOME_COUNTRY_CODE) }
}
