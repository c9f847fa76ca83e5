use serde::Serialize;
use uuid::Uuid;

use super::ProviderError;

/// Payload of a vendor request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum VendorBody {
    Json(serde_json::Value),
    Form(String),
    /// RFC 5322 message bytes.
    Mime(Vec<u8>),
}

impl VendorBody {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Json(value) => value.to_string().len(),
            Self::Form(form) => form.len(),
            Self::Mime(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// The request a vendor adapter would put on the wire.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VendorRequest {
    pub method: &'static str,
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub body: VendorBody,
}

impl VendorRequest {
    #[must_use]
    pub fn post(endpoint: impl Into<String>, body: VendorBody) -> Self {
        Self { method: "POST", endpoint: endpoint.into(), headers: Vec::new(), body }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Stand-in for the network: logs the request and hands back a vendor-style
/// message id.
#[derive(Clone, Debug)]
pub struct SimulatedTransport {
    provider: &'static str,
    id_prefix: &'static str,
}

impl SimulatedTransport {
    #[must_use]
    pub const fn new(provider: &'static str, id_prefix: &'static str) -> Self {
        Self { provider, id_prefix }
    }

    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the endpoint is empty.
    pub async fn execute(&self, request: &VendorRequest) -> Result<String, ProviderError> {
        if request.endpoint.is_empty() {
            return Err(ProviderError::Transport {
                provider: self.provider.to_string(),
                reason: "empty endpoint".to_string(),
            });
        }
        tokio::task::yield_now().await;

        let message_id = format!("{}{}", self.id_prefix, Uuid::new_v4().simple());
        tracing::debug!(
            provider = self.provider,
            method = request.method,
            endpoint = %request.endpoint,
            body_bytes = request.body.len(),
            message_id = %message_id,
            "Simulated vendor request"
        );
        Ok(message_id)
    }
}
