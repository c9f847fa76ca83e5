//! Provider adapters: interchangeable vendor backends behind one contract per
//! channel.
//!
//! | Channel  | Providers                                   |
//! |----------|---------------------------------------------|
//! | email    | `smtp`, `sendgrid`, `gmail`, `mock`         |
//! | sms      | `netgsm`, `iletimerkezi`, `twilio`, `mock`  |
//! | whatsapp | `whatsapp-business`, `mock`                 |
//!
//! Vendor adapters build the request they would send and hand it to a
//! [`SimulatedTransport`].

mod error;
pub mod gmail;
pub mod iletimerkezi;
mod message;
pub mod mock;
pub mod netgsm;
mod quota;
pub mod sendgrid;
pub mod smtp;
mod transport;
pub mod twilio;
pub mod whatsapp_business;

use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use self::{
    error::ProviderError,
    message::{sms_segments, EmailMessage, Message, SmsMessage, WhatsAppMessage},
    mock::{MockConfig, MockFailure, MockProvider},
    quota::{Quota, QuotaTracker},
    transport::{SimulatedTransport, VendorBody, VendorRequest},
};
use crate::{
    channel::Channel,
    retry::{Classify, ErrorClass},
};

/// Outcome of one accepted send.
#[derive(Clone, Debug, PartialEq)]
pub struct Receipt {
    pub message_id: String,
    pub cost: Option<f64>,
}

impl Receipt {
    #[must_use]
    pub fn new(message_id: impl Into<String>) -> Self {
        Self { message_id: message_id.into(), cost: None }
    }

    #[must_use]
    pub const fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// A vendor backend for messages of type `M`.
#[async_trait]
pub trait Provider<M: Message>: Send + Sync {
    fn name(&self) -> &str;

    /// True iff every required configuration value is present.
    fn is_available(&self) -> bool;

    async fn send(&self, message: &M) -> Result<Receipt, ProviderError>;

    /// Check credentials against the vendor. Always false when unavailable.
    async fn verify_connection(&self) -> bool;

    fn quota(&self) -> Option<Quota> { None }

    /// Calling code of the country this gateway is local to, without `+`.
    fn home_country_code(&self) -> Option<&str> { None }
}

pub type SharedProvider<M> = Arc<dyn Provider<M>>;

/// Per-channel delivery outcome as reported to callers.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub success: bool,
    pub channel: Channel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,

    /// Localized explanation fit to show the customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl SendResult {
    #[must_use]
    pub fn delivered(channel: Channel, provider: &str, receipt: Receipt) -> Self {
        Self {
            success: true,
            channel,
            provider: Some(provider.to_string()),
            message_id: Some(receipt.message_id),
            error: None,
            error_class: None,
            cost: receipt.cost,
            user_message: None,
            attempted_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn failed<E>(channel: Channel, provider: Option<&str>, error: &E) -> Self
    where
        E: Display + Classify,
    {
        Self {
            success: false,
            channel,
            provider: provider.map(ToString::to_string),
            message_id: None,
            error: Some(error.to_string()),
            error_class: Some(error.class()),
            cost: None,
            user_message: None,
            attempted_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_user_message(mut self, user_message: Option<&str>) -> Self {
        self.user_message = user_message.map(ToString::to_string);
        self
    }
}
