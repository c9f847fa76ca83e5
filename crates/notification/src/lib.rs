//! # Notification Crate
//!
//! Multi-channel customer notifications for transfer bookings: email, SMS and
//! WhatsApp, each served by a priority list of providers with fallback.
//!
//! ## Features
//!
//! - Template registry with a built-in Turkish and English booking catalog
//! - Provider adapters for SMTP, SendGrid, Gmail, NetGSM, İleti Merkezi,
//!   Twilio and the WhatsApp Business API, plus a mock provider
//! - Per-customer channel preferences and opt-out
//! - Classified errors with exponential-backoff retry

pub mod channel;
pub mod config;
pub mod dispatch;
mod error;
pub mod orchestrator;
pub mod preference;
pub mod provider;
pub mod retry;
pub mod template;

pub use self::{
    channel::{Channel, ChannelSet},
    config::NotificationConfig,
    error::Error,
    orchestrator::{
        Delivery, Flow, NotificationRequest, NotificationResult, NotificationService,
        NotificationServiceBuilder, Recipient,
    },
    template::{TemplateRegistry, Variables},
};
