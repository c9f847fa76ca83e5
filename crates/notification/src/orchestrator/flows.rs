//! Preset booking flows on top of [`NotificationService::send_notification`].

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use super::{Delivery, NotificationRequest, NotificationResult, NotificationService, Recipient};
use crate::{
    channel::{Channel, ChannelSet},
    template::Variables,
};

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flow {
    BookingConfirmation,
    PaymentSuccess,
    TransferReminder,
    QrCode,
    DriverAssignment,
    Otp,
}

impl Flow {
    pub const ALL: [Self; 6] = [
        Self::BookingConfirmation,
        Self::PaymentSuccess,
        Self::TransferReminder,
        Self::QrCode,
        Self::DriverAssignment,
        Self::Otp,
    ];

    /// Template name, without locale suffix.
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::BookingConfirmation => "booking_confirmation",
            Self::PaymentSuccess => "payment_success",
            Self::TransferReminder => "transfer_reminder",
            Self::QrCode => "qr_code",
            Self::DriverAssignment => "driver_assignment",
            Self::Otp => "otp",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BookingConfirmation => "booking-confirmation",
            Self::PaymentSuccess => "payment-success",
            Self::TransferReminder => "transfer-reminder",
            Self::QrCode => "qr-code",
            Self::DriverAssignment => "driver-assignment",
            Self::Otp => "otp",
        }
    }

    /// Channels this flow forces regardless of preferences.
    #[must_use]
    pub const fn forced_channels(self) -> Option<ChannelSet> {
        match self {
            Self::BookingConfirmation | Self::PaymentSuccess | Self::TransferReminder => None,
            Self::QrCode => Some(ChannelSet { email: false, sms: true, whatsapp: true }),
            Self::DriverAssignment => Some(ChannelSet::only(Channel::WhatsApp)),
            Self::Otp => Some(ChannelSet::only(Channel::Sms)),
        }
    }

    /// Build the request for this flow.
    #[must_use]
    pub fn request(
        self,
        customer_id: impl Into<String>,
        reservation_id: Option<String>,
        recipient: Recipient,
        variables: Variables,
    ) -> NotificationRequest {
        NotificationRequest {
            customer_id: customer_id.into(),
            reservation_id,
            template: self.template().to_string(),
            variables,
            channels: self.forced_channels(),
            recipient,
            delivery: Delivery::Immediate,
        }
    }
}

impl Display for Flow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownFlow(pub String);

impl Display for UnknownFlow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "unknown flow `{}`", self.0) }
}

impl std::error::Error for UnknownFlow {}

impl FromStr for Flow {
    type Err = UnknownFlow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flow| flow.as_str() == s || flow.template() == s)
            .ok_or_else(|| UnknownFlow(s.to_string()))
    }
}

impl NotificationService {
    pub async fn send_booking_confirmation(
        &self,
        customer_id: &str,
        reservation_id: &str,
        recipient: Recipient,
        variables: Variables,
    ) -> NotificationResult {
        self.send_flow(Flow::BookingConfirmation, customer_id, reservation_id, recipient, variables).await
    }

    pub async fn send_payment_success(
        &self,
        customer_id: &str,
        reservation_id: &str,
        recipient: Recipient,
        variables: Variables,
    ) -> NotificationResult {
        self.send_flow(Flow::PaymentSuccess, customer_id, reservation_id, recipient, variables).await
    }

    /// `hours` before pickup is exposed to templates as `{hours}`.
    pub async fn send_transfer_reminder(
        &self,
        customer_id: &str,
        reservation_id: &str,
        recipient: Recipient,
        mut variables: Variables,
        hours: u32,
    ) -> NotificationResult {
        drop(variables.insert("hours".to_string(), hours.to_string()));
        self.send_flow(Flow::TransferReminder, customer_id, reservation_id, recipient, variables).await
    }

    /// SMS and WhatsApp only.
    pub async fn send_qr_code(
        &self,
        customer_id: &str,
        reservation_id: &str,
        recipient: Recipient,
        variables: Variables,
    ) -> NotificationResult {
        self.send_flow(Flow::QrCode, customer_id, reservation_id, recipient, variables).await
    }

    /// WhatsApp only.
    pub async fn send_driver_assignment(
        &self,
        customer_id: &str,
        reservation_id: &str,
        recipient: Recipient,
        variables: Variables,
    ) -> NotificationResult {
        self.send_flow(Flow::DriverAssignment, customer_id, reservation_id, recipient, variables).await
    }

    /// SMS only, overriding the customer's channel preferences.
    pub async fn send_otp(&self, customer_id: &str, phone: &str, otp: &str) -> NotificationResult {
        let recipient = Recipient { email: None, phone: Some(phone.to_string()) };
        let variables = Variables::from([("otp".to_string(), otp.to_string())]);
        self.send_notification(Flow::Otp.request(customer_id, None, recipient, variables)).await
    }

    async fn send_flow(
        &self,
        flow: Flow,
        customer_id: &str,
        reservation_id: &str,
        recipient: Recipient,
        variables: Variables,
    ) -> NotificationResult {
        let request = flow.request(customer_id, Some(reservation_id.to_string()), recipient, variables);
        self.send_notification(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_parsing_accepts_both_spellings() {
        assert_eq!("qr-code".parse::<Flow>().unwrap(), Flow::QrCode);
        assert_eq!("driver_assignment".parse::<Flow>().unwrap(), Flow::DriverAssignment);
        assert!("welcome".parse::<Flow>().is_err());
    }

    #[test]
    fn test_forced_channels() {
        assert_eq!(Flow::BookingConfirmation.forced_channels(), None);
        assert_eq!(
            Flow::QrCode.forced_channels(),
            Some(ChannelSet { email: false, sms: true, whatsapp: true })
        );
        assert_eq!(Flow::Otp.forced_channels(), Some(ChannelSet::only(Channel::Sms)));
    }
}
