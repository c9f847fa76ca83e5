// API inputs that are not library types. EX: BookingNotificationRequest,
// OtpRequest....

use notification::{NotificationRequest, Recipient, Variables};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use utoipa::{IntoParams, ToSchema};

use crate::error::{self, Error};

pub const DEFAULT_DISPATCH_LIMIT: usize = 50;
pub const MAX_DISPATCH_LIMIT: usize = 1000;

/// Body shared by the booking, payment, QR code and driver flows.
#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowRequest {
    pub customer_id: String,
    pub reservation_id: String,
    #[serde(default)]
    pub recipient: Recipient,
    #[serde(default)]
    pub variables: Variables,
}

impl FlowRequest {
    /// # Errors
    ///
    /// Returns an error if an identifier is blank.
    pub fn validate(&self) -> Result<(), Error> {
        ensure!(!self.customer_id.trim().is_empty(), error::BlankFieldSnafu { field: "customerId" });
        ensure!(
            !self.reservation_id.trim().is_empty(),
            error::BlankFieldSnafu { field: "reservationId" }
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferReminderRequest {
    #[serde(flatten)]
    pub flow: FlowRequest,
    /// Hours left until pickup.
    pub hours: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    pub customer_id: String,
    pub phone: String,
    pub otp: String,
}

impl OtpRequest {
    /// # Errors
    ///
    /// Returns an error if a field is blank.
    pub fn validate(&self) -> Result<(), Error> {
        ensure!(!self.customer_id.trim().is_empty(), error::BlankFieldSnafu { field: "customerId" });
        ensure!(!self.phone.trim().is_empty(), error::BlankFieldSnafu { field: "phone" });
        ensure!(!self.otp.trim().is_empty(), error::BlankFieldSnafu { field: "otp" });
        Ok(())
    }
}

/// Check a free-form request before dispatch.
///
/// # Errors
///
/// Returns an error if the customer or template is blank.
pub fn validate_notification_request(request: &NotificationRequest) -> Result<(), Error> {
    ensure!(!request.customer_id.trim().is_empty(), error::BlankFieldSnafu { field: "customerId" });
    ensure!(!request.template.trim().is_empty(), error::BlankFieldSnafu { field: "template" });
    Ok(())
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DispatchQuery {
    /// Number of records, newest first. Defaults to 50.
    pub limit: Option<usize>,
}

impl DispatchQuery {
    /// # Errors
    ///
    /// Returns an error if `limit` is zero or above the maximum.
    pub fn limit(&self) -> Result<usize, Error> {
        let limit = self.limit.unwrap_or(DEFAULT_DISPATCH_LIMIT);
        ensure!(
            (1..=MAX_DISPATCH_LIMIT).contains(&limit),
            error::InvalidLimitSnafu { limit, max: MAX_DISPATCH_LIMIT }
        );
        Ok(limit)
    }
}
