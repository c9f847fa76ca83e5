use axum::extract::State;
use courier_axum::response::EncapsulatedJson;
use notification::{NotificationRequest, NotificationResult};
use transfer_notifier_core::model::{
    self, FlowRequest, OtpRequest, TransferReminderRequest,
};

use super::Result;
use crate::web::{extractor::ValidatedJson, ServiceState};

/// Send a notification rendered from any registered template
#[utoipa::path(
    post,
    operation_id = "send_notification",
    path = "/api/v1/notifications",
    tag = "Notifications",
    request_body = NotificationRequest,
    responses(
        (status = 200, body = NotificationResult, description = "Per-channel outcome, also when every channel failed"),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn send_notification(
    State(state): State<ServiceState>,
    ValidatedJson(request): ValidatedJson<NotificationRequest>,
) -> Result<EncapsulatedJson<NotificationResult>> {
    model::validate_notification_request(&request)?;
    tracing::info!(
        customer_id = %request.customer_id,
        template = %request.template,
        "Notification requested"
    );
    Ok(EncapsulatedJson::ok(state.notification.send_notification(request).await))
}

#[utoipa::path(
    post,
    operation_id = "send_booking_confirmation",
    path = "/api/v1/notifications/booking-confirmation",
    tag = "Notifications",
    request_body = FlowRequest,
    responses(
        (status = 200, body = NotificationResult),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn booking_confirmation(
    State(state): State<ServiceState>,
    ValidatedJson(request): ValidatedJson<FlowRequest>,
) -> Result<EncapsulatedJson<NotificationResult>> {
    request.validate()?;
    let FlowRequest { customer_id, reservation_id, recipient, variables } = request;
    let result = state
        .notification
        .send_booking_confirmation(&customer_id, &reservation_id, recipient, variables)
        .await;
    Ok(EncapsulatedJson::ok(result))
}

#[utoipa::path(
    post,
    operation_id = "send_payment_success",
    path = "/api/v1/notifications/payment-success",
    tag = "Notifications",
    request_body = FlowRequest,
    responses(
        (status = 200, body = NotificationResult),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn payment_success(
    State(state): State<ServiceState>,
    ValidatedJson(request): ValidatedJson<FlowRequest>,
) -> Result<EncapsulatedJson<NotificationResult>> {
    request.validate()?;
    let FlowRequest { customer_id, reservation_id, recipient, variables } = request;
    let result = state
        .notification
        .send_payment_success(&customer_id, &reservation_id, recipient, variables)
        .await;
    Ok(EncapsulatedJson::ok(result))
}

#[utoipa::path(
    post,
    operation_id = "send_transfer_reminder",
    path = "/api/v1/notifications/transfer-reminder",
    tag = "Notifications",
    request_body = TransferReminderRequest,
    responses(
        (status = 200, body = NotificationResult),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn transfer_reminder(
    State(state): State<ServiceState>,
    ValidatedJson(request): ValidatedJson<TransferReminderRequest>,
) -> Result<EncapsulatedJson<NotificationResult>> {
    request.flow.validate()?;
    let TransferReminderRequest {
        flow: FlowRequest { customer_id, reservation_id, recipient, variables },
        hours,
    } = request;
    let result = state
        .notification
        .send_transfer_reminder(&customer_id, &reservation_id, recipient, variables, hours)
        .await;
    Ok(EncapsulatedJson::ok(result))
}

#[utoipa::path(
    post,
    operation_id = "send_qr_code",
    path = "/api/v1/notifications/qr-code",
    tag = "Notifications",
    request_body = FlowRequest,
    responses(
        (status = 200, body = NotificationResult),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn qr_code(
    State(state): State<ServiceState>,
    ValidatedJson(request): ValidatedJson<FlowRequest>,
) -> Result<EncapsulatedJson<NotificationResult>> {
    request.validate()?;
    let FlowRequest { customer_id, reservation_id, recipient, variables } = request;
    let result =
        state.notification.send_qr_code(&customer_id, &reservation_id, recipient, variables).await;
    Ok(EncapsulatedJson::ok(result))
}

#[utoipa::path(
    post,
    operation_id = "send_driver_assignment",
    path = "/api/v1/notifications/driver-assignment",
    tag = "Notifications",
    request_body = FlowRequest,
    responses(
        (status = 200, body = NotificationResult),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn driver_assignment(
    State(state): State<ServiceState>,
    ValidatedJson(request): ValidatedJson<FlowRequest>,
) -> Result<EncapsulatedJson<NotificationResult>> {
    request.validate()?;
    let FlowRequest { customer_id, reservation_id, recipient, variables } = request;
    let result = state
        .notification
        .send_driver_assignment(&customer_id, &reservation_id, recipient, variables)
        .await;
    Ok(EncapsulatedJson::ok(result))
}

/// Send a one-time password over SMS only
#[utoipa::path(
    post,
    operation_id = "send_otp",
    path = "/api/v1/notifications/otp",
    tag = "Notifications",
    request_body = OtpRequest,
    responses(
        (status = 200, body = NotificationResult),
        (status = 400, description = "Malformed request")
    )
)]
pub async fn otp(
    State(state): State<ServiceState>,
    ValidatedJson(request): ValidatedJson<OtpRequest>,
) -> Result<EncapsulatedJson<NotificationResult>> {
    request.validate()?;
    let result = state.notification.send_otp(&request.customer_id, &request.phone, &request.otp).await;
    Ok(EncapsulatedJson::ok(result))
}
