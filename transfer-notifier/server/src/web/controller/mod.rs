// FIXME: remove this after this utoipa issue is fixed: https://github.com/juhaku/utoipa/pull/1423
#![allow(clippy::needless_for_each)]
mod error;
mod notification;
mod preference;
mod status;

use axum::{routing, Extension, Router};
use courier_axum::response::EncapsulatedJson;
use transfer_notifier_core::ServerInfo;
use utoipa::OpenApi;

pub use self::error::{Error, Result};
use crate::ServiceState;

pub fn api_v1_router(service_state: &ServiceState) -> Router {
    let notification_routes = Router::new()
        .route("/v1/notifications", routing::post(notification::send_notification))
        .route(
            "/v1/notifications/booking-confirmation",
            routing::post(notification::booking_confirmation),
        )
        .route("/v1/notifications/payment-success", routing::post(notification::payment_success))
        .route(
            "/v1/notifications/transfer-reminder",
            routing::post(notification::transfer_reminder),
        )
        .route("/v1/notifications/qr-code", routing::post(notification::qr_code))
        .route(
            "/v1/notifications/driver-assignment",
            routing::post(notification::driver_assignment),
        )
        .route("/v1/notifications/otp", routing::post(notification::otp));

    let preference_routes = Router::new()
        .route(
            "/v1/customers/:customer_id/preferences",
            routing::get(preference::get_preferences)
                .put(preference::set_preferences)
                .delete(preference::delete_preferences),
        )
        .route("/v1/customers/:customer_id/opt-out", routing::post(preference::opt_out))
        .route("/v1/customers/:customer_id/opt-in", routing::post(preference::opt_in));

    let status_routes = Router::new()
        .route("/v1/info", routing::get(server_info))
        .route("/v1/status", routing::get(status::service_status))
        .route("/v1/status/verify", routing::post(status::verify_services))
        .route("/v1/dispatches", routing::get(status::recent_dispatches));

    Router::new()
        .nest("/api", notification_routes)
        .nest("/api", preference_routes)
        .nest("/api", status_routes)
        .with_state(service_state.clone())
}

/// Get server info
#[utoipa::path(
    get,
    operation_id = "get_server_info",
    path = "/api/v1/info",
    tag = "Status",
    responses(
        (status = 200, body = ServerInfo)
    )
)]
pub async fn server_info(
    Extension(server_info): Extension<ServerInfo>,
) -> Result<EncapsulatedJson<ServerInfo>> {
    Ok(EncapsulatedJson::ok(server_info))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        server_info,
        notification::send_notification,
        notification::booking_confirmation,
        notification::payment_success,
        notification::transfer_reminder,
        notification::qr_code,
        notification::driver_assignment,
        notification::otp,
        preference::get_preferences,
        preference::set_preferences,
        preference::delete_preferences,
        preference::opt_out,
        preference::opt_in,
        status::service_status,
        status::verify_services,
        status::recent_dispatches,
    ),
    components(schemas(
        ServerInfo,
        transfer_notifier_core::model::FlowRequest,
        transfer_notifier_core::model::TransferReminderRequest,
        transfer_notifier_core::model::OtpRequest,
        ::notification::NotificationRequest,
        ::notification::NotificationResult,
        ::notification::Recipient,
        ::notification::Delivery,
        ::notification::Channel,
        ::notification::ChannelSet,
        ::notification::provider::SendResult,
        ::notification::retry::ErrorClass,
        ::notification::preference::CustomerPreferences,
        ::notification::preference::PreferencesUpdate,
        ::notification::preference::Frequency,
        ::notification::orchestrator::ServiceStatus,
        ::notification::orchestrator::ServiceVerification,
        ::notification::channel::ChannelStatus,
        ::notification::channel::ProviderCheck,
        ::notification::channel::ProviderStatus,
        ::notification::provider::Quota,
        ::notification::dispatch::DispatchRecord,
    )),
    tags(
        (name = "Notifications", description = "Booking flow notifications"),
        (name = "Preferences", description = "Customer channel preferences and opt-out"),
        (name = "Status", description = "Provider health and dispatch history")
    )
)]
pub struct ApiDoc;
