use axum::extract::State;
use courier_axum::response::EncapsulatedJson;
use notification::{
    dispatch::DispatchRecord,
    orchestrator::{ServiceStatus, ServiceVerification},
};
use transfer_notifier_core::model::DispatchQuery;

use super::Result;
use crate::web::{extractor::ValidatedQuery, ServiceState};

/// Providers currently selected per channel
#[utoipa::path(
    get,
    operation_id = "get_service_status",
    path = "/api/v1/status",
    tag = "Status",
    responses((status = 200, body = ServiceStatus))
)]
// SAFETY: `axum` handler must be async
#[allow(clippy::unused_async)]
pub async fn service_status(
    State(state): State<ServiceState>,
) -> Result<EncapsulatedJson<ServiceStatus>> {
    Ok(EncapsulatedJson::ok(state.notification.service_status()))
}

/// Probe every configured provider
#[utoipa::path(
    post,
    operation_id = "verify_services",
    path = "/api/v1/status/verify",
    tag = "Status",
    responses((status = 200, body = ServiceVerification))
)]
pub async fn verify_services(
    State(state): State<ServiceState>,
) -> Result<EncapsulatedJson<ServiceVerification>> {
    let verification = state.notification.verify_all_services().await;
    if !verification.all_channels_verified {
        tracing::warn!("At least one channel has no verified provider");
    }
    Ok(EncapsulatedJson::ok(verification))
}

/// Most recent provider attempts, newest first
#[utoipa::path(
    get,
    operation_id = "list_dispatches",
    path = "/api/v1/dispatches",
    tag = "Status",
    params(DispatchQuery),
    responses(
        (status = 200, body = Vec<DispatchRecord>),
        (status = 400, description = "Limit out of range")
    )
)]
pub async fn recent_dispatches(
    State(state): State<ServiceState>,
    ValidatedQuery(query): ValidatedQuery<DispatchQuery>,
) -> Result<EncapsulatedJson<Vec<DispatchRecord>>> {
    let limit = query.limit()?;
    Ok(EncapsulatedJson::ok(state.notification.recent_dispatches(limit)))
}
