use axum::extract::{Path, State};
use courier_axum::response::EncapsulatedJson;
use notification::preference::{CustomerPreferences, PreferencesUpdate};
use snafu::ensure;

use super::{error, Result};
use crate::web::{extractor::ValidatedJson, ServiceState};

/// Stored preferences, or the defaults for an unknown customer
#[utoipa::path(
    get,
    operation_id = "get_customer_preferences",
    path = "/api/v1/customers/{customer_id}/preferences",
    tag = "Preferences",
    params(("customer_id" = String, Path, description = "Customer identifier")),
    responses(
        (status = 200, body = CustomerPreferences),
        (status = 500, description = "Preference backend failure")
    )
)]
pub async fn get_preferences(
    State(state): State<ServiceState>,
    Path(customer_id): Path<String>,
) -> Result<EncapsulatedJson<CustomerPreferences>> {
    let preferences = state.notification.get_customer_preferences(&customer_id).await?;
    Ok(EncapsulatedJson::ok(preferences))
}

/// Merge the given fields into the stored preferences
#[utoipa::path(
    put,
    operation_id = "set_customer_preferences",
    path = "/api/v1/customers/{customer_id}/preferences",
    tag = "Preferences",
    params(("customer_id" = String, Path, description = "Customer identifier")),
    request_body = PreferencesUpdate,
    responses(
        (status = 200, body = CustomerPreferences),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "Concurrent update won")
    )
)]
pub async fn set_preferences(
    State(state): State<ServiceState>,
    Path(customer_id): Path<String>,
    ValidatedJson(update): ValidatedJson<PreferencesUpdate>,
) -> Result<EncapsulatedJson<CustomerPreferences>> {
    let preferences = state.notification.set_customer_preferences(&customer_id, &update).await?;
    tracing::info!(customer_id = %customer_id, version = preferences.version, "Preferences updated");
    Ok(EncapsulatedJson::ok(preferences))
}

#[utoipa::path(
    delete,
    operation_id = "delete_customer_preferences",
    path = "/api/v1/customers/{customer_id}/preferences",
    tag = "Preferences",
    params(("customer_id" = String, Path, description = "Customer identifier")),
    responses(
        (status = 200, description = "Preferences removed"),
        (status = 404, description = "Nothing stored for the customer")
    )
)]
pub async fn delete_preferences(
    State(state): State<ServiceState>,
    Path(customer_id): Path<String>,
) -> Result<EncapsulatedJson<()>> {
    let deleted = state.notification.delete_customer_preferences(&customer_id).await?;
    ensure!(deleted, error::PreferencesNotFoundSnafu { customer_id });
    Ok(EncapsulatedJson::empty())
}

/// Stop every notification to the customer
#[utoipa::path(
    post,
    operation_id = "opt_out_customer",
    path = "/api/v1/customers/{customer_id}/opt-out",
    tag = "Preferences",
    params(("customer_id" = String, Path, description = "Customer identifier")),
    responses((status = 200, body = CustomerPreferences))
)]
pub async fn opt_out(
    State(state): State<ServiceState>,
    Path(customer_id): Path<String>,
) -> Result<EncapsulatedJson<CustomerPreferences>> {
    let preferences = state.notification.opt_out_customer(&customer_id).await?;
    Ok(EncapsulatedJson::ok(preferences))
}

#[utoipa::path(
    post,
    operation_id = "opt_in_customer",
    path = "/api/v1/customers/{customer_id}/opt-in",
    tag = "Preferences",
    params(("customer_id" = String, Path, description = "Customer identifier")),
    responses((status = 200, body = CustomerPreferences))
)]
pub async fn opt_in(
    State(state): State<ServiceState>,
    Path(customer_id): Path<String>,
) -> Result<EncapsulatedJson<CustomerPreferences>> {
    let preferences = state.notification.opt_in_customer(&customer_id).await?;
    Ok(EncapsulatedJson::ok(preferences))
}
