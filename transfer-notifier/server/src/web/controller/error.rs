use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_axum::{json_response, response};
use indexmap::IndexMap;
use notification::preference::PreferenceError;
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Notification { source: notification::Error },

    #[snafu(display("{source}"))]
    Model { source: transfer_notifier_core::error::Error },

    #[snafu(display("Malformed request: {message}"))]
    MalformedRequest { message: String },

    #[snafu(display("No preferences stored for customer `{customer_id}`"))]
    PreferencesNotFound { customer_id: String },
}

impl From<notification::Error> for Error {
    fn from(source: notification::Error) -> Self { Self::Notification { source } }
}

impl From<transfer_notifier_core::error::Error> for Error {
    fn from(source: transfer_notifier_core::error::Error) -> Self { Self::Model { source } }
}

impl IntoResponse for Error {
    // SAFETY: allow: high cognitive complexity caused by `tracing` macro
    #[allow(clippy::cognitive_complexity)]
    fn into_response(self) -> Response {
        match self {
            Self::Model { source } => source.into_response(),
            Self::Notification {
                source: notification::Error::Preference { source: PreferenceError::VersionConflict { .. } },
            } => json_response! {
                reason: self,
                status: StatusCode::CONFLICT,
                error: response::Error {
                    type_: response::ErrorType::Conflict,
                    message: self.to_string(),
                    additional_fields: IndexMap::default(),
                }
            },
            Self::MalformedRequest { .. } => json_response! {
                reason: self,
                status: StatusCode::BAD_REQUEST,
                error: response::Error {
                    type_: response::ErrorType::BadRequest,
                    message: self.to_string(),
                    additional_fields: IndexMap::default(),
                }
            },
            Self::PreferencesNotFound { .. } => json_response! {
                reason: self,
                status: StatusCode::NOT_FOUND,
                error: response::Error {
                    type_: response::ErrorType::NotFound,
                    message: self.to_string(),
                    additional_fields: IndexMap::default(),
                }
            },
            Self::Notification { .. } => json_response! {
                reason: self,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: response::Error {
                    type_: response::ErrorType::Internal,
                    message: self.to_string(),
                    additional_fields: IndexMap::default(),
                }
            },
        }
    }
}
