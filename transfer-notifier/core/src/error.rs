use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_axum::{json_response, response};
use indexmap::IndexMap;
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Field `{field}` must not be blank"))]
    BlankField { field: &'static str },

    #[snafu(display("Limit must be between 1 and {max}, got {limit}"))]
    InvalidLimit { limit: usize, max: usize },
}

impl IntoResponse for Error {
    // SAFETY: allow: high cognitive complexity caused by `tracing` macro
    #[allow(clippy::cognitive_complexity)]
    fn into_response(self) -> Response {
        match self {
            Self::BlankField { .. } | Self::InvalidLimit { .. } => json_response! {
                reason: self,
                status: StatusCode::BAD_REQUEST,
                error: response::Error {
                    type_: response::ErrorType::BadRequest,
                    message: self.to_string(),
                    additional_fields: IndexMap::default(),
                }
            },
        }
    }
}
