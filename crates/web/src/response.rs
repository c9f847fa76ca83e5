use std::fmt::Debug;

use axum::{
    body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EncapsulatedJson<T, M = ()> {
    #[serde(rename = "_status", with = "http_serde::status_code")]
    status_code: StatusCode,

    #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
    metadata: Option<M>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T, M> EncapsulatedJson<T, M> {
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn ok(data: T) -> Self {
        Self { status_code: StatusCode::OK, metadata: None, data: Some(data) }
    }

    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self { status_code: StatusCode::OK, metadata: None, data: None }
    }

    #[inline]
    #[must_use]
    pub const fn status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn metadata(mut self, metadata: M) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn data(self) -> Option<T> { self.data }

    #[inline]
    #[must_use]
    pub const fn status(&self) -> StatusCode { self.status_code }
}

impl<T> From<(StatusCode, T)> for EncapsulatedJson<T, ()> {
    #[inline]
    fn from((status_code, data): (StatusCode, T)) -> Self {
        Self { status_code, metadata: None, data: Some(data) }
    }
}

impl<T, M> IntoResponse for EncapsulatedJson<T, M>
where
    T: Serialize,
    M: Serialize,
{
    fn into_response(self) -> Response { json_body(self.status_code, &self) }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EncapsulatedJsonError<E = Error, M = ()> {
    #[serde(rename = "_status", with = "http_serde::status_code")]
    status_code: StatusCode,

    #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
    metadata: Option<M>,

    #[serde(default)]
    error: Option<E>,
}

impl<E, M> EncapsulatedJsonError<E, M> {
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn err(error: E) -> Self {
        Self { status_code: StatusCode::INTERNAL_SERVER_ERROR, metadata: None, error: Some(error) }
    }

    #[inline]
    #[must_use]
    pub const fn status_code(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn metadata(mut self, metadata: M) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn error(self) -> Option<E> { self.error }
}

impl<E, M> IntoResponse for EncapsulatedJsonError<E, M>
where
    E: Debug + Serialize,
    M: Serialize,
{
    fn into_response(self) -> Response { json_body(self.status_code, &self) }
}

fn json_body<B: Serialize>(status_code: StatusCode, envelope: &B) -> Response {
    let body = body::Body::from(serde_json::to_vec(envelope).expect("envelope is serializable"));

    Response::builder()
        .status(status_code)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(body)
        .expect("Build `Axum` response successfully; qed")
}

#[doc(hidden)]
pub fn into_response<R: IntoResponse>(response: R) -> Response { response.into_response() }

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Error {
    #[serde(rename = "type")]
    pub type_: ErrorType,

    pub message: String,

    #[serde(flatten, skip_serializing_if = "IndexMap::is_empty")]
    pub additional_fields: IndexMap<String, serde_json::Value>,
}

impl Error {
    #[must_use]
    pub fn new(type_: ErrorType, message: impl Into<String>) -> Self {
        Self { type_, message: message.into(), additional_fields: IndexMap::new() }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        drop(self.additional_fields.insert(key.into(), value));
        self
    }
}

#[macro_export]
macro_rules! json_response {
    (status: $status:expr,data: $data:expr) => {
        $crate::response::into_response(
            $crate::response::EncapsulatedJson::<_>::ok($data).status_code($status),
        )
    };

    (status: $status:expr,error: $error:expr) => {
        $crate::response::into_response(
            $crate::response::EncapsulatedJsonError::<_>::err($error).status_code($status),
        )
    };

    (reason: $reason:expr,status: $status:expr,error: $error:expr) => {{
        let status = $status;
        if status.is_server_error() {
            tracing::error!(status_code = status.as_u16(), "Internal Server Error: {:?}", $reason);
        } else {
            tracing::warn!(status_code = status.as_u16(), "Response Error: {:?}", $reason);
        }

        $crate::json_response! { status: status, error: $error }
    }};
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    Internal,
    NotFound,
    BadRequest,
    Conflict,
}
