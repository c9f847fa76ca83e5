pub mod controller;
pub mod error;
pub mod extractor;

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{extract::Request, http, routing, Extension, Json, Router, ServiceExt};
use courier_axum::json_response;
use notification::NotificationService;
use snafu::ResultExt;
use tokio::net::TcpListener;
use tower::{Layer, ServiceBuilder};
use tower_http::{
    compression::CompressionLayer, normalize_path::NormalizePathLayer, trace::TraceLayer,
};
use transfer_notifier_core::ServerInfo;
use utoipa::OpenApi;

pub use self::{controller::ApiDoc, error::Error};

pub async fn new_api_server<ShutdownSignal>(
    socket_address: SocketAddr,
    service_state: ServiceState,
    server_info: ServerInfo,
    shutdown_signal: ShutdownSignal,
) -> Result<(), Error>
where
    ShutdownSignal: Future<Output = ()> + Send + 'static,
{
    let middleware_stack =
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CompressionLayer::new());

    let router = {
        let router = new_router(&service_state, server_info).layer(middleware_stack);
        let router = NormalizePathLayer::trim_trailing_slash().layer(router);
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(router)
    };

    let listener = TcpListener::bind(&socket_address).await.context(error::BindTcpServerSnafu)?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|err| Error::ServeHttpServer { message: err.to_string() })
}

/// All routes, without transport middleware.
pub fn new_router(service_state: &ServiceState, server_info: ServerInfo) -> Router {
    Router::new()
        // For load balancer default health check
        .route("/", routing::get(controller::server_info))
        .route("/openapi.json", routing::get(openapi_json))
        .merge(controller::api_v1_router(service_state))
        .layer(Extension(server_info))
        .fallback(fallback)
}

// SAFETY: `axum` handler must be async
#[allow(clippy::unused_async)]
async fn fallback(uri: http::Uri) -> axum::response::Response {
    json_response! {
        status: http::StatusCode::NOT_FOUND,
        error: courier_axum::response::Error {
            type_: courier_axum::response::ErrorType::NotFound,
            message: format!("No route for {uri}"),
            additional_fields: indexmap::IndexMap::default(),
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> { Json(ApiDoc::openapi()) }

#[derive(Clone)]
pub struct ServiceState {
    pub notification: Arc<NotificationService>,
}

impl ServiceState {
    /// Create a new service state
    #[must_use]
    pub const fn new(notification: Arc<NotificationService>) -> Self { Self { notification } }
}
