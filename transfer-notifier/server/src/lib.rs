mod error;
mod web;

use std::{net::SocketAddr, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use notification::{NotificationConfig, NotificationService};
use sigfinn::{ExitStatus, LifecycleManager, Shutdown};
use snafu::ResultExt;
use transfer_notifier_core::{config::Config, ServerInfo};

pub use self::{
    error::{Error, Result},
    web::{controller, new_router, ApiDoc, ServiceState},
};

/// # Errors
/// Returns errors when server fails to start
pub async fn serve_with_shutdown(config: Config, server_info: ServerInfo) -> Result<()> {
    let Config { web, notification: notification_config } = config;

    let notification_service = Arc::new(initialize_notification_service(&notification_config)?);

    let service_state = ServiceState::new(notification_service);

    let lifecycle_manager = LifecycleManager::<Error>::new();

    let _handle = lifecycle_manager.spawn(
        "Http Server",
        create_web_http_server_future(web.listen_address, service_state, server_info),
    );

    if let Ok(Err(err)) = lifecycle_manager.serve().await {
        tracing::error!("{err}");
        Err(err)
    } else {
        Ok(())
    }
}

#[tracing::instrument(
    skip(config),
    fields(
        default_language = %config.default_language,
        max_retries = config.retry.max_retries
    )
)]
fn initialize_notification_service(config: &NotificationConfig) -> Result<NotificationService> {
    tracing::info!("Initializing notification service");

    let service =
        NotificationService::from_config(config).context(error::InitializeNotificationSnafu)?;

    let status = service.service_status();
    for channel in &status.channels {
        match &channel.default_provider {
            Some(provider) => {
                tracing::info!(channel = %channel.channel, provider = %provider, "Channel ready");
            }
            None => tracing::warn!(channel = %channel.channel, "No provider available"),
        }
    }

    Ok(service)
}

fn create_web_http_server_future(
    listen_address: SocketAddr,
    service_state: ServiceState,
    server_info: ServerInfo,
) -> impl FnOnce(Shutdown) -> BoxFuture<'static, ExitStatus<Error>> {
    move |shutdown_signal| {
        async move {
            tracing::info!("Listen Web HTTP server endpoint on {listen_address}");

            let result =
                web::new_api_server(listen_address, service_state, server_info, shutdown_signal)
                    .await;

            match result {
                Ok(()) => {
                    tracing::info!("HTTP server is shut down gracefully");
                    ExitStatus::Success
                }
                Err(err) => ExitStatus::FatalError(Error::from(err)),
            }
        }
        .boxed()
    }
}
