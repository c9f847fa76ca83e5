use std::process;

use chrono::Utc;
use transfer_notifier_core::{ServerInfo, PROGRAM_NAME};

use crate::{
    config::Config,
    error::{Error, Result},
    shadow::{BRANCH, PKG_VERSION, SHORT_COMMIT},
};

/// Run the server
#[allow(clippy::cognitive_complexity)]
pub fn run_server(config: Config) -> Result<()> {
    config.log.registry();

    let server_info = ServerInfo {
        version: PKG_VERSION.to_string(),
        commit_hash: SHORT_COMMIT.to_string(),
        branch: BRANCH.to_string(),
        default_language: config.notification.default_language.clone(),
        start_time: Utc::now(),
    };

    tracing::info!("{PROGRAM_NAME} is initializing, pid: {}", process::id());
    tracing::info!("Server info: {server_info:?}");

    let exit_status = super::block_on(async move {
        transfer_notifier_server::serve_with_shutdown(config.into(), server_info)
            .await
            .map_err(Error::from)
    });

    if let Err(ref error) = exit_status {
        tracing::error!(%error);
    }

    tracing::info!("{PROGRAM_NAME} is shutdown");
    exit_status
}
