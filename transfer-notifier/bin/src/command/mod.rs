mod notification;
mod server;

use std::future::Future;

use snafu::ResultExt;
use tokio::runtime::Runtime;

pub use self::{
    notification::{print_status, send_flow, verify_providers, SendArgs},
    server::run_server,
};
use crate::error::{self, Result};

fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tracing::debug!("Initializing Tokio runtime");
    Runtime::new().context(error::InitializeTokioRuntimeSnafu)?.block_on(future)
}
