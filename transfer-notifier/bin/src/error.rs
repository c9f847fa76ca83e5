use snafu::Snafu;

use crate::config;

/// Result type alias for the CLI.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for the CLI.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Application { source: transfer_notifier_server::Error },

    #[snafu(display("Could not initialize tokio runtime, error: {source}"))]
    InitializeTokioRuntime { source: tokio::io::Error },

    #[snafu(display("{source}"))]
    Config { source: config::Error },

    #[snafu(display("Could not initialize notification service, error: {source}"))]
    InitializeNotification { source: notification::Error },

    #[snafu(display("Could not serialize output, error: {source}"))]
    SerializeOutput { source: serde_json::Error },

    #[snafu(display("Could not write to stdout, error: {source}"))]
    WriteOutput { source: std::io::Error },

    #[snafu(display("Flow `{flow}` was not delivered on any channel: {errors}"))]
    NotDelivered { flow: notification::Flow, errors: String },

    #[snafu(display("At least one channel has no verified provider"))]
    Unverified,
}

impl From<config::Error> for Error {
    fn from(source: config::Error) -> Self { Self::Config { source } }
}

impl From<transfer_notifier_server::Error> for Error {
    fn from(source: transfer_notifier_server::Error) -> Self { Self::Application { source } }
}

pub trait CommandError {
    fn exit_code(&self) -> exitcode::ExitCode;
}

impl CommandError for Error {
    fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            Self::Application { .. } | Self::SerializeOutput { .. } => exitcode::SOFTWARE,
            Self::Config { .. } | Self::InitializeNotification { .. } => exitcode::CONFIG,
            Self::InitializeTokioRuntime { .. } | Self::WriteOutput { .. } => exitcode::IOERR,
            Self::NotDelivered { .. } => exitcode::DATAERR,
            Self::Unverified => exitcode::UNAVAILABLE,
        }
    }
}
