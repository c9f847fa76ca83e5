use snafu::Snafu;

use crate::{
    channel::Channel,
    retry::{Classify, ErrorClass},
};

#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    #[snafu(display("Provider `{provider}` is not configured"))]
    Unavailable { provider: String },

    #[snafu(display("No {channel} provider is available"))]
    NoProvider { channel: Channel },

    #[snafu(display("Provider `{provider}` rejected destination `{destination}`: {reason}"))]
    InvalidDestination { provider: String, destination: String, reason: String },

    #[snafu(display("Provider `{provider}` could not build the message: {reason}"))]
    InvalidContent { provider: String, reason: String },

    #[snafu(display("Provider `{provider}` rejected the message: {reason}"))]
    Rejected { provider: String, reason: String },

    #[snafu(display("Provider `{provider}` is unreachable: {reason}"))]
    Transport { provider: String, reason: String },

    #[snafu(display("Provider `{provider}` timed out after {timeout_ms}ms"))]
    Timeout { provider: String, timeout_ms: u64 },

    #[snafu(display("Provider `{provider}` has exhausted its quota"))]
    QuotaExceeded { provider: String },

    #[snafu(display("Provider `{provider}` refused the credentials: {reason}"))]
    Unauthorized { provider: String, reason: String },
}

impl ProviderError {
    /// Name of the provider that produced the error, if any.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::NoProvider { .. } => None,
            Self::Unavailable { provider }
            | Self::InvalidDestination { provider, .. }
            | Self::InvalidContent { provider, .. }
            | Self::Rejected { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::QuotaExceeded { provider }
            | Self::Unauthorized { provider, .. } => Some(provider),
        }
    }
}

impl Classify for ProviderError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::NoProvider { .. } => ErrorClass::NotFound,
            Self::InvalidDestination { .. } | Self::InvalidContent { .. } => {
                ErrorClass::InvalidArgument
            }
            Self::Unavailable { .. } | Self::Rejected { .. } => ErrorClass::PermissionDenied,
            Self::Transport { .. } => ErrorClass::Unavailable,
            Self::Timeout { .. } => ErrorClass::DeadlineExceeded,
            Self::QuotaExceeded { .. } => ErrorClass::ResourceExhausted,
            Self::Unauthorized { .. } => ErrorClass::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_not_retryable() {
        let err = InvalidDestinationSnafu {
            provider: "twilio",
            destination: "123",
            reason: "not E.164",
        }
        .build();

        assert!(!err.class().is_retryable());
        assert_eq!(err.provider(), Some("twilio"));
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let err = TransportSnafu { provider: "netgsm", reason: "connection reset" }.build();

        assert_eq!(err.class(), ErrorClass::Unavailable);
        assert!(err.class().is_retryable());
    }

    #[test]
    fn test_no_provider_is_not_found() {
        let err = NoProviderSnafu { channel: Channel::WhatsApp }.build();

        assert_eq!(err.class(), ErrorClass::NotFound);
        assert_eq!(err.to_string(), "No whatsapp provider is available");
    }
}
