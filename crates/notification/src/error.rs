use snafu::Snafu;

use crate::preference::PreferenceError;

/// Errors raised while assembling the notification engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A configured sender address is not a valid mailbox.
    #[snafu(display("Provider `{provider}` has an invalid sender address `{address}`: {source}"))]
    InvalidSenderAddress {
        provider: &'static str,
        address: String,
        source: lettre::address::AddressError,
    },

    /// Retry options cannot produce a usable backoff.
    #[snafu(display("Invalid retry policy: {reason}"))]
    InvalidRetryPolicy { reason: String },

    /// A configured template breaks the `{name}_{locale}` id convention.
    #[snafu(display("Template `{template_id}` must end with `_{locale}`"))]
    InvalidTemplateId { template_id: String, locale: String },

    /// The preference repository failed.
    #[snafu(display("{source}"))]
    Preference { source: PreferenceError },
}
