//! Error classification, exponential-backoff retry and timeout racing.

use std::{
    fmt::{self, Display, Formatter},
    future::Future,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Coarse failure category that decides whether an operation is retried.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    PermissionDenied,
    InvalidArgument,
    NotFound,
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
    Unauthenticated,
    Unknown,
}

impl ErrorClass {
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::PermissionDenied | Self::InvalidArgument | Self::NotFound)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Unavailable => "unavailable",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Unauthenticated => "unauthenticated",
            Self::Unknown => "unknown",
        }
    }

    /// Customer-facing explanation. Languages other than `tr` fall back to
    /// English.
    #[must_use]
    pub fn user_message(self, language: &str) -> &'static str {
        let turkish = language.eq_ignore_ascii_case("tr");
        match (self, turkish) {
            (Self::PermissionDenied, true) => "Bu işlem için yetkiniz bulunmuyor.",
            (Self::PermissionDenied, false) => "You do not have permission for this operation.",
            (Self::InvalidArgument, true) => "Gönderilen bilgiler geçersiz.",
            (Self::InvalidArgument, false) => "The submitted information is invalid.",
            (Self::NotFound, true) => "İstenen kayıt bulunamadı.",
            (Self::NotFound, false) => "The requested resource was not found.",
            (Self::Unavailable, true) => "Servis şu anda kullanılamıyor, lütfen daha sonra tekrar deneyin.",
            (Self::Unavailable, false) => "The service is currently unavailable, please try again later.",
            (Self::DeadlineExceeded, true) => "İşlem zaman aşımına uğradı.",
            (Self::DeadlineExceeded, false) => "The operation timed out.",
            (Self::ResourceExhausted, true) => "Gönderim limiti aşıldı, lütfen daha sonra tekrar deneyin.",
            (Self::ResourceExhausted, false) => "Sending limit reached, please try again later.",
            (Self::Unauthenticated, true) => "Kimlik doğrulama başarısız oldu.",
            (Self::Unauthenticated, false) => "Authentication failed.",
            (Self::Unknown, true) => "Beklenmeyen bir hata oluştu.",
            (Self::Unknown, false) => "An unexpected error occurred.",
        }
    }
}

impl Display for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Errors that know their [`ErrorClass`].
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetryOptions {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    /// Language of the user-facing message attached to a final failure.
    pub language: String,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(10_000),
            language: "tr".to_string(),
        }
    }
}

impl RetryOptions {
    /// Options that invoke the operation exactly once.
    #[must_use]
    pub fn no_retry() -> Self { Self { max_retries: 0, ..Self::default() } }

    /// Delay before re-attempt `attempt` (0-based): `base * factor^attempt`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if secs.is_finite() && secs >= 0.0 && secs < self.max_delay.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }
}

/// Final failure of [`with_retry`].
#[derive(Debug)]
pub struct RetryError<E> {
    pub context: String,
    pub attempts: u32,
    pub class: ErrorClass,
    pub user_message: &'static str,
    pub source: E,
}

impl<E> RetryError<E> {
    #[must_use]
    pub fn into_source(self) -> E { self.source }
}

impl<E: Display> Display for RetryError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s) ({}): {}",
            self.context, self.attempts, self.class, self.source
        )
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { Some(&self.source) }
}

/// Run `operation` until it succeeds, fails with a non-retryable class, or has
/// been invoked `max_retries + 1` times.
///
/// # Errors
///
/// Returns the last error, wrapped with a localized message.
pub async fn with_retry<T, E, F, Fut>(
    mut operation: F,
    options: &RetryOptions,
    context: &str,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let class = err.class();
                if !class.is_retryable() || attempt >= options.max_retries {
                    tracing::debug!(
                        context,
                        attempts = attempt + 1,
                        class = %class,
                        "Giving up: {err}"
                    );
                    return Err(RetryError {
                        context: context.to_string(),
                        attempts: attempt + 1,
                        class,
                        user_message: class.user_message(&options.language),
                        source: err,
                    });
                }

                let delay = options.delay_for(attempt);
                tracing::debug!(
                    context,
                    class = %class,
                    "Attempt {}/{} failed, retrying in {delay:?}: {err}",
                    attempt + 1,
                    options.max_retries + 1
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Snafu)]
#[snafu(display("Operation timed out after {}ms", timeout.as_millis()))]
pub struct Elapsed {
    pub timeout: Duration,
}

impl Classify for Elapsed {
    fn class(&self) -> ErrorClass { ErrorClass::DeadlineExceeded }
}

/// Race `future` against a timer. The future is dropped when the timer wins.
///
/// # Errors
///
/// Returns [`Elapsed`] if `timeout` passes first.
pub async fn with_timeout<F: Future>(future: F, timeout: Duration) -> Result<F::Output, Elapsed> {
    tokio::time::timeout(timeout, future).await.map_err(|_| Elapsed { timeout })
}
