use std::{
    convert::Infallible,
    fmt::{self, Display, Formatter},
    fs::OpenOptions,
    path::PathBuf,
    str::FromStr,
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tracing_subscriber::{
    fmt::{
        format::{DefaultFields, FmtSpan, Format},
        Layer as FmtLayer, MakeWriter,
    },
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

// SAFETY: Configuration file needs many bools.
#[allow(clippy::struct_excessive_bools)]
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_file_path")]
    pub file_path: Option<PathBuf>,

    #[serde(default = "LogConfig::default_emit_journald")]
    pub emit_journald: bool,

    #[serde(default = "LogConfig::default_emit_stdout")]
    pub emit_stdout: bool,

    #[serde(default = "LogConfig::default_emit_stderr")]
    pub emit_stderr: bool,

    #[serde(default = "LogConfig::default_log_filters")]
    pub log_filters: String,

    #[serde(default = "LogConfig::default_log_formatter")]
    #[serde_as(as = "DisplayFromStr")]
    pub formatter: LogFormatter,

    // Emit span close events with busy/idle timings
    #[serde(default = "LogConfig::default_show_fn_latency")]
    pub show_fn_latency: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: Self::default_file_path(),
            emit_journald: Self::default_emit_journald(),
            emit_stdout: Self::default_emit_stdout(),
            emit_stderr: Self::default_emit_stderr(),
            log_filters: Self::default_log_filters(),
            formatter: Self::default_log_formatter(),
            show_fn_latency: Self::default_show_fn_latency(),
        }
    }
}

impl LogConfig {
    #[inline]
    #[must_use]
    pub fn default_log_filters() -> String {
        "info,notification=info,transfer_notifier_server=info,tower_http=warn".to_string()
    }

    #[inline]
    #[must_use]
    pub const fn default_file_path() -> Option<PathBuf> { None }

    #[inline]
    #[must_use]
    pub const fn default_emit_journald() -> bool { false }

    #[inline]
    #[must_use]
    pub const fn default_emit_stdout() -> bool { true }

    #[inline]
    #[must_use]
    pub const fn default_emit_stderr() -> bool { false }

    #[inline]
    #[must_use]
    pub const fn default_log_formatter() -> LogFormatter { LogFormatter::Pretty }

    #[inline]
    #[must_use]
    pub const fn default_show_fn_latency() -> bool { false }

    /// Install the global subscriber, reporting to stderr when one is already
    /// installed.
    pub fn registry(&self) {
        if let Err(err) = self.try_registry() {
            eprintln!("Could not install log subscriber, error: {err}");
        }
    }

    /// Install the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber has already been set.
    pub fn try_registry(&self) -> Result<(), TryInitError> {
        let filter_layer = EnvFilter::new(self.log_filters.as_str());

        tracing_subscriber::registry().with(self.layers()).with(filter_layer).try_init()
    }

    fn layers(&self) -> Vec<BoxedLayer> {
        let span_events = if self.show_fn_latency { FmtSpan::CLOSE } else { FmtSpan::NONE };

        self.sinks()
            .into_iter()
            .filter_map(|sink| sink.layer(self.formatter.clone(), span_events.clone()))
            .collect()
    }

    fn sinks(&self) -> Vec<LogSink> {
        let mut sinks = Vec::with_capacity(4);
        if self.emit_journald {
            sinks.push(LogSink::Journald);
        }
        if let Some(path) = &self.file_path {
            sinks.push(LogSink::File(path.clone()));
        }
        if self.emit_stdout {
            sinks.push(LogSink::Stdout);
        }
        if self.emit_stderr {
            sinks.push(LogSink::Stderr);
        }
        sinks
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum LogSink {
    Stdout,
    Stderr,
    Journald,
    File(PathBuf),
}

impl LogSink {
    fn layer(self, formatter: LogFormatter, span_events: FmtSpan) -> Option<BoxedLayer> {
        let fmt = tracing_subscriber::fmt::layer()
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_target(true)
            .with_span_events(span_events);

        match self {
            Self::Stdout => Some(formatter.apply(fmt.with_writer(std::io::stdout))),
            Self::Stderr => Some(formatter.apply(fmt.with_writer(std::io::stderr))),
            Self::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path).ok()?;
                Some(formatter.apply(fmt.with_writer(Mutex::new(file))))
            }
            Self::Journald => Some(tracing_journald::layer().ok()?.boxed()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum LogFormatter {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormatter {
    fn apply<W>(&self, fmt: FmtLayer<Registry, DefaultFields, Format, W>) -> BoxedLayer
    where
        W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
    {
        match self {
            Self::Pretty => fmt.pretty().boxed(),
            Self::Compact => fmt.compact().boxed(),
            Self::Json => fmt.json().flatten_event(true).boxed(),
        }
    }
}

impl FromStr for LogFormatter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Ok(Self::Pretty),
        }
    }
}

impl Display for LogFormatter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}
