mod error;
mod web;

use std::path::{Path, PathBuf};

use courier_cli_common::config::LogConfig;
use notification::NotificationConfig;
use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

pub use self::{error::Error, web::WebConfig};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub web: WebConfig,

    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Config {
    #[inline]
    pub fn default_path() -> PathBuf {
        [
            transfer_notifier_core::PROJECT_CONFIG_DIR.to_path_buf(),
            PathBuf::from(transfer_notifier_core::CONFIG_NAME),
        ]
        .into_iter()
        .collect()
    }

    /// Search the default path, then the fallback directories.
    pub fn search_path() -> PathBuf {
        let default_path = Self::default_path();
        if default_path.exists() {
            return default_path;
        }
        transfer_notifier_core::fallback_project_config_directories()
            .into_iter()
            .map(|dir| dir.join(transfer_notifier_core::CONFIG_NAME))
            .find(|path| path.exists())
            .unwrap_or(default_path)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let data = std::fs::read_to_string(&path)
            .context(error::OpenConfigSnafu { filename: path.as_ref().to_path_buf() })?;
        Self::parse(&data, path.as_ref())
    }

    fn parse(data: &str, path: &Path) -> Result<Self, Error> {
        let mut config: Self = serde_yaml::from_str(data)
            .context(error::ParseConfigSnafu { filename: path.to_path_buf() })?;

        config.log.file_path = match config.log.file_path.map(|path| {
            path.try_resolve()
                .map(|path| path.to_path_buf())
                .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
        }) {
            Some(Ok(path)) => Some(path),
            Some(Err(err)) => return Err(err),
            None => None,
        };

        Ok(config)
    }
}

impl From<Config> for transfer_notifier_core::config::Config {
    fn from(Config { web, notification, .. }: Config) -> Self {
        Self { web: web.into(), notification }
    }
}
