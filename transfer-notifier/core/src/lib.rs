pub mod config;
pub mod error;
pub mod model;

use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
    sync::LazyLock,
};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const PROJECT_NAME: &str = "transfer-notifier";
pub const PROJECT_NAME_WITH_INITIAL_CAPITAL: &str = "Transfer Notifier";

pub const PROGRAM_NAME: &str = "transfer-notifier";
pub const CONFIG_NAME: &str = "transfer-notifier.yaml";

pub const DEFAULT_WEB_PORT: u16 = 14480;
pub const DEFAULT_WEB_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub static PROJECT_CONFIG_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    ProjectDirs::from("", PROJECT_NAME, PROJECT_NAME)
        .expect("Creating `ProjectDirs` should always success")
        .config_dir()
        .to_path_buf()
});

#[must_use]
pub fn fallback_project_config_directories() -> Vec<PathBuf> {
    let Some(user_dirs) = directories::UserDirs::new() else {
        return Vec::new();
    };
    vec![
        [user_dirs.home_dir(), (Path::new(".config")), (Path::new(PROJECT_NAME))].iter().collect(),
        [user_dirs.home_dir(), (Path::new(&format!(".{PROJECT_NAME}")))].iter().collect(),
        [&Path::new("/"), &Path::new("etc"), &Path::new(PROJECT_NAME)].iter().collect(),
    ]
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub version: String,
    pub branch: String,
    pub commit_hash: String,
    pub default_language: String,
    pub start_time: DateTime<Utc>,
}
