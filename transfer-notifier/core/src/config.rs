use std::net::SocketAddr;

use notification::NotificationConfig;

#[derive(Clone, Debug)]
pub struct Config {
    pub web: WebConfig,

    pub notification: NotificationConfig,
}

#[derive(Clone, Debug)]
pub struct WebConfig {
    pub listen_address: SocketAddr,
}
