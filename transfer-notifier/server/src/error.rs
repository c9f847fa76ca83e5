use snafu::Snafu;

use crate::web;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Could not initialize notification service, error: {source}"))]
    InitializeNotification { source: notification::Error },

    #[snafu(display("{source}"))]
    Web { source: web::Error },
}

impl From<web::Error> for Error {
    fn from(source: web::Error) -> Self { Self::Web { source } }
}
