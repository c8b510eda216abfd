pub mod config;
pub mod remote;

pub use config::ConfigError;
pub use remote::RemoteError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Remote(#[from] remote::RemoteError),
}
