use common::ErrorLocation;

use remote_core::CoreError;

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the node binary.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Error from the node itself (logging, runtime, signals)
    #[error("Node Error: {message} {location}")]
    Node {
        message: String,
        location: ErrorLocation,
    },

    /// The node config could not be loaded
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The remote service failed to start or stop
    #[error("Remote Error: {message} {location}")]
    Remote {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for NodeError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        match error {
            CoreError::Config(e) => NodeError::Config {
                message: e.to_string(),
                location,
            },
            CoreError::Remote(e) => NodeError::Remote {
                message: e.to_string(),
                location,
            },
        }
    }
}
