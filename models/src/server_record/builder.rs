use crate::error::model_error::ModelError;
use crate::server_record::ServerRecord;

use common::ErrorLocation;

use std::panic::Location;

/// Builder for creating validated ServerRecord instances.
#[derive(Debug, Default)]
pub struct ServerRecordBuilder {
    id: Option<String>,
    server_type: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    frontend: bool,
    client_port: Option<u16>,
}

impl ServerRecordBuilder {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_server_type(mut self, server_type: impl Into<String>) -> Self {
        self.server_type = Some(server_type.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_frontend(mut self, frontend: bool) -> Self {
        self.frontend = frontend;
        self
    }

    pub fn with_client_port(mut self, client_port: u16) -> Self {
        self.client_port = Some(client_port);
        self
    }

    /// Build the ServerRecord with validation.
    ///
    /// The host defaults to `127.0.0.1` when unset. A frontend server without
    /// a client port is accepted; the client port is informational here.
    #[track_caller]
    pub fn build(self) -> Result<ServerRecord, ModelError> {
        let id = self.id.ok_or_else(|| ModelError::Validation {
            message: String::from("Server id is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if id.trim().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Server id cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let server_type = self.server_type.ok_or_else(|| ModelError::Validation {
            message: String::from("Server type is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if server_type.trim().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Server type cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Server types become directory names under app/servers.
        if server_type.contains(['/', '\\']) || server_type == "." || server_type == ".." {
            return Err(ModelError::Validation {
                message: format!("Invalid server type: {server_type}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let port = self.port.ok_or_else(|| ModelError::Validation {
            message: String::from("Port is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if port == 0 {
            return Err(ModelError::Validation {
                message: String::from("Port must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let host = self.host.unwrap_or_else(|| String::from("127.0.0.1"));

        if host.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Host cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(ServerRecord {
            id,
            server_type,
            host,
            port,
            frontend: self.frontend,
            client_port: self.client_port,
        })
    }
}
