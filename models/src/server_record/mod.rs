pub mod builder;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};

/// Registration record of a server node.
///
/// Built through [`ServerRecordBuilder`](builder::ServerRecordBuilder) so that
/// every record reaching the service has a non-empty id and type and a
/// usable port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: String,
    pub server_type: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub frontend: bool,
    #[serde(default)]
    pub client_port: Option<u16>,
}

impl ServerRecord {
    pub fn role(&self) -> ServerRole {
        if self.frontend {
            ServerRole::Frontend
        } else {
            ServerRole::Backend
        }
    }
}

/// Whether a server faces end-user connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerRole {
    Frontend,
    Backend,
}

impl ServerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRole::Frontend => "frontend",
            ServerRole::Backend => "backend",
        }
    }
}

impl Display for ServerRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}
