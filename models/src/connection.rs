use serde::{Deserialize, Serialize};

/// An inbound connection reported by the RPC server.
///
/// Both fields are optional because transports may report incomplete events;
/// such events cannot be filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub ip: Option<String>,
    pub id: Option<String>,
}

impl ConnectionEvent {
    pub fn new(ip: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            id: Some(id.into()),
        }
    }

    /// The `(ip, id)` pair when both are present and non-empty.
    pub fn filterable(&self) -> Option<(&str, &str)> {
        match (self.ip.as_deref(), self.id.as_deref()) {
            (Some(ip), Some(id)) if !ip.is_empty() && !id.is_empty() => Some((ip, id)),
            _ => None,
        }
    }
}
