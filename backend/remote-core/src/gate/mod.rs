//! Per-connection whitelist enforcement.

use crate::rpc::{ConnectionKicker, ConnectionListener, UNAUTHORIZED_REASON};
use crate::whitelist::WhitelistStore;

use models::ConnectionEvent;

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace, warn};

/// Outcome of checking one connection event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The address is whitelisted.
    Allow,
    /// Not filtered: no whitelist, an incomplete event, or a closed gate.
    Skip,
    /// The connection with this id must be kicked.
    Deny(String),
}

/// Decides whether inbound connections may stay open.
///
/// Without a whitelist store every connection is allowed.
#[derive(Debug)]
pub struct ConnectionGate {
    whitelist: Option<WhitelistStore>,
    closed: AtomicBool,
}

impl ConnectionGate {
    pub fn new(whitelist: Option<WhitelistStore>) -> Self {
        Self {
            whitelist,
            closed: AtomicBool::new(false),
        }
    }

    /// A gate that lets every connection through.
    pub fn open() -> Self {
        Self::new(None)
    }

    pub fn is_filtering(&self) -> bool {
        self.whitelist.is_some()
    }

    /// Stop evaluating events. Used once the service begins stopping.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Check `event` against the current whitelist snapshot.
    pub fn authorize(&self, event: &ConnectionEvent) -> GateDecision {
        if self.is_closed() {
            return GateDecision::Skip;
        }

        let Some(ref store) = self.whitelist else {
            return GateDecision::Skip;
        };

        // Incomplete events cannot be filtered and are let through.
        let Some((ip, id)) = event.filterable() else {
            trace!("Connection event without ip or id, not filtered: {event:?}");
            return GateDecision::Skip;
        };

        if store.snapshot().contains(ip) {
            GateDecision::Allow
        } else {
            GateDecision::Deny(id.to_string())
        }
    }
}

impl ConnectionListener for ConnectionGate {
    fn on_connection(&self, event: ConnectionEvent, kicker: &dyn ConnectionKicker) {
        match self.authorize(&event) {
            GateDecision::Allow => {
                debug!("Connection {:?} from {:?} allowed", event.id, event.ip);
            }
            GateDecision::Skip => {}
            GateDecision::Deny(id) => {
                warn!(
                    "Connection {id} from {} is not whitelisted, kicking",
                    event.ip.as_deref().unwrap_or_default()
                );
                kicker.kick_by_id(&id, UNAUTHORIZED_REASON);
            }
        }
    }
}
