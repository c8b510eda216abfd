use crate::error::remote::RemoteError;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

/// Lifecycle of a [`RemoteService`](super::RemoteService).
///
/// `Created -> Starting -> Running -> Stopping -> Stopped`, with
/// `Starting -> Stopped` when startup fails. There is no way back to
/// `Starting` once the service has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl ServiceState {
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::{Created, Running, Starting, Stopped, Stopping};

        matches!(
            (self, next),
            (Created, Starting)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Running, Stopping)
                | (Stopping, Stopped)
        )
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidState`] for a transition the lifecycle
    /// does not allow; the state is left unchanged.
    #[track_caller]
    pub fn advance(&mut self, next: ServiceState) -> Result<(), RemoteError> {
        if !self.can_transition_to(next) {
            return Err(RemoteError::InvalidState {
                message: format!("cannot move from {self} to {next}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        *self = next;
        Ok(())
    }
}

impl Display for ServiceState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ServiceState::Created => "created",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
            ServiceState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
