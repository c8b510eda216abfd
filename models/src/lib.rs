//! Domain models for the remote service.
//!
//! Pure data describing the owning server, the application handle passed to
//! the RPC server, the remote-interface directories it exposes and the
//! connection events it reports. No filesystem or network access lives here.

pub mod app_context;
pub mod connection;
pub mod error;
pub mod remote_path;
pub mod server_record;

pub use app_context::AppContext;
pub use connection::ConnectionEvent;
pub use error::model_error::ModelError;
pub use remote_path::{PathNamespace, RemotePathRecord};
pub use server_record::builder::ServerRecordBuilder;
pub use server_record::{ServerRecord, ServerRole};

#[cfg(test)]
mod tests;
