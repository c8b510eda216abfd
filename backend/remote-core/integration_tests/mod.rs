// Integration tests for the remote service lifecycle.
// The RPC transport is replaced by a recording server so every option, listener
// registration and kick request can be inspected.

mod helpers;
mod hot_reload;
mod service;
