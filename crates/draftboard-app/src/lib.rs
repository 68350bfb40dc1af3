// Library root: re-exports all modules so integration tests and the binary
// share the crate's public API.

pub mod config;
pub mod error;
pub mod live;
pub mod manager;
pub mod protocol;
pub mod session;

pub use error::SessionError;
pub use manager::{SessionManager, WaitOutcome};
