//! kubeapps HTTP API
//!
//! Wiring for the axum server: health endpoints, user, queue, cluster and storage
//! routes, error mapping.

pub mod error;
pub mod handlers;
pub mod probes;
pub mod setup;
pub mod state;
mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
