//! kubeapps database layer
//!
//! Repositories over a shared `sqlx::PgPool`. Every query goes through the retry
//! executor with the policy the repository was constructed with.

pub mod db;

pub use db::{ping, UserRepository};
