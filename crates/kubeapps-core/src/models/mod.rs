//! Data models shared between the repository and API layers.

mod user;

pub use user::*;
