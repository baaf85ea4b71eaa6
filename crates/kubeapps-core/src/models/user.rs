use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Row of the `users` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for adding a user
#[derive(Debug, Deserialize, Validate)]
pub struct AddUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name and email are required"))]
    pub name: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Name and email are required"),
        email(message = "Email address is invalid")
    )]
    pub email: String,
}

impl AddUserRequest {
    /// Trimmed copy used for persistence.
    pub fn normalized(&self) -> (String, String) {
        (
            self.name.trim().to_string(),
            self.email.trim().to_lowercase(),
        )
    }
}
