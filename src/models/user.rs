use chrono::NaiveDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}
