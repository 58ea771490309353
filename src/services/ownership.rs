use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

impl Access {
    /// `Denied` becomes a 403, never a 401 or 404.
    pub fn require(self, message: &str) -> Result<(), AppError> {
        match self {
            Access::Allowed => Ok(()),
            Access::Denied => Err(AppError::Forbidden(message.to_string())),
        }
    }
}

pub fn authorize(record_owner: Uuid, requester: Uuid) -> Access {
    if record_owner == requester {
        Access::Allowed
    } else {
        Access::Denied
    }
}
