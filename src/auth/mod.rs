mod jwt;
mod password;

pub use jwt::{extract_bearer_token, issue_jwt, validate_jwt, AuthError, ACCESS_TOKEN_TTL};
pub use password::{hash_password, verify_password};
