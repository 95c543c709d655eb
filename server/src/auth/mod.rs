//! Customer and admin authentication.
//!
//! Tokens are HS256 JWTs carried as `Authorization: JWT <token>`. The
//! extractors in [`extract`] resolve the token to a [`Principal`] and reject
//! principals of the wrong role.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Role, User};

pub mod extract;
pub mod password;
pub mod token;

pub use extract::{AdminPrincipal, CustomerPrincipal};
pub use password::PasswordHasher;
pub use token::TokenIssuer;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    MissingCredentials,

    #[error("Authorization header must use the JWT scheme")]
    WrongScheme,

    #[error("Token invalid")]
    InvalidToken,

    #[error("Token expired")]
    Expired,

    #[error("Unauthorized")]
    WrongRole,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn require(self, role: Role) -> Result<Self, AuthError> {
        if self.role == role {
            Ok(self)
        } else {
            Err(AuthError::WrongRole)
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Budi Santoso".into(),
            email: "budi@example.com".into(),
            role,
        }
    }

    #[test]
    fn test_require_matching_role() {
        assert!(principal(Role::Customer).require(Role::Customer).is_ok());
        assert!(matches!(
            principal(Role::Customer).require(Role::Admin),
            Err(AuthError::WrongRole)
        ));
    }
}
