use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;

pub const AUTH_SCHEME: &str = "JWT";

const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct Subject {
    id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    data: Subject,
    iat: i64,
    exp: i64,
}

/// Signs and verifies user tokens with one shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            data: Subject { id: user_id },
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Returns the user id the token was issued for.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|decoded| decoded.claims.data.id)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Pulls the token out of an `Authorization` header value.
pub fn token_from_header(value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::WrongScheme)?;

    if scheme != AUTH_SCHEME {
        return Err(AuthError::WrongScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(token)
}
