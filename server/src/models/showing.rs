use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const SHOWING_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("showing date must look like 2024-06-28 14:30, got '{0}'")]
pub struct InvalidShowing(pub String);

/// Canonical `YYYY-MM-DD HH:MM` key identifying one screening of a movie.
///
/// Query strings often carry `+` in place of the space, so parsing accepts
/// both and always re-renders the zero-padded form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShowingKey(String);

impl ShowingKey {
    pub fn parse(raw: &str) -> Result<Self, InvalidShowing> {
        let normalized = raw.trim().replace('+', " ");
        let at = NaiveDateTime::parse_from_str(&normalized, SHOWING_FORMAT)
            .map_err(|_| InvalidShowing(raw.to_string()))?;
        Ok(Self(at.format(SHOWING_FORMAT).to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ShowingKey {
    type Error = InvalidShowing;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShowingKey> for String {
    fn from(key: ShowingKey) -> Self {
        key.0
    }
}

impl fmt::Display for ShowingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_is_treated_as_space() {
        let key = ShowingKey::parse("2024-06-28+14:30").unwrap();
        assert_eq!(key.as_str(), "2024-06-28 14:30");
    }

    #[test]
    fn test_key_is_zero_padded() {
        let key = ShowingKey::parse("2024-6-8 9:05").unwrap();
        assert_eq!(key.as_str(), "2024-06-08 09:05");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(ShowingKey::parse("tomorrow").is_err());
        assert!(ShowingKey::parse("2024-06-28").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<ShowingKey, _> = serde_json::from_str("\"2024-06-28 14:30\"");
        assert!(ok.is_ok());
        let bad: Result<ShowingKey, _> = serde_json::from_str("\"soon\"");
        assert!(bad.is_err());
    }
}
