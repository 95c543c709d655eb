use crate::utils::error::AppError;

/// Collects every field problem of a request so the caller sees them all at
/// once instead of one per round trip.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        self.check(
            value.trim().chars().count() >= min,
            format!("{field} must contain at least {min} characters"),
        )
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.contains(char::is_whitespace)
            }
            None => false,
        };
        self.check(valid, format!("{field} must be a valid email"))
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        self.check(value >= 0, format!("{field} must not be negative"))
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(std::mem::take(&mut self.errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_every_problem() {
        let err = Validator::new()
            .min_len("name", "abc", 5)
            .email("email", "nope")
            .non_negative("price", -1)
            .finish()
            .unwrap_err();

        match err {
            AppError::ValidationError(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_accepts_valid_input() {
        assert!(Validator::new()
            .min_len("name", "Galaxy Cinema", 5)
            .email("email", "budi@example.com")
            .finish()
            .is_ok());
    }
}
