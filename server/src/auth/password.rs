use super::AuthError;

/// bcrypt hashing, run off the async workers.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let plain = plain.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    pub async fn verify(&self, plain: &str, hash: &str) -> Result<bool, AuthError> {
        let plain = plain.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hasher = PasswordHasher::with_cost(4);
        let hash = hasher.hash("rahasia123").await.unwrap();

        assert_ne!(hash, "rahasia123");
        assert!(hasher.verify("rahasia123", &hash).await.unwrap());
        assert!(!hasher.verify("salah", &hash).await.unwrap());
    }
}
