use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::wallet::WalletLedger;
use crate::auth::{PasswordHasher, TokenIssuer};
use crate::models::{Role, User};
use crate::storage::{FileStorage, Upload, PHOTOS};
use crate::store::UserStore;
use crate::utils::error::AppError;
use crate::utils::validation::Validator;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default = "default_login_role")]
    pub role: String,
}

fn default_login_role() -> String {
    Role::Customer.as_str().to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub account: AccountView,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    files: Arc<dyn FileStorage>,
    tokens: Arc<TokenIssuer>,
    hasher: PasswordHasher,
    ledger: WalletLedger,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        files: Arc<dyn FileStorage>,
        tokens: Arc<TokenIssuer>,
        hasher: PasswordHasher,
        ledger: WalletLedger,
    ) -> Self {
        Self {
            users,
            files,
            tokens,
            hasher,
            ledger,
        }
    }

    fn view(&self, user: &User) -> AccountView {
        AccountView {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            photo_url: user
                .photo
                .as_deref()
                .map(|photo| self.files.public_url(PHOTOS, photo)),
        }
    }

    /// Creates the account, storing the optional photo. Customers get an
    /// empty wallet straight away.
    #[tracing::instrument(skip(self, input, photo), fields(email = %input.email))]
    pub async fn register(
        &self,
        input: RegisterInput,
        photo: Option<Upload>,
    ) -> Result<AccountView, AppError> {
        let role = input.role.parse::<Role>();
        Validator::new()
            .min_len("name", &input.name, 5)
            .email("email", input.email.trim())
            .min_len("password", &input.password, 5)
            .check(role.is_ok(), "role must be admin or customer")
            .finish()?;
        let role = role.map_err(AppError::validation)?;

        let email = input.email.trim().to_lowercase();
        if self.users.find_user_by_email_and_role(&email, role).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let password_hash = self.hasher.hash(&input.password).await?;
        let photo = match photo {
            Some(upload) => Some(self.files.store(PHOTOS, upload).await?),
            None => None,
        };

        let user = User {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            email,
            password_hash,
            role,
            photo,
            created_at: Utc::now(),
        };
        if let Err(e) = self.users.insert_user(&user).await {
            if let Some(photo) = &user.photo {
                if let Err(delete_err) = self.files.delete(PHOTOS, photo).await {
                    tracing::warn!(error = %delete_err, "Could not delete orphaned photo");
                }
            }
            return Err(match e {
                crate::store::StoreError::Conflict(_) => {
                    AppError::Conflict("Email already registered".into())
                }
                other => other.into(),
            });
        }

        if role == Role::Customer {
            self.ledger.open_wallet(user.id).await?;
        }

        info!(user_id = %user.id, role = role.as_str(), "Registered account");
        Ok(self.view(&user))
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        let role = request.role.parse::<Role>().map_err(AppError::validation)?;
        let email = request.email.trim().to_lowercase();

        let user = self
            .users
            .find_user_by_email_and_role(&email, role)
            .await?
            .ok_or_else(|| AppError::NotFound("Email not registered".into()))?;

        if !self.hasher.verify(&request.password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "Signed in");
        Ok(LoginResponse {
            account: self.view(&user),
            token,
        })
    }
}
