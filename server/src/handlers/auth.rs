use axum::extract::{Multipart, State};
use axum::response::Response;

use super::form::FormData;
use super::ApiJson;
use crate::services::accounts::{LoginRequest, RegisterInput};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    let response = state.accounts.login(request).await?;
    Ok(success(response, "Login success"))
}

/// Multipart: `name`, `email`, `password`, `role` and an optional `photo`.
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = FormData::read(multipart).await?;
    let input = RegisterInput {
        name: form.text("name").unwrap_or_default(),
        email: form.text("email").unwrap_or_default(),
        password: form.text("password").unwrap_or_default(),
        role: form.text("role").unwrap_or_else(|| "customer".to_string()),
    };

    let account = state
        .accounts
        .register(input, form.take_file("photo"))
        .await?;
    Ok(success(account, "Sign up success"))
}
