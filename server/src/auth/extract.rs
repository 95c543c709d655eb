use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::token::token_from_header;
use super::{AuthError, Principal};
use crate::models::Role;
use crate::state::AppState;
use crate::utils::error::AppError;

/// A signed-in customer.
#[derive(Debug, Clone)]
pub struct CustomerPrincipal(pub Principal);

/// A signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Principal, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = token_from_header(header)?;
    let user_id = state.tokens.verify(token)?;

    // A valid token for a deleted account is as good as no token.
    let user = state
        .stores
        .users
        .find_user_by_id(user_id)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok(Principal::from(&user))
}

#[async_trait]
impl FromRequestParts<AppState> for CustomerPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, state).await?;
        Ok(Self(principal.require(Role::Customer)?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, state).await?;
        Ok(Self(principal.require(Role::Admin)?))
    }
}
