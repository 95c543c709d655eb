use axum::extract::{FromRequest, FromRequestParts};
use axum::response::Response;
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod admin;
pub mod auth;
pub mod customer;
pub mod form;
pub mod payments;

/// JSON body whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "cinema-api",
    };

    success(payload, "Health check successful")
}
