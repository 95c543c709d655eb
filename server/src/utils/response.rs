use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";

/// Shared `{status, message, data}` envelope.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub status: &'static str,
    pub code: String,
    pub message: String,
    pub data: Option<Value>,
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        status: STATUS_SUCCESS,
        message: message.into(),
        data: Some(data),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn empty_success(message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        status: STATUS_SUCCESS,
        message: message.into(),
        data: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error(code: &str, message: impl Into<String>, data: Option<Value>, status: StatusCode) -> Response {
    let body = ApiErrorResponse {
        status: STATUS_FAILED,
        code: code.to_string(),
        message: message.into(),
        data,
    };

    (status, Json(body)).into_response()
}
