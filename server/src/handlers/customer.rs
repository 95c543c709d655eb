use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiJson, ApiPath, ApiQuery};
use crate::auth::CustomerPrincipal;
use crate::models::ShowingKey;
use crate::services::booking::BookingRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";
const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct ShowingQuery {
    pub date: Option<String>,
}

impl ShowingQuery {
    fn showing(&self) -> Result<Option<ShowingKey>, AppError> {
        match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => ShowingKey::parse(raw)
                .map(Some)
                .map_err(|e| AppError::validation(e.to_string())),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount: Option<i64>,
}

#[derive(Serialize)]
struct SeatAvailability {
    date: ShowingKey,
    booked: Vec<String>,
    available: Vec<String>,
}

#[derive(Serialize)]
struct Balance {
    balance: i64,
}

pub async fn list_movies(
    State(state): State<AppState>,
    CustomerPrincipal(_): CustomerPrincipal,
) -> Result<Response, AppError> {
    let movies = state.catalog.list_movies(true).await?;
    Ok(success(movies, "Get movies success"))
}

pub async fn list_genres(
    State(state): State<AppState>,
    CustomerPrincipal(_): CustomerPrincipal,
) -> Result<Response, AppError> {
    let genres = state.catalog.list_genres().await?;
    Ok(success(genres, "Get genres success"))
}

pub async fn movie_detail(
    State(state): State<AppState>,
    CustomerPrincipal(_): CustomerPrincipal,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ShowingQuery>,
) -> Result<Response, AppError> {
    let showing = query.showing()?;
    let detail = state.catalog.movie_detail(id, showing.as_ref()).await?;
    Ok(success(detail, "Get movie success"))
}

pub async fn check_seats(
    State(state): State<AppState>,
    CustomerPrincipal(_): CustomerPrincipal,
    ApiPath(movie_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ShowingQuery>,
) -> Result<Response, AppError> {
    let showing = query
        .showing()?
        .ok_or_else(|| AppError::validation("date is required"))?;

    let booked = state.seats.booked_seats(movie_id, &showing).await?;
    let available = state.seats.available_seats(movie_id, &showing).await?;
    Ok(success(
        SeatAvailability {
            date: showing,
            booked,
            available,
        },
        "Get seats success",
    ))
}

pub async fn browse_movies(
    State(state): State<AppState>,
    CustomerPrincipal(_): CustomerPrincipal,
    ApiPath(genre_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<BrowseQuery>,
) -> Result<Response, AppError> {
    let movies = state.catalog.browse(genre_id, query.city.as_deref()).await?;
    Ok(success(movies, "Get movies success"))
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(IDEMPOTENCY_HEADER) else {
        return Ok(None);
    };
    let key = value
        .to_str()
        .map_err(|_| AppError::validation("Idempotency-Key must be visible ASCII"))?
        .trim();
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(AppError::validation(format!(
            "Idempotency-Key must be 1 to {MAX_IDEMPOTENCY_KEY_LEN} characters"
        )));
    }
    Ok(Some(key.to_string()))
}

pub async fn book_ticket(
    State(state): State<AppState>,
    CustomerPrincipal(principal): CustomerPrincipal,
    headers: HeaderMap,
    ApiJson(request): ApiJson<BookingRequest>,
) -> Result<Response, AppError> {
    let key = idempotency_key(&headers)?;
    let transaction = state.booking.book(&principal, request, key).await?;
    Ok(success(transaction, "Transaction success"))
}

pub async fn list_orders(
    State(state): State<AppState>,
    CustomerPrincipal(principal): CustomerPrincipal,
) -> Result<Response, AppError> {
    let orders = state.booking.orders(&principal).await?;
    Ok(success(orders, "Get orders success"))
}

pub async fn order_detail(
    State(state): State<AppState>,
    CustomerPrincipal(principal): CustomerPrincipal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let order = state.booking.order(&principal, id).await?;
    Ok(success(order, "Get order success"))
}

pub async fn check_balance(
    State(state): State<AppState>,
    CustomerPrincipal(principal): CustomerPrincipal,
) -> Result<Response, AppError> {
    let balance = state.ledger.get_balance(principal.id).await?;
    Ok(success(Balance { balance }, "Get balance success"))
}

pub async fn top_up(
    State(state): State<AppState>,
    CustomerPrincipal(principal): CustomerPrincipal,
    ApiJson(request): ApiJson<TopUpRequest>,
) -> Result<Response, AppError> {
    let amount = request
        .amount
        .ok_or_else(|| AppError::validation("amount is required"))?;
    let receipt = state.ledger.top_up(&principal, amount).await?;
    Ok(success(receipt, "Top up created"))
}

pub async fn top_up_history(
    State(state): State<AppState>,
    CustomerPrincipal(principal): CustomerPrincipal,
) -> Result<Response, AppError> {
    let history = state.ledger.history(principal.id).await?;
    Ok(success(history, "Get top up history success"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_idempotency_key_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(idempotency_key(&headers).unwrap(), None);

        headers.insert(IDEMPOTENCY_HEADER, HeaderValue::from_static(" order-1 "));
        assert_eq!(idempotency_key(&headers).unwrap().as_deref(), Some("order-1"));

        headers.insert(IDEMPOTENCY_HEADER, HeaderValue::from_static("  "));
        assert!(idempotency_key(&headers).is_err());
    }

    #[test]
    fn test_showing_query_normalizes_plus() {
        let query = ShowingQuery {
            date: Some("2024-06-28+14:30".into()),
        };
        assert_eq!(
            query.showing().unwrap().map(|key| key.to_string()),
            Some("2024-06-28 14:30".to_string())
        );
        assert_eq!(ShowingQuery { date: None }.showing().unwrap(), None);
    }
}
