use axum::extract::State;
use axum::response::Response;
use tracing::info;

use super::ApiJson;
use crate::payment::Notification;
use crate::state::AppState;
use crate::store::Settlement;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

/// Gateway callback. Unauthenticated; trust comes from the signature.
pub async fn notification(
    State(state): State<AppState>,
    ApiJson(notification): ApiJson<Notification>,
) -> Result<Response, AppError> {
    notification.verify(&state.config.payment.server_key)?;

    let Some(outcome) = notification.outcome() else {
        info!(
            order_id = %notification.order_id,
            status = %notification.transaction_status,
            "Payment still in flight"
        );
        return Ok(empty_success("Notification acknowledged"));
    };

    let top_up_id = notification
        .top_up_id()
        .ok_or_else(|| AppError::NotFound("Top-up not found".into()))?;

    match state
        .ledger
        .confirm_top_up(top_up_id, outcome, notification.amount())
        .await?
    {
        Settlement::Applied(entry) => Ok(success(entry, "Top up settled")),
        Settlement::AlreadySettled(entry) => Ok(success(entry, "Top up already settled")),
    }
}
