use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::ShowingKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status '{other}'")),
        }
    }
}

/// A ticket booking for one showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[serde(rename = "movie")]
    pub movie_id: Uuid,
    #[serde(rename = "theater")]
    pub theater_id: Uuid,
    #[serde(rename = "date")]
    pub showing: ShowingKey,
    #[serde(rename = "seats")]
    pub seat_ids: Vec<Uuid>,
    pub subtotal: i64,
    pub tax: i64,
    pub booking_fee: i64,
    pub total: i64,
    pub status: TransactionStatus,
    #[serde(skip_serializing)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One claimed seat. Carries the movie and showing it claims so the store
/// can enforce one claim per seat and showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSeat {
    pub id: Uuid,
    #[serde(rename = "transaction")]
    pub transaction_id: Uuid,
    #[serde(skip_serializing)]
    pub movie_id: Uuid,
    #[serde(skip_serializing)]
    pub showing: ShowingKey,
    pub seat: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionSeat {
    pub fn claim(transaction: &Transaction, seat: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id: transaction.id,
            movie_id: transaction.movie_id,
            showing: transaction.showing.clone(),
            seat: seat.into(),
            created_at: transaction.created_at,
        }
    }
}
