use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    /// Minor currency units, never negative.
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn open(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Top-up status. The only legal moves are `Pending -> Success` and
/// `Pending -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopUpStatus {
    Pending,
    Success,
    Failed,
}

impl TopUpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TopUpStatus::Pending => "pending",
            TopUpStatus::Success => "success",
            TopUpStatus::Failed => "failed",
        }
    }

    pub fn is_settled(self) -> bool {
        !matches!(self, TopUpStatus::Pending)
    }
}

impl FromStr for TopUpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TopUpStatus::Pending),
            "success" => Ok(TopUpStatus::Success),
            "failed" => Ok(TopUpStatus::Failed),
            other => Err(format!("unknown top-up status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    #[serde(rename = "wallet")]
    pub wallet_id: Uuid,
    pub amount: i64,
    pub status: TopUpStatus,
    pub payment_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn pending(wallet_id: Uuid, amount: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            amount,
            status: TopUpStatus::Pending,
            payment_token: None,
            created_at: now,
            updated_at: now,
        }
    }
}
