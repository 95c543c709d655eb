use serde::Deserialize;
use sha2::{Digest, Sha512};
use uuid::Uuid;

use super::GatewayError;
use crate::models::TopUpStatus;

/// Asynchronous payment status report posted by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    pub order_id: String,
    pub status_code: String,
    /// Decimal string such as `"50000.00"`.
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
}

pub fn signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Notification {
    /// Without a server key nothing the caller sends can be authenticated.
    pub fn verify(&self, server_key: &str) -> Result<(), GatewayError> {
        if server_key.trim().is_empty() {
            return Err(GatewayError::NotConfigured);
        }
        let expected = signature(
            &self.order_id,
            &self.status_code,
            &self.gross_amount,
            server_key,
        );
        if expected.eq_ignore_ascii_case(self.signature_key.trim()) {
            Ok(())
        } else {
            Err(GatewayError::InvalidSignature)
        }
    }

    pub fn top_up_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.order_id).ok()
    }

    /// Whole currency units reported as paid.
    pub fn amount(&self) -> Option<i64> {
        let whole = match self.gross_amount.split_once('.') {
            Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
            Some(_) => return None,
            None => self.gross_amount.as_str(),
        };
        whole.parse().ok()
    }

    /// The verdict this report carries. `None` means the payment is still in
    /// flight and nothing should change.
    pub fn outcome(&self) -> Option<TopUpStatus> {
        match self.transaction_status.as_str() {
            "settlement" => Some(TopUpStatus::Success),
            "capture" => match self.fraud_status.as_deref() {
                None | Some("accept") => Some(TopUpStatus::Success),
                Some("deny") => Some(TopUpStatus::Failed),
                Some(_) => None,
            },
            "deny" | "cancel" | "expire" | "failure" => Some(TopUpStatus::Failed),
            _ => None,
        }
    }
}
