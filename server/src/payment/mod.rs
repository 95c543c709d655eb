//! Wallet top-ups through an external payment gateway.
//!
//! Opening a payment returns a redirect URL for the customer. The gateway
//! later reports the verdict with a signed [`Notification`], which is the
//! only thing that moves a top-up out of `pending`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod client;
pub mod mock;
pub mod notification;

pub use client::HttpPaymentGateway;
pub use mock::MockPaymentGateway;
pub use notification::Notification;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway request failed: {0}")]
    Request(String),

    #[error("payment gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("payment gateway response unreadable: {0}")]
    Decode(String),

    #[error("payment notification signature mismatch")]
    InvalidSignature,

    #[error("payment server key is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Wallet transaction id, echoed back by the gateway as `order_id`.
    pub order_id: Uuid,
    pub amount: i64,
    pub customer_name: String,
    pub customer_email: String,
    /// Where the gateway sends the customer once payment finishes.
    pub redirect_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub token: String,
    pub redirect_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession, GatewayError>;
}
