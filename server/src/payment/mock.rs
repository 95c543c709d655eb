use async_trait::async_trait;
use std::sync::Mutex;

use super::{GatewayError, PaymentGateway, PaymentRequest, PaymentSession};

/// In-process gateway for tests and local runs without gateway credentials.
/// Every payment succeeds unless built with [`MockPaymentGateway::failing`].
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    fail: bool,
    requests: Mutex<Vec<PaymentRequest>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Payments opened so far, oldest first.
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession, GatewayError> {
        if self.fail {
            return Err(GatewayError::Status {
                status: 503,
                body: "mock gateway unavailable".into(),
            });
        }

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let token = format!("mock-{}", request.order_id);
        Ok(PaymentSession {
            redirect_url: format!("https://mock-gateway.local/pay/{token}"),
            token,
        })
    }
}
