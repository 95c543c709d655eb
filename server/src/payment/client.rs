use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;

use super::{GatewayError, PaymentGateway, PaymentRequest, PaymentSession};
use crate::config::PaymentConfig;

#[derive(Serialize)]
struct SnapRequest<'a> {
    transaction_details: TransactionDetails,
    credit_card: CreditCard,
    customer_details: CustomerDetails<'a>,
    callbacks: Callbacks<'a>,
}

#[derive(Serialize)]
struct TransactionDetails {
    order_id: String,
    gross_amount: i64,
}

#[derive(Serialize)]
struct CreditCard {
    secure: bool,
}

#[derive(Serialize)]
struct CustomerDetails<'a> {
    first_name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct Callbacks<'a> {
    finish: &'a str,
}

/// Snap-style HTTP gateway client.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    endpoint: String,
    authorization: String,
}

impl HttpPaymentGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.gateway_url.clone(),
            authorization: format!("BASIC {}", STANDARD.encode(format!("{}:", config.server_key))),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession, GatewayError> {
        let body = SnapRequest {
            transaction_details: TransactionDetails {
                order_id: request.order_id.to_string(),
                gross_amount: request.amount,
            },
            credit_card: CreditCard { secure: true },
            customer_details: CustomerDetails {
                first_name: &request.customer_name,
                email: &request.customer_email,
            },
            callbacks: Callbacks {
                finish: &request.redirect_url,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.authorization)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Payment gateway refused the payment");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<PaymentSession>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
