//! Payment gateway boundary.
//!
//! Only the charge/refund contract is used by the booking lifecycle; the
//! gateway is always called outside of database transactions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::payment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    pub gateway_ref: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway timeout")]
    Timeout,
    #[error("Gateway transport error: {0}")]
    Transport(String),
    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        payment: &payment::Model,
        method: &str,
    ) -> Result<GatewayResponse, GatewayError>;

    async fn refund(&self, payment: &payment::Model) -> Result<GatewayResponse, GatewayError>;
}

#[derive(Debug, Serialize)]
struct ChargeRequest<'a> {
    payment_id: Uuid,
    reference: Uuid,
    amount: f64,
    currency: &'a str,
    method: &'a str,
}

#[derive(Debug, Serialize)]
struct RefundRequest<'a> {
    payment_id: Uuid,
    gateway_ref: Option<&'a str>,
    amount: f64,
    currency: &'a str,
}

/// JSON-over-HTTP gateway client.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Transport(format!("gateway returned {}", status)));
        }

        response
            .json::<GatewayResponse>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

fn map_reqwest_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(error.to_string())
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(
        &self,
        payment: &payment::Model,
        method: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let body = ChargeRequest {
            payment_id: payment.id,
            reference: payment.booking_id,
            amount: payment.amount,
            currency: &payment.currency,
            method,
        };
        self.post("/charges", &body).await
    }

    async fn refund(&self, payment: &payment::Model) -> Result<GatewayResponse, GatewayError> {
        let body = RefundRequest {
            payment_id: payment.id,
            gateway_ref: payment.gateway_ref.as_deref(),
            amount: payment.amount,
            currency: &payment.currency,
        };
        self.post("/refunds", &body).await
    }
}

/// Gateway that approves everything; used when no gateway URL is configured.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway;

impl MockPaymentGateway {
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(
        &self,
        payment: &payment::Model,
        _method: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        Ok(GatewayResponse {
            success: true,
            gateway_ref: Some(format!("mock_ch_{}", payment.id.simple())),
            message: Some("Approved".to_string()),
        })
    }

    async fn refund(&self, payment: &payment::Model) -> Result<GatewayResponse, GatewayError> {
        Ok(GatewayResponse {
            success: true,
            gateway_ref: Some(format!("mock_rf_{}", payment.id.simple())),
            message: Some("Refunded".to_string()),
        })
    }
}
