//! Settlement oracle: the external gateway that actually moves money.
//! The idempotency key of a call is (stipend_id, attempt_sequence), so a
//! retried transfer presents a new key only after an explicit Retry.

use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use failsafe::futures::CircuitBreaker;
use failsafe::Error as FailsafeError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{breaker, Breaker};

#[derive(Error, Debug)]
pub enum SettlementError {
    /// The gateway processed the request and declined it.
    #[error("settlement declined: {0}")]
    Declined(String),
    #[error("settlement gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("settlement gateway returned status {0}")]
    UpstreamStatus(u16),
    #[error("invalid response from settlement gateway: {0}")]
    InvalidResponse(String),
    #[error("circuit breaker open, settlement gateway unavailable")]
    CircuitOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub transaction_id: Uuid,
    pub stipend_id: Uuid,
    pub attempt_sequence: i32,
    pub correlation_id: Uuid,
    pub amount: BigDecimal,
    pub source_account: String,
    pub destination_account: String,
    pub destination_bank: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub reference_number: String,
    pub settled_at: DateTime<Utc>,
}

#[async_trait]
pub trait SettlementOracle: Send + Sync {
    async fn settle(&self, request: &SettlementRequest)
        -> Result<SettlementReceipt, SettlementError>;
}

pub struct HttpSettlementOracle {
    client: Client,
    base_url: String,
    circuit_breaker: Breaker,
}

impl HttpSettlementOracle {
    pub fn new(base_url: String, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            circuit_breaker: breaker(5, Duration::from_secs(60)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeclineBody {
    reason: String,
}

#[async_trait]
impl SettlementOracle for HttpSettlementOracle {
    async fn settle(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, SettlementError> {
        let url = format!("{}/settlements", self.base_url.trim_end_matches('/'));
        let client = self.client.clone();
        let payload = request.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(&url)
                    .header("x-correlation-id", payload.correlation_id.to_string())
                    .json(&payload)
                    .send()
                    .await?;

                match response.status().as_u16() {
                    200 | 201 => {
                        let receipt = response.json::<SettlementReceipt>().await?;
                        Ok(receipt)
                    }
                    422 => {
                        let reason = response
                            .json::<DeclineBody>()
                            .await
                            .map(|b| b.reason)
                            .unwrap_or_else(|_| "no reason given".to_string());
                        Err(SettlementError::Declined(reason))
                    }
                    status => Err(SettlementError::UpstreamStatus(status)),
                }
            })
            .await;

        match result {
            Ok(receipt) => Ok(receipt),
            Err(FailsafeError::Rejected) => Err(SettlementError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request() -> SettlementRequest {
        SettlementRequest {
            transaction_id: Uuid::new_v4(),
            stipend_id: Uuid::new_v4(),
            attempt_sequence: 1,
            correlation_id: Uuid::new_v4(),
            amount: BigDecimal::from_str("4700.00").unwrap(),
            source_account: "UNIV-OPERATING".to_string(),
            destination_account: "9912345678".to_string(),
            destination_bank: "FNB".to_string(),
            payment_method: "BANK_TRANSFER".to_string(),
        }
    }

    #[tokio::test]
    async fn test_settle_success() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "reference_number": "REF-2024-00017",
            "settled_at": "2024-03-01T10:00:00Z"
        });
        let mock = server
            .mock("POST", "/settlements")
            .match_header("x-correlation-id", mockito::Matcher::Any)
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let oracle = HttpSettlementOracle::new(server.url(), Duration::from_secs(5));
        let receipt = oracle.settle(&request()).await.unwrap();

        assert_eq!(receipt.reference_number, "REF-2024-00017");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_settle_declined() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/settlements")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"reason":"account frozen"}"#)
            .create_async()
            .await;

        let oracle = HttpSettlementOracle::new(server.url(), Duration::from_secs(5));
        let err = oracle.settle(&request()).await.unwrap_err();

        match err {
            SettlementError::Declined(reason) => assert_eq!(reason, "account frozen"),
            other => panic!("expected decline, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_settle_gateway_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/settlements")
            .with_status(500)
            .create_async()
            .await;

        let oracle = HttpSettlementOracle::new(server.url(), Duration::from_secs(5));
        let err = oracle.settle(&request()).await.unwrap_err();

        assert!(matches!(err, SettlementError::UpstreamStatus(500)));
    }
}
