//! Banking directory collaborator: resolves a student's disbursement
//! account before a transfer is initiated.

use std::time::Duration;

use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use failsafe::Error as FailsafeError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{breaker, Breaker, ClientError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub student_id: Uuid,
    pub account_number: String,
    pub bank_name: String,
    pub account_holder: String,
    pub branch_code: Option<String>,
}

#[async_trait]
pub trait BankingDirectory: Send + Sync {
    /// The active disbursement account for a student.
    async fn resolve_account(&self, student_id: Uuid) -> Result<BankAccount, ClientError>;

    /// Liveness probe for the health checker.
    async fn ping(&self) -> Result<(), ClientError>;
}

pub struct HttpBankingDirectory {
    client: Client,
    base_url: String,
    circuit_breaker: Breaker,
}

impl HttpBankingDirectory {
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

#[async_trait]
impl BankingDirectory for HttpBankingDirectory {
    async fn resolve_account(&self, student_id: Uuid) -> Result<BankAccount, ClientError> {
        let url = format!(
            "{}/accounts/student/{}",
            self.base_url.trim_end_matches('/'),
            student_id
        );
        let client = self.client.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).send().await?;

                if response.status() == 404 {
                    return Err(ClientError::NotFound("bank account", student_id.to_string()));
                }
                if !response.status().is_success() {
                    return Err(ClientError::UpstreamStatus(response.status().as_u16()));
                }

                let account = response.json::<BankAccount>().await?;
                Ok(account)
            })
            .await;

        match result {
            Ok(account) => Ok(account),
            Err(FailsafeError::Rejected) => Err(ClientError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }

    async fn ping(&self) -> Result<(), ClientError> {
        let url = format!("{}/health", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::UpstreamStatus(response.status().as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_account_success() {
        let mut server = mockito::Server::new_async().await;
        let student_id = Uuid::new_v4();
        let body = serde_json::json!({
            "student_id": student_id,
            "account_number": "9912345678",
            "bank_name": "FNB",
            "account_holder": "A Student",
            "branch_code": "250655"
        });
        let mock = server
            .mock("GET", format!("/accounts/student/{student_id}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let directory =
            HttpBankingDirectory::new(server.url(), Duration::from_secs(5));
        let account = directory.resolve_account(student_id).await.unwrap();

        assert_eq!(account.account_number, "9912345678");
        assert_eq!(account.bank_name, "FNB");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_account_not_found() {
        let mut server = mockito::Server::new_async().await;
        let student_id = Uuid::new_v4();
        server
            .mock("GET", format!("/accounts/student/{student_id}").as_str())
            .with_status(404)
            .create_async()
            .await;

        let directory =
            HttpBankingDirectory::new(server.url(), Duration::from_secs(5));
        let err = directory.resolve_account(student_id).await.unwrap_err();

        assert!(matches!(err, ClientError::NotFound("bank account", _)));
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let mut server = mockito::Server::new_async().await;
        let student_id = Uuid::new_v4();
        server
            .mock("GET", format!("/accounts/student/{student_id}").as_str())
            .with_status(503)
            .create_async()
            .await;

        let directory =
            HttpBankingDirectory::new(server.url(), Duration::from_secs(5));
        let err = directory.resolve_account(student_id).await.unwrap_err();

        assert!(matches!(err, ClientError::UpstreamStatus(503)));
    }
}
