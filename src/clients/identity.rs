//! Identity collaborator: turns a bearer token into a `Principal` used by
//! the auth middleware for role checks.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ClientError;
use crate::domain::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    FinanceOfficer,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::FinanceOfficer => "finance_officer",
            Role::Student => "student",
        }
    }

    /// Writes to rules, stipends and transfers need back-office roles.
    pub fn can_write(&self) -> bool {
        matches!(self, Role::Admin | Role::FinanceOfficer)
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "finance_officer" => Ok(Role::FinanceOfficer),
            "student" => Ok(Role::Student),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// The authenticated caller, resolved once per request and stored in
/// request extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub subject: Uuid,
    pub role: Role,
}

impl Principal {
    /// Actor string recorded on audit events.
    pub fn actor(&self) -> String {
        format!("{}:{}", self.role.as_str(), self.subject)
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Result<Principal, ClientError>;
}

pub struct HttpIdentityVerifier {
    client: Client,
    base_url: String,
}

impl HttpIdentityVerifier {
    pub fn new(base_url: String, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();

        Self { client, base_url }
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<Principal, ClientError> {
        let url = format!("{}/verify", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer_token)
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {
                let principal = response.json::<Principal>().await?;
                Ok(principal)
            }
            401 | 403 => Err(ClientError::NotFound("principal", "token rejected".to_string())),
            status => Err(ClientError::UpstreamStatus(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert_eq!(
            Role::from_str("finance_officer").unwrap(),
            Role::FinanceOfficer
        );
        assert!(Role::from_str("registrar").is_err());
    }

    #[test]
    fn test_write_roles() {
        assert!(Role::Admin.can_write());
        assert!(Role::FinanceOfficer.can_write());
        assert!(!Role::Student.can_write());
    }

    #[tokio::test]
    async fn test_verify_success() {
        let mut server = mockito::Server::new_async().await;
        let subject = Uuid::new_v4();
        let body = serde_json::json!({ "subject": subject, "role": "finance_officer" });
        server
            .mock("POST", "/verify")
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let verifier = HttpIdentityVerifier::new(server.url(), Duration::from_secs(5));
        let principal = verifier.verify("tok-1").await.unwrap();

        assert_eq!(principal.subject, subject);
        assert_eq!(principal.role, Role::FinanceOfficer);
    }

    #[tokio::test]
    async fn test_verify_rejected_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/verify")
            .with_status(401)
            .create_async()
            .await;

        let verifier = HttpIdentityVerifier::new(server.url(), Duration::from_secs(5));
        assert!(verifier.verify("bad").await.is_err());
    }
}
