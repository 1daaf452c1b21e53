//! Outbound HTTP collaborators. Each sits behind an `async_trait` trait so
//! the service layer and tests never touch reqwest directly; the HTTP impls
//! share a failsafe circuit breaker per upstream.

pub mod banking;
pub mod identity;
pub mod settlement;
pub mod students;

use std::time::Duration;

use failsafe::{backoff, failure_policy, StateMachine};
use thiserror::Error;

use crate::error::AppError;

pub use banking::{BankAccount, BankingDirectory, HttpBankingDirectory};
pub use identity::{HttpIdentityVerifier, IdentityVerifier, Principal, Role};
pub use settlement::{
    HttpSettlementOracle, SettlementError, SettlementOracle, SettlementReceipt, SettlementRequest,
};
pub use students::{HttpStudentDirectory, StudentDirectory, StudentRecord};

pub(crate) type Breaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Consecutive-failures policy with exponential backoff, shared by every
/// HTTP collaborator.
pub(crate) fn breaker(failure_threshold: u32, reset_timeout: Duration) -> Breaker {
    let backoff = backoff::exponential(Duration::from_secs(10), reset_timeout);
    let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
    failsafe::Config::new().failure_policy(policy).build()
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),
    #[error("invalid response from upstream: {0}")]
    InvalidResponse(String),
    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),
    #[error("circuit breaker open, upstream unavailable")]
    CircuitOpen,
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(kind, id) => AppError::NotFound(format!("{kind} {id}")),
            ClientError::Request(e) if e.is_timeout() => {
                AppError::Timeout("upstream request timed out".to_string())
            }
            other => AppError::Upstream(other.to_string()),
        }
    }
}
