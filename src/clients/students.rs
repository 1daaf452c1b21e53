//! Student directory collaborator. Student CRUD lives in a sibling
//! service; we only confirm existence and enrollment before paying out.

use std::time::Duration;

use async_trait::async_trait;
use failsafe::futures::CircuitBreaker;
use failsafe::Error as FailsafeError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{breaker, Breaker, ClientError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub is_enrolled: bool,
}

#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn get_student(&self, id: Uuid) -> Result<StudentRecord, ClientError>;

    async fn ping(&self) -> Result<(), ClientError>;
}

pub struct HttpStudentDirectory {
    client: Client,
    base_url: String,
    circuit_breaker: Breaker,
}

impl HttpStudentDirectory {
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
impl StudentDirectory for HttpStudentDirectory {
    async fn get_student(&self, id: Uuid) -> Result<StudentRecord, ClientError> {
        let url = format!("{}/students/{}", self.base_url.trim_end_matches('/'), id);
        let client = self.client.clone();

        let result = self
            .circuit_breaker
            .call(async move {
                let response = client.get(&url).send().await?;

                if response.status() == 404 {
                    return Err(ClientError::NotFound("student", id.to_string()));
                }
                if !response.status().is_success() {
                    return Err(ClientError::UpstreamStatus(response.status().as_u16()));
                }

                let student = response.json::<StudentRecord>().await?;
                Ok(student)
            })
            .await;

        match result {
            Ok(student) => Ok(student),
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
    async fn test_get_student_success() {
        let mut server = mockito::Server::new_async().await;
        let id = Uuid::new_v4();
        let body = serde_json::json!({
            "id": id,
            "full_name": "A Student",
            "email": "a.student@example.edu",
            "is_enrolled": true
        });
        server
            .mock("GET", format!("/students/{id}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let directory = HttpStudentDirectory::new(server.url(), Duration::from_secs(5));
        let student = directory.get_student(id).await.unwrap();

        assert!(student.is_enrolled);
        assert_eq!(student.id, id);
    }

    #[tokio::test]
    async fn test_get_student_not_found() {
        let mut server = mockito::Server::new_async().await;
        let id = Uuid::new_v4();
        server
            .mock("GET", format!("/students/{id}").as_str())
            .with_status(404)
            .create_async()
            .await;

        let directory = HttpStudentDirectory::new(server.url(), Duration::from_secs(5));
        let err = directory.get_student(id).await.unwrap_err();

        assert!(matches!(err, ClientError::NotFound("student", _)));
    }
}
