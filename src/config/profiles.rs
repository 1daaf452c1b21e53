use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Staging,
    Production,
}

impl Profile {
    pub fn from_env() -> Self {
        std::env::var("APP_PROFILE")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "development" | "dev" => Some(Self::Development),
                "staging" | "stage" => Some(Self::Staging),
                "production" | "prod" => Some(Self::Production),
                _ => None,
            })
            .unwrap_or(Self::Development)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileDefaults {
    pub http_port: u16,
    pub database_url: Option<String>,
    pub banking_endpoint: String,
    pub students_endpoint: String,
    pub identity_endpoint: String,
    pub settlement_endpoint: String,
    pub source_account: String,
    pub request_timeout_secs: u64,
    pub db_max_connections: u32,
    pub cors_allowed_origins: Option<String>,
}

impl ProfileDefaults {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Development => Self {
                http_port: 3000,
                database_url: None,
                banking_endpoint: "http://localhost:8101".to_string(),
                students_endpoint: "http://localhost:8102".to_string(),
                identity_endpoint: "http://localhost:8103".to_string(),
                settlement_endpoint: "http://localhost:8104".to_string(),
                source_account: "UNIV-OPERATING".to_string(),
                request_timeout_secs: 30,
                db_max_connections: 5,
                cors_allowed_origins: None,
            },
            Profile::Staging => Self {
                http_port: 8080,
                database_url: None,
                banking_endpoint: "http://banking:8080".to_string(),
                students_endpoint: "http://students:8080".to_string(),
                identity_endpoint: "http://identity:8080".to_string(),
                settlement_endpoint: "http://settlement:8080".to_string(),
                source_account: "UNIV-OPERATING".to_string(),
                request_timeout_secs: 30,
                db_max_connections: 10,
                cors_allowed_origins: Some("https://staging.portal.example.edu".to_string()),
            },
            Profile::Production => Self {
                http_port: 8080,
                database_url: None,
                banking_endpoint: "http://banking:8080".to_string(),
                students_endpoint: "http://students:8080".to_string(),
                identity_endpoint: "http://identity:8080".to_string(),
                settlement_endpoint: "http://settlement:8080".to_string(),
                source_account: "UNIV-OPERATING".to_string(),
                request_timeout_secs: 20,
                db_max_connections: 20,
                cors_allowed_origins: Some("https://portal.example.edu".to_string()),
            },
        }
    }
}
