pub mod profiles;

use dotenvy::dotenv;
use profiles::{Profile, ProfileDefaults};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub http_port: u16,
    pub database_url: String,
    pub banking_endpoint: String,
    pub students_endpoint: String,
    pub identity_endpoint: String,
    pub settlement_endpoint: String,
    pub source_account: String,
    pub request_timeout_secs: u64,
    pub db_max_connections: u32,
    pub cors_allowed_origins: Option<String>,
}

pub struct ConfigInfo {
    pub config: Config,
    pub profile: Profile,
    pub overrides: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<ConfigInfo> {
        dotenv().ok();

        let profile = Profile::from_env();
        let defaults = ProfileDefaults::for_profile(profile);
        let mut overrides = Vec::new();

        let http_port = env::var("HTTP_PORT")
            .ok()
            .and_then(|v| {
                overrides.push("HTTP_PORT".to_string());
                v.parse().ok()
            })
            .unwrap_or(defaults.http_port);

        let database_url = env::var("DATABASE_URL").or_else(|_| {
            defaults
                .database_url
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))
        })?;
        if env::var("DATABASE_URL").is_ok() {
            overrides.push("DATABASE_URL".to_string());
        }

        let mut string_var = |name: &str, default: String| {
            env::var(name)
                .ok()
                .map(|v| {
                    overrides.push(name.to_string());
                    v
                })
                .unwrap_or(default)
        };

        let banking_endpoint = string_var("BANKING_ENDPOINT", defaults.banking_endpoint);
        let students_endpoint = string_var("STUDENTS_ENDPOINT", defaults.students_endpoint);
        let identity_endpoint = string_var("IDENTITY_ENDPOINT", defaults.identity_endpoint);
        let settlement_endpoint =
            string_var("SETTLEMENT_ENDPOINT", defaults.settlement_endpoint);
        let source_account = string_var("SOURCE_ACCOUNT", defaults.source_account);

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| {
                overrides.push("REQUEST_TIMEOUT_SECS".to_string());
                v.parse().ok()
            })
            .unwrap_or(defaults.request_timeout_secs);

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| {
                overrides.push("DB_MAX_CONNECTIONS".to_string());
                v.parse().ok()
            })
            .unwrap_or(defaults.db_max_connections);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|v| {
                overrides.push("CORS_ALLOWED_ORIGINS".to_string());
                Some(v)
            })
            .unwrap_or(defaults.cors_allowed_origins);

        Ok(ConfigInfo {
            config: Config {
                http_port,
                database_url,
                banking_endpoint,
                students_endpoint,
                identity_endpoint,
                settlement_endpoint,
                source_account,
                request_timeout_secs,
                db_max_connections,
                cors_allowed_origins,
            },
            profile,
            overrides,
        })
    }
}
