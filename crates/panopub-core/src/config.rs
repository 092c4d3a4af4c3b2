//! Configuration module
//!
//! Env-driven configuration for the control plane and the processor runner.
//! Safe values are hard-coded as defaults; in particular webhook signature
//! verification is ON unless explicitly disabled.

use std::env;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_ARCHIVE_SIZE_MB: usize = 1024;
const GRANT_TTL_MINUTES: i64 = 15;
const JOB_TIMEOUT_SECS: i64 = 840;
const SWEEP_INTERVAL_SECS: u64 = 60;
const SESSION_RETENTION_DAYS: i32 = 7;
const ARCHIVE_RETENTION_DAYS: i32 = 90;
const INBOX_POLL_INTERVAL_SECS: u64 = 5;

/// Application configuration (control plane + processor runner).
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Opaque authorized-caller capability: requests to the operator API must
    /// present this key.
    pub service_api_key: Option<String>,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Ingestion configuration
    pub max_archive_size_bytes: usize,
    pub grant_ttl_minutes: i64,
    // Webhook configuration
    pub webhook_secret: Option<String>,
    /// Disabling trades integrity for availability in environments where the
    /// signing secret cannot be distributed.
    pub webhook_verify_signatures: bool,
    // Sweep configuration
    pub job_timeout_seconds: i64,
    pub sweep_interval_seconds: u64,
    pub session_retention_days: i32,
    pub archive_retention_days: i32,
    // Processor runner configuration
    pub inbox_poll_interval_seconds: u64,
    pub control_plane_url: String,
    pub cdn_invalidation_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let storage_backend =
            env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|s| match s.to_lowercase().as_str() {
                    "s3" => Some(StorageBackend::S3),
                    "local" => Some(StorageBackend::Local),
                    _ => None,
                });

        let max_archive_size_mb = env::var("MAX_ARCHIVE_SIZE_MB")
            .unwrap_or_else(|_| MAX_ARCHIVE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_ARCHIVE_SIZE_MB);

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            database_url: env::var("PANOPUB_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("PANOPUB_DATABASE_URL or DATABASE_URL must be set")
                })?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            service_api_key: env::var("SERVICE_API_KEY").ok(),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            max_archive_size_bytes: max_archive_size_mb * 1024 * 1024,
            grant_ttl_minutes: env::var("GRANT_TTL_MINUTES")
                .unwrap_or_else(|_| GRANT_TTL_MINUTES.to_string())
                .parse()
                .unwrap_or(GRANT_TTL_MINUTES),
            webhook_secret: env::var("WEBHOOK_SECRET").ok(),
            webhook_verify_signatures: env::var("WEBHOOK_VERIFY_SIGNATURES")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            job_timeout_seconds: env::var("JOB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| JOB_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(JOB_TIMEOUT_SECS),
            sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|_| SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(SWEEP_INTERVAL_SECS),
            session_retention_days: env::var("SESSION_RETENTION_DAYS")
                .unwrap_or_else(|_| SESSION_RETENTION_DAYS.to_string())
                .parse()
                .unwrap_or(SESSION_RETENTION_DAYS),
            archive_retention_days: env::var("ARCHIVE_RETENTION_DAYS")
                .unwrap_or_else(|_| ARCHIVE_RETENTION_DAYS.to_string())
                .parse()
                .unwrap_or(ARCHIVE_RETENTION_DAYS),
            inbox_poll_interval_seconds: env::var("INBOX_POLL_INTERVAL_SECONDS")
                .unwrap_or_else(|_| INBOX_POLL_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(INBOX_POLL_INTERVAL_SECS),
            control_plane_url: env::var("CONTROL_PLANE_URL")
                .unwrap_or_else(|_| "http://localhost:4000".to_string()),
            cdn_invalidation_enabled: env::var("CDN_INVALIDATION_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            Some(StorageBackend::S3) => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET must be set when STORAGE_BACKEND=s3"));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!("S3_REGION must be set when STORAGE_BACKEND=s3"));
                }
            }
            Some(StorageBackend::Local) => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local"
                    ));
                }
            }
            None => {
                return Err(anyhow::anyhow!("STORAGE_BACKEND must be set to 's3' or 'local'"));
            }
        }

        if self.webhook_verify_signatures && self.webhook_secret.is_none() {
            return Err(anyhow::anyhow!(
                "WEBHOOK_SECRET must be set unless WEBHOOK_VERIFY_SIGNATURES=false"
            ));
        }
        if self.is_production() && self.service_api_key.is_none() {
            return Err(anyhow::anyhow!("SERVICE_API_KEY must be set in production"));
        }

        if self.max_archive_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_ARCHIVE_SIZE_MB must be greater than zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            database_url: "postgresql://localhost/panopub".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 30,
            service_api_key: Some("test-key".to_string()),
            storage_backend: Some(StorageBackend::Local),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/panopub".to_string()),
            local_storage_base_url: Some("http://localhost:4000/files".to_string()),
            max_archive_size_bytes: 1024 * 1024,
            grant_ttl_minutes: 15,
            webhook_secret: Some("secret".to_string()),
            webhook_verify_signatures: true,
            job_timeout_seconds: 840,
            sweep_interval_seconds: 60,
            session_retention_days: 7,
            archive_retention_days: 90,
            inbox_poll_interval_seconds: 5,
            control_plane_url: "http://localhost:4000".to_string(),
            cdn_invalidation_enabled: false,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_secret_when_verification_on() {
        let mut config = test_config();
        config.webhook_secret = None;
        assert!(config.validate().is_err());

        config.webhook_verify_signatures = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_backend_settings() {
        let mut config = test_config();
        config.storage_backend = Some(StorageBackend::S3);
        assert!(config.validate().is_err());

        config.s3_bucket = Some("bucket".to_string());
        config.s3_region = Some("eu-west-1".to_string());
        assert!(config.validate().is_ok());
    }
}
