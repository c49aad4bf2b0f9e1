use std::env;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::cloud::{AwsCredentials, CloudDefaults, Region};

/// Which compute backend the engine drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ec2,
    /// In-process provider; no cloud account needed
    Scripted,
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ec2" => Ok(Self::Ec2),
            "scripted" => Ok(Self::Scripted),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub provider: ProviderKind,
    pub region: Region,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub ami_id: Option<String>,
    /// Endpoint override for LocalStack or tests
    pub ec2_endpoint: Option<String>,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub interval: Duration,
    pub stale_after: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,

    // JWT
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,

    // Server
    pub host: String,
    pub port: u16,
    /// Browser origin admitted by CORS
    pub frontend_url: Option<String>,

    pub cloud: CloudConfig,
    pub reconciler: ReconcilerConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if exists

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            jwt_expiration_hours: parse_or("JWT_EXPIRATION_HOURS", 24)?,

            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 5000)?,
            frontend_url: optional("FRONTEND_URL"),

            cloud: CloudConfig {
                provider: parse_or("CLOUD_PROVIDER", ProviderKind::Ec2)?,
                region: parse_or("AWS_REGION", Region::UsEast1)?,
                access_key_id: optional("AWS_ACCESS_KEY_ID"),
                secret_access_key: optional("AWS_SECRET_ACCESS_KEY"),
                session_token: optional("AWS_SESSION_TOKEN"),
                ami_id: optional("AWS_AMI_ID"),
                ec2_endpoint: optional("EC2_ENDPOINT"),
                wait_timeout: secs_or("INSTANCE_WAIT_TIMEOUT_SECS", 300)?,
                poll_interval: secs_or("INSTANCE_POLL_INTERVAL_SECS", 5)?,
            },

            reconciler: ReconcilerConfig {
                interval: secs_or("RECONCILE_INTERVAL_SECS", 60)?,
                stale_after: secs_or("STALE_DEPLOYMENT_AFTER_SECS", 900)?,
            },
        })
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl CloudConfig {
    /// Process-wide defaults handed to the deployment engine
    pub fn defaults(&self) -> CloudDefaults {
        let credentials = match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                let mut credentials =
                    AwsCredentials::new(access_key_id.as_str(), secret_access_key.as_str());
                credentials.session_token = self.session_token.clone().map(SecretString::from);
                Some(credentials)
            }
            _ => None,
        };

        CloudDefaults {
            region: self.region,
            credentials,
            image_id: self.ami_id.clone(),
        }
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid(name))
}

/// Whole seconds, at least one
fn secs_or(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match optional(name) {
        Some(raw) => parse_secs(name, &raw),
        None => Ok(Duration::from_secs(default)),
    }
}

fn parse_secs(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match parse_value::<u64>(name, raw)? {
        0 => Err(ConfigError::Invalid(name)),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn cloud_config() -> CloudConfig {
        CloudConfig {
            provider: ProviderKind::Scripted,
            region: Region::EuCentral1,
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            session_token: None,
            ami_id: None,
            ec2_endpoint: None,
            wait_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("PORT", "8080").unwrap(), 8080);
        assert!(matches!(
            parse_value::<u16>("PORT", "eighty"),
            Err(ConfigError::Invalid("PORT"))
        ));
        assert_eq!(
            parse_value::<Region>("AWS_REGION", "ap-south-1").unwrap(),
            Region::ApSouth1
        );
        assert!(parse_value::<Region>("AWS_REGION", "sa-east-1").is_err());
        assert_eq!(
            parse_value::<ProviderKind>("CLOUD_PROVIDER", "Scripted").unwrap(),
            ProviderKind::Scripted
        );
    }

    #[test]
    fn test_parse_secs_rejects_zero() {
        assert_eq!(
            parse_secs("RECONCILE_INTERVAL_SECS", "30").unwrap(),
            Duration::from_secs(30)
        );
        assert!(matches!(
            parse_secs("RECONCILE_INTERVAL_SECS", "0"),
            Err(ConfigError::Invalid("RECONCILE_INTERVAL_SECS"))
        ));
        assert!(matches!(
            parse_secs("INSTANCE_POLL_INTERVAL_SECS", "0"),
            Err(ConfigError::Invalid("INSTANCE_POLL_INTERVAL_SECS"))
        ));
        assert!(parse_secs("INSTANCE_WAIT_TIMEOUT_SECS", "-5").is_err());
    }

    #[test]
    fn test_defaults_require_both_keys() {
        let mut config = cloud_config();
        let defaults = config.defaults();
        let credentials = defaults.credentials.unwrap();
        assert_eq!(credentials.access_key_id, "AKIDEXAMPLE");
        assert_eq!(credentials.secret_access_key.expose_secret(), "secret");
        assert_eq!(defaults.region, Region::EuCentral1);

        config.secret_access_key = None;
        assert!(config.defaults().credentials.is_none());
    }

    #[test]
    fn test_defaults_carry_session_token() {
        let mut config = cloud_config();
        config.session_token = Some("token".to_string());
        let credentials = config.defaults().credentials.unwrap();
        assert_eq!(
            credentials.session_token.unwrap().expose_secret(),
            "token"
        );
    }
}
