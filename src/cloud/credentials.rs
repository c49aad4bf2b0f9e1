use std::fmt;

use secrecy::SecretString;
use serde::Deserialize;

use crate::cloud::Region;
use crate::error::{AppError, AppResult};

/// Static AWS credentials used to sign provider requests
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: None,
        }
    }
}

/// Caller-supplied settings for a single start request. Never persisted.
#[derive(Clone, Default, Deserialize)]
pub struct CloudOverrides {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub image_id: Option<String>,
}

impl fmt::Debug for CloudOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudOverrides")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("region", &self.region)
            .field("image_id", &self.image_id)
            .finish()
    }
}

impl CloudOverrides {
    pub fn has_access_key(&self) -> bool {
        self.access_key_id.is_some()
    }

    pub fn has_secret_key(&self) -> bool {
        self.secret_access_key.is_some()
    }

    pub fn has_region(&self) -> bool {
        self.region.is_some()
    }
}

/// Process-wide provider defaults, built once from `Config` and handed to the engine
#[derive(Debug, Clone)]
pub struct CloudDefaults {
    pub region: Region,
    pub credentials: Option<AwsCredentials>,
    pub image_id: Option<String>,
}

/// Where the effective credentials came from (logged, never the values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Override,
    Default,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Override => f.write_str("override"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// Region and credentials a provider call is made with
#[derive(Debug, Clone)]
pub struct CloudTarget {
    pub region: Region,
    pub credentials: AwsCredentials,
}

/// Effective settings for one deployment attempt
#[derive(Debug, Clone)]
pub struct ResolvedCloudConfig {
    pub target: CloudTarget,
    /// `None` means the image must be resolved through the provider
    pub image_id: Option<String>,
    pub credential_source: CredentialSource,
}

impl CloudDefaults {
    /// Merge caller overrides over the web app's region and the process defaults.
    ///
    /// Region precedence: override, then `app_region`, then the default region.
    /// Credential overrides must carry both keys.
    pub fn resolve(
        &self,
        overrides: &CloudOverrides,
        app_region: Option<&str>,
    ) -> AppResult<ResolvedCloudConfig> {
        let region = match overrides.region.as_deref().or(app_region) {
            Some(code) => code.parse::<Region>()?,
            None => self.region,
        };

        let (credentials, credential_source) = match (
            non_empty(overrides.access_key_id.as_deref()),
            non_empty(overrides.secret_access_key.as_deref()),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => (
                AwsCredentials::new(access_key_id, secret_access_key),
                CredentialSource::Override,
            ),
            (None, None)
                if overrides.access_key_id.is_none() && overrides.secret_access_key.is_none() =>
            {
                let credentials = self.credentials.clone().ok_or_else(|| {
                    AppError::Validation("No AWS credentials configured".to_string())
                })?;
                (credentials, CredentialSource::Default)
            }
            _ => {
                return Err(AppError::Validation(
                    "AWS access key id and secret access key are both required".to_string(),
                ))
            }
        };

        let image_id = match overrides.image_id.as_deref() {
            Some(image_id) => Some(
                non_empty(Some(image_id))
                    .ok_or_else(|| AppError::Validation("AWS AMI id is required".to_string()))?
                    .to_string(),
            ),
            None => self.image_id.clone(),
        };

        Ok(ResolvedCloudConfig {
            target: CloudTarget {
                region,
                credentials,
            },
            image_id,
            credential_source,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
