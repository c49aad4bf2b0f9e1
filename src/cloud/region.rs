use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Regions a deployment may be provisioned in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Region {
    #[serde(rename = "us-east-1")]
    UsEast1,
    #[serde(rename = "us-west-1")]
    UsWest1,
    #[serde(rename = "eu-central-1")]
    EuCentral1,
    #[serde(rename = "ap-south-1")]
    ApSouth1,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::UsEast1,
        Region::UsWest1,
        Region::EuCentral1,
        Region::ApSouth1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsEast1 => "us-east-1",
            Self::UsWest1 => "us-west-1",
            Self::EuCentral1 => "eu-central-1",
            Self::ApSouth1 => "ap-south-1",
        }
    }

    /// Human readable location, e.g. "N. Virginia"
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::UsEast1 => "N. Virginia",
            Self::UsWest1 => "N. California",
            Self::EuCentral1 => "Frankfurt",
            Self::ApSouth1 => "Mumbai",
        }
    }

    pub fn country(&self) -> &'static str {
        match self {
            Self::UsEast1 | Self::UsWest1 => "US",
            Self::EuCentral1 => "DE",
            Self::ApSouth1 => "IN",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unsupported region: {}", s)))
    }
}
