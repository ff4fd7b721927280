//! Deployment target resolution: account and region with fallback chains.
//!
//! Resolved once at process start and passed explicitly to the assembler.

use crate::config::StackSettings;
use crate::error::ConfigurationError;
use serde::Serialize;

/// Account fallbacks, in order, after the explicit `stack.account`
pub const ACCOUNT_ENV_CHAIN: &[&str] = &["CDK_DEFAULT_ACCOUNT", "AWS_DEFAULT_ACCOUNT_ID"];

/// Region fallbacks, in order, after the explicit `stack.region`
pub const REGION_ENV_CHAIN: &[&str] = &["CDK_DEFAULT_REGION", "AWS_DEFAULT_REGION"];

/// Account and region a stack is synthesized for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentTarget {
    account: String,
    region: String,
}

impl DeploymentTarget {
    /// Validated target from explicit values
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let account = account.into();
        let region = region.into();

        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigurationError::InvalidAccount(account));
        }
        if !is_valid_region(&region) {
            return Err(ConfigurationError::InvalidRegion(region));
        }

        Ok(Self { account, region })
    }

    /// Resolve from settings, falling back to the process environment
    pub fn resolve(settings: &StackSettings) -> Result<Self, ConfigurationError> {
        Self::resolve_with(settings, |key| std::env::var(key).ok())
    }

    /// Resolve from settings, falling back to `lookup` for environment values.
    ///
    /// Empty values count as missing. Both missing values are reported together.
    pub fn resolve_with<F>(settings: &StackSettings, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: &Option<String>, chain: &[&str]| -> Option<String> {
            explicit
                .clone()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| {
                    chain
                        .iter()
                        .filter_map(|key| lookup(*key))
                        .find(|v| !v.trim().is_empty())
                })
        };

        let account = pick(&settings.account, ACCOUNT_ENV_CHAIN);
        let region = pick(&settings.region, REGION_ENV_CHAIN);

        match (account, region) {
            (Some(account), Some(region)) => Self::new(account.trim(), region.trim()),
            (None, None) => Err(ConfigurationError::MissingDeploymentTarget {
                missing: "account and region".to_string(),
            }),
            (None, Some(_)) => Err(ConfigurationError::MissingDeploymentTarget {
                missing: "account".to_string(),
            }),
            (Some(_), None) => Err(ConfigurationError::MissingDeploymentTarget {
                missing: "region".to_string(),
            }),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// ARN partition for the region
    pub fn partition(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "aws-cn"
        } else if self.region.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }

    /// `account-region`, used to separate asset identities per environment
    pub fn qualifier(&self) -> String {
        format!("{}-{}", self.account, self.region)
    }
}

/// `xx-name-N` and `xx-name-name-N`, lowercase
fn is_valid_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    let (first, middle, last) = match parts.as_slice() {
        [first, middle @ .., last] if !middle.is_empty() => (first, middle, last),
        _ => return false,
    };
    first.len() == 2
        && first.chars().all(|c| c.is_ascii_lowercase())
        && middle
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()))
        && !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
}
