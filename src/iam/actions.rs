//! Action and resource classification.
//!
//! Decides which actions may legitimately pair with a `*` resource, and which
//! verbs count as sensitive when they do.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Actions with no resource-level scoping in IAM
pub const DEFAULT_UNSCOPED_ACTIONS: &[&str] = &[
    "ecr:GetAuthorizationToken",
    "xray:PutTraceSegments",
    "xray:PutTelemetryRecords",
    "xray:GetSamplingRules",
    "xray:GetSamplingTargets",
    "cloudwatch:PutMetricData",
    "logs:DescribeLogGroups",
];

/// Verb prefixes that mutate or execute
const SENSITIVE_VERBS: &[&str] = &[
    "Create", "Delete", "Put", "Update", "Attach", "Detach", "Pass", "Modify", "Tag", "Untag",
    "Invoke",
];

/// Wildcard resource marker
pub const WILDCARD: &str = "*";

/// Allow-list of inherently unscoped actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAllowList {
    actions: BTreeSet<String>,
}

impl Default for ActionAllowList {
    fn default() -> Self {
        Self {
            actions: DEFAULT_UNSCOPED_ACTIONS
                .iter()
                .map(|a| a.to_string())
                .collect(),
        }
    }
}

impl ActionAllowList {
    /// An allow-list with nothing on it
    pub fn empty() -> Self {
        Self {
            actions: BTreeSet::new(),
        }
    }

    /// Default list extended with additional actions
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        list.actions.extend(extra.into_iter().map(Into::into));
        list
    }

    /// Exact match; action names are compared case-insensitively like IAM does
    pub fn contains(&self, action: &str) -> bool {
        self.actions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(action))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// True for `*`, `service:*`, and partial wildcards such as `s3:Get*`
pub fn is_wildcard_action(action: &str) -> bool {
    action.contains('*')
}

pub fn is_wildcard_resource(resource: &str) -> bool {
    resource == WILDCARD
}

/// True when the verb part of `service:Verb` starts with a sensitive prefix
pub fn is_sensitive_action(action: &str) -> bool {
    let verb = match action.split_once(':') {
        Some((_, verb)) => verb,
        None => action,
    };
    SENSITIVE_VERBS.iter().any(|prefix| verb.starts_with(prefix))
}

/// Account field of an ARN (`arn:partition:service:region:account:resource`)
///
/// Returns None for strings that are not ARNs.
pub fn arn_account(resource: &str) -> Option<&str> {
    let mut parts = resource.splitn(6, ':');
    if parts.next()? != "arn" {
        return None;
    }
    let _partition = parts.next()?;
    let _service = parts.next()?;
    let _region = parts.next()?;
    let account = parts.next()?;
    parts.next()?;
    Some(account)
}
