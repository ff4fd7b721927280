//! Shared identifiers and resource type names.

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte BLAKE3 digest
pub type Hash = [u8; 32];

/// CloudFormation type of the execution role
pub const IAM_ROLE_TYPE: &str = "AWS::IAM::Role";

/// CloudFormation type of a standalone role policy
pub const IAM_POLICY_TYPE: &str = "AWS::IAM::Policy";

/// CloudFormation type of the managed agent runtime
pub const AGENT_RUNTIME_TYPE: &str = "AWS::BedrockAgentCore::Runtime";

/// IAM policy language version rendered into every document
pub const POLICY_VERSION: &str = "2012-10-17";

/// Number of hex characters appended to a construct path
const LOGICAL_ID_HASH_LEN: usize = 8;

/// Synthesis-time identifier of a resource within a template.
///
/// LogicalId = alnum(path components) || upper_hex(hash(stack "/" path))[..8]
///
/// The suffix keeps ids unique across nested construct paths while the
/// human readable prefix stays searchable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Derive the logical id for a construct path inside a stack
    pub fn for_path(stack_name: &str, path: &[&str]) -> Self {
        let readable: String = path
            .iter()
            .flat_map(|component| component.chars())
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        let mut hasher = Hasher::new();
        hasher.update(stack_name.as_bytes());
        for component in path {
            hasher.update(b"/");
            hasher.update(component.as_bytes());
        }
        let digest = hex::encode_upper(hasher.finalize().as_bytes());

        LogicalId(format!("{}{}", readable, &digest[..LOGICAL_ID_HASH_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
