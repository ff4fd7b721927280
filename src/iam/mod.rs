//! IAM model: statements, documents, roles, and role policies.

pub mod actions;
pub mod document;
pub mod policy;
pub mod role;
pub mod statement;

pub use actions::ActionAllowList;
pub use document::{PolicyDocument, StatementGroup};
pub use policy::RolePolicy;
pub use role::{InlinePolicy, Role, RoleAssembler, AGENTCORE_SERVICE_PRINCIPAL};
pub use statement::{
    ConditionMap, Effect, FindingKind, PolicyStatement, StatementBuilder, StatementFinding,
};
