//! AgentStack: deterministic assembly of an AgentCore runtime stack
//!
//! Builds a least-privilege execution role, a content-addressed container
//! artifact and an agent runtime descriptor, synthesizes them into a
//! CloudFormation template, and validates templates against the expected
//! resource shape and privilege rules.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod iam;
pub mod logging;
pub mod runtime;
pub mod stack;
pub mod synthesis;
pub mod types;
pub mod validate;
