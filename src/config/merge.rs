//! Merge policy for layered configuration sources.

mod merge_policy;

pub use merge_policy::{builder_with_defaults, environment_source, ENV_PREFIX};
