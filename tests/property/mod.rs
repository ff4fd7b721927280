//! Property-based tests for naming, hashing and privilege rules

mod determinism;
mod privileges;
