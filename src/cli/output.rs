//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::StackError;

/// Map domain errors to a string for CLI output.
///
/// Validation failures list every deviation, one per line.
pub fn map_error(e: &StackError) -> String {
    match e {
        StackError::ValidationFailed(errors) => {
            let mut lines = vec![e.to_string()];
            lines.extend(
                errors
                    .iter()
                    .map(|err| format!("  - [{}] {}", err.category(), err)),
            );
            lines.join("\n")
        }
        other => other.to_string(),
    }
}
