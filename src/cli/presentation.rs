//! CLI presentation: text and json formatters per command family.

mod config;
mod lint;
mod shared;
mod validation;

pub use config::{format_config_json, format_config_text, ConfigView};
pub use lint::{format_lint_json, format_lint_text};
pub use shared::{format_section_heading, format_written_files};
pub use validation::{format_validation_report_json, format_validation_report_text};
