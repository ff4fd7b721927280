//! CLI domain: parse, route, output, and presentation only.
//! No stack assembly here; the single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{command_name, Cli, Commands};
pub use presentation::{
    format_config_json, format_config_text, format_lint_json, format_lint_text,
    format_section_heading, format_validation_report_json, format_validation_report_text,
    format_written_files, ConfigView,
};
pub use route::{CliOverrides, RunContext};
