//! Validation report presentation.

use crate::cli::presentation::shared::format_section_heading;
use crate::error::{StackError, ValidationError};
use crate::validate::ValidationReport;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Resource column for one error
fn subject(error: &ValidationError) -> String {
    match error {
        ValidationError::CountMismatch { resource_type, .. } => resource_type.clone(),
        ValidationError::PrivilegeViolation {
            logical_id,
            statement,
            ..
        } => format!("{} [{}]", logical_id, statement),
        ValidationError::PropertyMismatch {
            logical_id, path, ..
        } => format!("{}.{}", logical_id, path),
        ValidationError::NamingViolation { logical_id, .. } => logical_id.clone(),
    }
}

pub fn format_validation_report_text(report: &ValidationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Template validation")));
    out.push_str(&format!("  Resources checked: {}\n", report.resources_checked));
    out.push_str(&format!("  Statements checked: {}\n\n", report.statements_checked));

    if report.is_ok() {
        out.push_str(&format!("{}", "All checks passed".green()));
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Category", "Resource", "Detail"]);
    for error in report.errors() {
        table.add_row(vec![
            error.category().to_string(),
            subject(error),
            error.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&format!(
        "{}",
        format!("{} error(s)", report.errors().len()).red()
    ));
    out
}

pub fn format_validation_report_json(report: &ValidationReport) -> Result<String, StackError> {
    let out = serde_json::json!({
        "ok": report.is_ok(),
        "resources_checked": report.resources_checked,
        "statements_checked": report.statements_checked,
        "counts": report.counts_by_category(),
        "errors": report.errors(),
    });
    Ok(serde_json::to_string_pretty(&out)?)
}
