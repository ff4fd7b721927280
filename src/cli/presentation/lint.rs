//! Lint findings presentation.

use crate::cli::presentation::shared::format_section_heading;
use crate::error::StackError;
use crate::iam::{FindingKind, StatementFinding};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

fn kind_label(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::WildcardActionOnWildcardResource => "wildcard action",
        FindingKind::SensitiveVerbOnWildcardResource => "sensitive verb",
    }
}

pub fn format_lint_text(findings: &[StatementFinding]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Policy lint")));
    if findings.is_empty() {
        out.push_str("No findings.");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Statement", "Action", "Finding"]);
    for finding in findings {
        table.add_row(vec![
            finding.statement.clone(),
            finding.action.clone(),
            kind_label(finding.kind).to_string(),
        ]);
    }
    out.push_str(&table.to_string());
    out
}

pub fn format_lint_json(findings: &[StatementFinding]) -> Result<String, StackError> {
    let out = serde_json::json!({
        "findings": findings,
        "total": findings.len(),
    });
    Ok(serde_json::to_string_pretty(&out)?)
}
