//! Shared presentation: headings and file listings.

use owo_colors::OwoColorize;
use std::path::PathBuf;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_written_files(paths: &[PathBuf]) -> String {
    let mut lines = vec![format!("Wrote {} file(s):", paths.len())];
    lines.extend(paths.iter().map(|p| format!("  {}", p.display())));
    lines.join("\n")
}
