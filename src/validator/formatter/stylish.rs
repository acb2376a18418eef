//! Stylish (coloured terminal) output formatter.

use crate::validator::{FileReport, Severity, ValidationIssue};
use colored::Colorize;

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Error => "error".red().bold().to_string(),
        Severity::Warning => "warning".yellow().to_string(),
        Severity::Info => "info".blue().to_string(),
    }
}

fn score_label(score: u32) -> String {
    let text = format!("{}/100", score);
    match score {
        80..=100 => text.green().bold().to_string(),
        50..=79 => text.yellow().bold().to_string(),
        _ => text.red().bold().to_string(),
    }
}

fn issue_line(issue: &ValidationIssue) -> String {
    let location = issue
        .line
        .map(|line| format!("{}:", line))
        .unwrap_or_default();
    let field = issue
        .field
        .as_deref()
        .map(|f| format!(" ({})", f.dimmed()))
        .unwrap_or_default();
    let rule = issue
        .rule
        .as_deref()
        .map(|r| format!("  {}", r.dimmed()))
        .unwrap_or_default();
    format!(
        "  {}{}  {}/{}  {}{}{}\n",
        location,
        severity_label(issue.severity),
        issue.kind,
        issue.resource,
        issue.message,
        field,
        rule
    )
}

pub fn format(reports: &[FileReport]) -> String {
    let mut output = String::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for report in reports {
        let result = &report.result;
        output.push_str(&format!(
            "\n{}  [{}]  score {}\n",
            report.source.underline(),
            report.kind,
            score_label(result.score)
        ));

        for issue in result.issues() {
            output.push_str(&issue_line(issue));
        }
        if !result.suggestions.is_empty() {
            output.push_str(&format!("  {}\n", "Suggestions:".bold()));
            for suggestion in &result.suggestions {
                output.push_str(&format!("    - {}\n", suggestion));
            }
        }
        output.push_str(&format!(
            "  {} of {} resources valid\n",
            result.summary.valid_resources, result.summary.total_resources
        ));

        total_errors += result.summary.error_count;
        total_warnings += result.summary.warning_count;
    }

    if total_errors > 0 || total_warnings > 0 {
        let mut parts = Vec::new();
        if total_errors > 0 {
            parts.push(format!(
                "{} {}",
                total_errors,
                if total_errors == 1 { "error" } else { "errors" }
            ));
        }
        if total_warnings > 0 {
            parts.push(format!(
                "{} {}",
                total_warnings,
                if total_warnings == 1 { "warning" } else { "warnings" }
            ));
        }
        output.push_str(&format!(
            "\n  {} problem{}\n",
            parts.join(" and "),
            if total_errors + total_warnings == 1 { "" } else { "s" }
        ));
    }
    output
}
