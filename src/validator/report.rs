//! Quality score and improvement suggestions.

use super::types::ValidationIssue;

/// 100 minus 15 per error, 5 per warning and 2 per info, floored at 0.
/// No resources scores 0.
pub fn quality_score(total_resources: usize, errors: usize, warnings: usize, info: usize) -> u32 {
    if total_resources == 0 {
        return 0;
    }
    let penalty = errors * 15 + warnings * 5 + info * 2;
    100usize.saturating_sub(penalty) as u32
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// Heuristic suggestions from issue counts and message keywords.
pub fn suggestions(
    errors: &[ValidationIssue],
    warnings: &[ValidationIssue],
    info: &[ValidationIssue],
) -> Vec<String> {
    let mut suggestions = Vec::new();

    if !errors.is_empty() {
        suggestions.push(format!(
            "Fix {} critical error{} before deploying",
            errors.len(),
            plural(errors.len())
        ));
    }
    if warnings.len() > 5 {
        suggestions.push("Consider addressing warnings to improve production readiness".to_string());
    }
    if info.len() > 10 {
        suggestions.push("Review informational items to follow Kubernetes best practices".to_string());
    }

    let advisory: Vec<String> = warnings
        .iter()
        .chain(info.iter())
        .map(|issue| issue.message.to_lowercase())
        .collect();
    let mentions = |words: &[&str]| advisory.iter().any(|m| words.iter().any(|w| m.contains(w)));

    if mentions(&["resource"]) {
        suggestions.push("Define resource requests and limits for better cluster management".to_string());
    }
    if mentions(&["probe", "health"]) {
        suggestions.push("Add health checks (liveness/readiness probes) for improved reliability".to_string());
    }
    if mentions(&["security"]) {
        suggestions.push("Apply security best practices (non-root user, read-only filesystem)".to_string());
    }
    suggestions
}
