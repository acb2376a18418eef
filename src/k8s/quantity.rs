//! Kubernetes resource quantity parsing.
//!
//! CPU quantities resolve to millicores, memory quantities to bytes. Binary
//! suffixes (`Ki`, `Mi`, `Gi`, `Ti`) are powers of 1024, decimal suffixes
//! (`K`, `M`, `G`, `T`) powers of 1000.

use regex::Regex;
use std::sync::LazyLock;

static CPU_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(m)?$").expect("valid regex"));

static MEMORY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(Ki|Mi|Gi|Ti|K|M|G|T)?$").expect("valid regex")
});

pub const MEBIBYTE: f64 = 1024.0 * 1024.0;

/// Parses a CPU quantity into millicores.
///
/// - "100m" -> 100
/// - "0.5" -> 500
/// - "2" -> 2000
pub fn parse_cpu_millicores(cpu: &str) -> Option<f64> {
    let caps = CPU_REGEX.captures(cpu.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(2).is_some() {
        Some(value)
    } else {
        Some(value * 1000.0)
    }
}

/// Parses a memory quantity into bytes.
///
/// - "128Mi" -> 134217728
/// - "64M" -> 64000000
pub fn parse_memory_bytes(memory: &str) -> Option<f64> {
    let caps = MEMORY_REGEX.captures(memory.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()).unwrap_or("") {
        "" => 1.0,
        "Ki" => 1024.0,
        "Mi" => MEBIBYTE,
        "Gi" => MEBIBYTE * 1024.0,
        "Ti" => MEBIBYTE * 1024.0 * 1024.0,
        "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        _ => return None,
    };
    Some(value * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu() {
        assert_eq!(parse_cpu_millicores("100m"), Some(100.0));
        assert_eq!(parse_cpu_millicores("0.5"), Some(500.0));
        assert_eq!(parse_cpu_millicores("2"), Some(2000.0));
        assert_eq!(parse_cpu_millicores("lots"), None);
    }

    #[test]
    fn test_memory_binary_vs_decimal() {
        assert_eq!(parse_memory_bytes("128Mi"), Some(128.0 * MEBIBYTE));
        assert_eq!(parse_memory_bytes("1Gi"), Some(1024.0 * MEBIBYTE));
        assert_eq!(parse_memory_bytes("64M"), Some(64_000_000.0));
        assert_eq!(parse_memory_bytes("1024"), Some(1024.0));
        assert!(parse_memory_bytes("64M").unwrap() < 64.0 * MEBIBYTE);
        assert_eq!(parse_memory_bytes("12Xi"), None);
    }
}
