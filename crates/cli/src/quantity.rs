//! Kubernetes resource quantity parsing
//!
//! CPU quantities become millicores and memory quantities become bytes.
//! Anything unparseable is reported as `None` so the caller can treat the
//! value as absent instead of failing the whole enumeration.

use once_cell::sync::Lazy;
use regex::Regex;

static CPU_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?|\.\d+)(m)?$").expect("valid cpu regex"));

static MEMORY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(Ki|Mi|Gi|Ti|Pi|Ei|k|K|M|G|T|P|E|m)?$")
        .expect("valid memory regex")
});

/// Parse a CPU quantity: `"500m"` is 500, `"2"` is 2000, `"0.5"` is 500
pub fn parse_cpu_millicores(cpu: &str) -> Option<u64> {
    let caps = CPU_REGEX.captures(cpu.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;

    if caps.get(2).is_some() {
        Some(value.ceil() as u64)
    } else {
        Some((value * 1000.0).round() as u64)
    }
}

/// Parse a memory quantity with binary (`Mi`, `Gi`) or decimal (`M`, `G`) suffix
pub fn parse_memory_bytes(memory: &str) -> Option<u64> {
    let caps = MEMORY_REGEX.captures(memory.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;

    let multiplier: f64 = match caps.get(2).map(|m| m.as_str()).unwrap_or("") {
        "" => 1.0,
        // Millibytes only show up from autoscalers; round to whole bytes
        "m" => 0.001,
        "Ki" => 1024.0,
        "Mi" => 1024.0_f64.powi(2),
        "Gi" => 1024.0_f64.powi(3),
        "Ti" => 1024.0_f64.powi(4),
        "Pi" => 1024.0_f64.powi(5),
        "Ei" => 1024.0_f64.powi(6),
        "k" | "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        _ => return None,
    };

    Some((value * multiplier).ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cpu() {
        assert_eq!(parse_cpu_millicores("500m"), Some(500));
        assert_eq!(parse_cpu_millicores("2"), Some(2000));
        assert_eq!(parse_cpu_millicores("0.5"), Some(500));
        assert_eq!(parse_cpu_millicores(".25"), Some(250));
        assert_eq!(parse_cpu_millicores(" 1500m "), Some(1500));
    }

    #[test]
    fn test_parse_cpu_rejects_garbage() {
        assert_eq!(parse_cpu_millicores(""), None);
        assert_eq!(parse_cpu_millicores("two"), None);
        assert_eq!(parse_cpu_millicores("1Gi"), None);
        assert_eq!(parse_cpu_millicores("-1"), None);
    }

    #[test]
    fn test_parse_memory_binary_and_decimal() {
        assert_eq!(parse_memory_bytes("128Mi"), Some(128 * 1024 * 1024));
        assert_eq!(parse_memory_bytes("1Gi"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_bytes("1.5Gi"), Some(1536 * 1024 * 1024));
        assert_eq!(parse_memory_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_memory_bytes("512k"), Some(512_000));
        assert_eq!(parse_memory_bytes("1048576"), Some(1_048_576));
    }

    #[test]
    fn test_parse_memory_rejects_garbage() {
        assert_eq!(parse_memory_bytes("lots"), None);
        assert_eq!(parse_memory_bytes("1GB"), None);
        assert_eq!(parse_memory_bytes(""), None);
    }
}
