//! Lookback offset parsing.

use anyhow::Context;
use sync_state::Lookback;

/// Parse a lookback offset like "3mo", "90d", "2w", "1y" into a [`Lookback`].
/// Supports:
/// - Plain numbers (interpreted as days): "30"
/// - Days suffix: "30d"
/// - Weeks suffix: "2w"
/// - Months suffix: "3mo" or "3m"
/// - Years suffix: "1y"
pub fn parse_lookback(s: &str) -> anyhow::Result<Lookback> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty lookback string");
    }

    // "mo" before "m" so that "3mo" is not read as "3m" + "o"
    if let Some(num_str) = s.strip_suffix("mo").or_else(|| s.strip_suffix('m')) {
        let months: u32 = num_str
            .parse()
            .with_context(|| format!("Invalid months value: {num_str}"))?;
        return Ok(Lookback::Months(months));
    }
    if let Some(num_str) = s.strip_suffix('y') {
        let years: u32 = num_str
            .parse()
            .with_context(|| format!("Invalid years value: {num_str}"))?;
        return Ok(Lookback::Months(years * 12));
    }
    if let Some(num_str) = s.strip_suffix('w') {
        let weeks: u32 = num_str
            .parse()
            .with_context(|| format!("Invalid weeks value: {num_str}"))?;
        return Ok(Lookback::Days(weeks * 7));
    }
    if let Some(num_str) = s.strip_suffix('d') {
        let days: u32 = num_str
            .parse()
            .with_context(|| format!("Invalid days value: {num_str}"))?;
        return Ok(Lookback::Days(days));
    }

    // No suffix - treat as days
    s.parse::<u32>()
        .map(Lookback::Days)
        .with_context(|| format!("Invalid lookback value: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lookback_units() {
        assert_eq!(parse_lookback("3mo").unwrap(), Lookback::Months(3));
        assert_eq!(parse_lookback("6m").unwrap(), Lookback::Months(6));
        assert_eq!(parse_lookback("1y").unwrap(), Lookback::Months(12));
        assert_eq!(parse_lookback("2w").unwrap(), Lookback::Days(14));
        assert_eq!(parse_lookback("45d").unwrap(), Lookback::Days(45));
        assert_eq!(parse_lookback(" 10 ").unwrap(), Lookback::Days(10));
    }

    #[test]
    fn test_parse_lookback_rejects_garbage() {
        assert!(parse_lookback("").is_err());
        assert!(parse_lookback("abc").is_err());
        assert!(parse_lookback("-3d").is_err());
        assert!(parse_lookback("3h").is_err());
    }
}
