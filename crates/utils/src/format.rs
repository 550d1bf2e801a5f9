//! Formatting utilities: timestamps, USD values, token amounts.

/// Format a millisecond timestamp to human-readable UTC string.
/// Uses the Howard Hinnant civil-from-days algorithm.
pub fn format_timestamp_ms(ms: u64) -> String {
    let secs = (ms / 1000) as i64;
    let total_days = secs / 86400;
    let day_secs = (secs % 86400) as u32;
    let hours = day_secs / 3600;
    let minutes = (day_secs % 3600) / 60;
    let seconds = day_secs % 60;

    let z = total_days + 719468;
    let era = (if z >= 0 { z } else { z - 146096 }) / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!("{y:04}-{m:02}-{d:02} {hours:02}:{minutes:02}:{seconds:02}")
}

/// `$1,234.56`. Values under a cent keep significant digits.
pub fn format_usd(v: f64) -> String {
    if !v.is_finite() {
        return "—".into();
    }
    if v != 0.0 && v.abs() < 0.01 {
        return format!("${}", format_significant(v, 4));
    }
    let sign = if v < 0.0 { "-" } else { "" };
    let cents = (v.abs() * 100.0).round() as u128;
    format!("{sign}${}.{:02}", group_thousands(cents / 100), cents % 100)
}

/// Optional unit price; `—` for unknown.
pub fn format_price(p: Option<f64>) -> String {
    match p {
        Some(v) if v > 0.0 => format_usd(v),
        _ => "—".into(),
    }
}

/// Token amount with up to 4 decimals, trailing zeros trimmed.
pub fn format_amount(v: f64) -> String {
    if !v.is_finite() {
        return "—".into();
    }
    if v != 0.0 && v.abs() < 0.0001 {
        return format_significant(v, 3);
    }
    let fixed = format!("{:.4}", v.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let int_grouped = group_thousands(int.parse::<u128>().unwrap_or(0));
    let frac = frac.trim_end_matches('0');
    let sign = if v < 0.0 { "-" } else { "" };
    if frac.is_empty() {
        format!("{sign}{int_grouped}")
    } else {
        format!("{sign}{int_grouped}.{frac}")
    }
}

/// `0x1234…abcd` for table columns.
pub fn short_address(addr: &str) -> String {
    if addr.len() <= 12 || !addr.is_ascii() {
        return addr.to_string();
    }
    format!("{}…{}", &addr[..6], &addr[addr.len() - 4..])
}

/// `42s`, `5m`, `3h`, `2d`.
pub fn format_age(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86400),
    }
}

fn format_significant(v: f64, digits: usize) -> String {
    let magnitude = v.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    format!("{v:.decimals$}")
}

fn group_thousands(n: u128) -> String {
    let raw = n.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_ms() {
        assert_eq!(format_timestamp_ms(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp_ms(1_700_000_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(1234.567), "$1,234.57");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(-5.0), "-$5.00");
        assert_eq!(format_usd(0.00003123), "$0.00003123");
        assert_eq!(format_price(None), "—");
        assert_eq!(format_price(Some(0.0)), "—");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_500_000.0), "1,500,000");
        assert_eq!(format_amount(2.5), "2.5");
        assert_eq!(format_amount(0.12346), "0.1235");
        assert_eq!(format_amount(0.00001234), "0.0000123");
    }

    #[test]
    fn test_short_address_and_age() {
        assert_eq!(short_address("0x1234567890abcdef"), "0x1234…cdef");
        assert_eq!(short_address("native"), "native");
        assert_eq!(format_age(42), "42s");
        assert_eq!(format_age(600), "10m");
        assert_eq!(format_age(7200), "2h");
        assert_eq!(format_age(172_800), "2d");
    }
}
