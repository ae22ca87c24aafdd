//! Human-readable rendering of durations and raw token amounts.

/// Render a span of seconds using its two most significant units,
/// e.g. `"6d 23h"`, `"4m 10s"`, `"0s"`.
pub fn format_duration(secs: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

    let mut parts = Vec::with_capacity(2);
    let mut rest = secs;
    for (size, suffix) in UNITS {
        let count = rest / size;
        rest %= size;
        if count > 0 || !parts.is_empty() {
            parts.push(format!("{count}{suffix}"));
        }
        if parts.len() == 2 {
            break;
        }
    }
    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Describe a period finish relative to `now`: `"3d 12h left"` or `"ended 5m ago"`.
pub fn format_remaining(finish: u64, now: u64) -> String {
    if finish > now {
        format!("{} left", format_duration(finish - now))
    } else {
        format!("ended {} ago", format_duration(now - finish))
    }
}

/// Render a raw integer amount with `decimals` fractional digits, trimming
/// trailing zeros: `format_amount(1_500_000, 6) == "1.5"`.
pub fn format_amount(raw: u128, decimals: u32) -> String {
    let Some(unit) = 10u128.checked_pow(decimals) else {
        return raw.to_string();
    };
    let whole = raw / unit;
    let frac = raw % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = decimals as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
