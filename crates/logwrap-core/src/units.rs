//! Human-friendly size and duration parsing for CLI flags

use std::time::Duration;

use crate::error::{Error, Result};

/// Parse a size like `4096`, `512K`, `10M` or `1G` into bytes.
pub fn parse_size(input: &str) -> Result<u64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::config("empty size"));
    }

    let (digits, suffix) = split_suffix(s);
    let value: u64 = digits
        .parse()
        .map_err(|_| Error::config(format!("invalid size: {}", input)))?;

    let multiplier = match suffix.to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        _ => return Err(Error::config(format!("invalid size suffix: {}", input))),
    };

    if value == 0 {
        return Err(Error::config(format!("size must be positive: {}", input)));
    }

    value
        .checked_mul(multiplier)
        .ok_or_else(|| Error::config(format!("size overflows: {}", input)))
}

/// Parse a duration like `500` (ms), `30s`, `10m`, `12h` or `30d`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::config("empty duration"));
    }

    let (digits, suffix) = split_suffix(s);
    let value: u64 = digits
        .parse()
        .map_err(|_| Error::config(format!("invalid duration: {}", input)))?;

    let millis = match suffix.to_ascii_lowercase().as_str() {
        "" | "ms" => value,
        "s" => value * 1000,
        "m" => value * 60 * 1000,
        "h" => value * 60 * 60 * 1000,
        "d" => value * 24 * 60 * 60 * 1000,
        _ => {
            return Err(Error::config(format!(
                "invalid duration suffix: {}",
                input
            )))
        }
    };

    if millis == 0 {
        return Err(Error::config(format!(
            "duration must be positive: {}",
            input
        )));
    }

    Ok(Duration::from_millis(millis))
}

fn split_suffix(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    (&s[..end], &s[end..])
}
