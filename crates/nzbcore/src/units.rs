//! Byte-size and duration helpers shared by both downloader adapters.
//!
//! SABnzbd reports megabytes as fractional strings and speeds as
//! `"<number> <K|M|G>"`; NZBGet reports plain megabyte counts and byte
//! rates. Everything is normalized through these functions so the two
//! backends produce one display representation.

/// Sentinel rendered when a remaining time cannot be computed
/// (zero speed, empty queue).
pub const INFINITY: &str = "∞";

pub const KILOBYTE: u64 = 1024;
pub const MEGABYTE: u64 = 1024 * 1024;
pub const GIGABYTE: u64 = 1024 * 1024 * 1024;

const SUFFIXES: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

/// Formats a byte count as a human string with up to two decimals,
/// trailing zeros trimmed: `1536 -> "1.5 kB"`, `1024 -> "1 kB"`.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut idx = 0;
    while value >= 1024.0 && idx < SUFFIXES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, SUFFIXES[idx])
}

/// Formats a duration in seconds as `h:mm:ss` (or `m:ss` under an hour).
pub fn human_seconds(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Parses a SABnzbd composite speed string of the form `"<number> <unit>"`
/// (units `K`/`M`/`G`, case-insensitive) into a byte count.
///
/// Bare numbers pass through as bytes; anything unparseable yields 0.
pub fn parse_speed(text: &str) -> u64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0;
    }
    let (number, unit) = match trimmed.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(pos) => (&trimmed[..pos], trimmed[pos..].trim()),
        None => (trimmed, ""),
    };
    let value: f64 = match number.trim().parse() {
        Ok(v) => v,
        Err(_) => return 0,
    };
    let multiplier = match unit.to_ascii_uppercase().as_str() {
        "K" => KILOBYTE,
        "M" => MEGABYTE,
        "G" => GIGABYTE,
        _ => 1,
    };
    (value * multiplier as f64).floor() as u64
}

/// Floor-converts a fractional megabyte count to bytes.
/// Negative inputs clamp to 0.
pub fn mb_to_bytes(mb: f64) -> u64 {
    if mb <= 0.0 {
        return 0;
    }
    (mb * MEGABYTE as f64).floor() as u64
}
