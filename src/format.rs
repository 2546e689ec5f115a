//! Human-readable sizes, elapsed times, and file names for display.

use std::time::Duration;

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Formats a byte count using binary units, e.g. `1.50 KB`.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    let mut unit = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && unit < UNITS.len() - 1 {
        scaled /= 1024;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        let divisor = (1u64 << (10 * unit)) as f64;
        format!("{:.2} {}", bytes as f64 / divisor, UNITS[unit])
    }
}

/// Formats how long an operation took, e.g. `4.2s` or `2m 07s`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        0..60 => format!("{secs}.{}s", d.subsec_millis() / 100),
        60..3600 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60),
    }
}

/// Shortens `name` to at most `max` characters, keeping its extension.
///
/// The cut is marked with `…`. Names that already fit are returned unchanged.
#[must_use]
pub fn truncate_name(name: &str, max: usize) -> String {
    let len = name.chars().count();
    if len <= max {
        return name.to_string();
    }
    if max <= 1 {
        return "…".chars().take(max).collect();
    }

    let ext: String = match name.rfind('.') {
        Some(dot) if dot > 0 && name[dot..].chars().count() < max => name[dot..].to_string(),
        _ => String::new(),
    };
    let keep = max - 1 - ext.chars().count();
    let head: String = name.chars().take(keep).collect();
    format!("{head}…{ext}")
}
