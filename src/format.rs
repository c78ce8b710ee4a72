//! Human-readable formatting for CLI output.

/// Format a byte count with a 1024 base, two decimals at most, and no
/// trailing zeros (`1536` is `1.5 KB`, not `1.50 KB`).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
        let exponent = exponent.min(UNITS.len() - 1);
        let value = bytes as f64 / 1024_f64.powi(exponent as i32);
        let rounded = (value * 100.0).round() / 100.0;
        // Strip trailing zeros the way a float-to-string round trip does.
        let mut text = format!("{rounded:.2}");
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
        format!("{text} {}", UNITS[exponent])
    }
}
