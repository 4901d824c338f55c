//! Formatting utilities for CLI output.

use std::time::Duration;

/// Format a large number with commas for readability.
///
/// # Examples
///
/// ```
/// use cp_cli_common::format_number;
///
/// assert_eq!(format_number(0), "0");
/// assert_eq!(format_number(1234), "1,234");
/// assert_eq!(format_number(1234567), "1,234,567");
/// ```
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

/// Format a duration as milliseconds below one second, seconds above.
///
/// # Examples
///
/// ```
/// use cp_cli_common::format_millis;
/// use std::time::Duration;
///
/// assert_eq!(format_millis(Duration::from_millis(250)), "250ms");
/// assert_eq!(format_millis(Duration::from_millis(2500)), "2.50s");
/// ```
pub fn format_millis(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
