use std::time::Duration;

/// Parse an interval like "1h", "30m", "45s", "1d" or a bare number of seconds.
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();

    let (digits, scale) = if let Some(days) = s.strip_suffix('d') {
        (days, 86_400)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600)
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s.as_str(), 1)
    };

    let value = digits
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("Invalid interval: {s}. Use format like '1h', '30m', '1d'"))?;

    if value == 0 {
        return Err("Interval must be greater than zero".to_string());
    }

    value
        .checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Interval too large: {s}"))
}

/// Render an interval as `HH:MM:SS`, hours growing past 24 as needed.
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    let (hours, rest) = (secs / 3600, secs % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
