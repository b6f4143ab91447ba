//! Human readable download figures

/// Format an ETA: "Unknown", "45s", "2m", "2m 5s", "1h", "1h 3m".
pub fn format_eta(seconds: Option<u64>) -> String {
    let Some(seconds) = seconds else {
        return "Unknown".to_string();
    };

    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let (minutes, rest) = (seconds / 60, seconds % 60);
        if rest == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, rest)
        }
    } else {
        let (hours, minutes) = (seconds / 3600, (seconds % 3600) / 60);
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}

/// Format a byte count with one decimal: "512.0 B", "1.5 MB". Caps at GB.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", size, UNITS[unit])
}
