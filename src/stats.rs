/// Time-spent statistics for the popup
use crate::site_data::TimeSpent;

/// Get the top N sites by time spent
pub fn top_sites(time_spent: &TimeSpent, n: usize) -> Vec<(String, u64)> {
    let mut sites: Vec<(String, u64)> = time_spent
        .iter()
        .filter(|(_, secs)| *secs > 0)
        .map(|(domain, secs)| (domain.to_string(), secs))
        .collect();

    // Sort by time descending, then by domain name ascending
    sites.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    sites.into_iter().take(n).collect()
}

/// Share of the total, rounded down, 0-100.
pub fn percent_of(secs: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((secs.min(total) as u128 * 100) / total as u128) as u8
}

/// Human-readable duration: `1h 02m`, `3m 05s`, `42s`.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
