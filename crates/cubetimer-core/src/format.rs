//! Display formatting for solve times.
//!
//! Statistics are returned unrounded; truncation to centiseconds only happens
//! here.

use crate::record::TimeEntry;
use crate::stats::Average;

/// `M:SS.cc` from one minute up, `S.cc` below. Centiseconds are truncated.
pub fn format_time(ms: f64) -> String {
    if !ms.is_finite() || ms < 0.0 {
        return "0.00".to_string();
    }
    let ms = ms.floor() as u64;
    let minutes = ms / 60_000;
    let seconds = (ms / 1000) % 60;
    let centis = (ms % 1000) / 10;
    if minutes > 0 {
        format!("{minutes}:{seconds:02}.{centis:02}")
    } else {
        format!("{seconds}.{centis:02}")
    }
}

/// [`format_time`] with trailing zeros removed (`12.30` -> `12.3`, `10.00` -> `10`).
pub fn format_time_compact(ms: f64) -> String {
    let full = format_time(ms);
    if !full.contains('.') {
        return full;
    }
    let trimmed = full.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `DNF`, or the effective time with a trailing `+` for a +2 penalty.
pub fn format_entry(entry: &TimeEntry) -> String {
    match entry.effective_time() {
        None => "DNF".to_string(),
        Some(ms) if entry.plus_two => format!("{}+", format_time(ms as f64)),
        Some(ms) => format_time(ms as f64),
    }
}

pub fn format_average(average: &Average) -> String {
    match average {
        Average::Insufficient => "-".to_string(),
        Average::Dnf => "DNF".to_string(),
        Average::Time(ms) => format_time_compact(*ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ms_to_datetime;

    #[test]
    fn formats_seconds_and_minutes() {
        assert_eq!(format_time(0.0), "0.00");
        assert_eq!(format_time(9_800.0), "9.80");
        assert_eq!(format_time(12_345.0), "12.34");
        assert_eq!(format_time(61_005.0), "1:01.00");
        assert_eq!(format_time(600_000.0), "10:00.00");
    }

    #[test]
    fn truncates_fractional_means() {
        assert_eq!(format_time(12_213.333), "12.21");
        assert_eq!(format_time(-5.0), "0.00");
        assert_eq!(format_time(f64::NAN), "0.00");
    }

    #[test]
    fn compact_trims_zeros() {
        assert_eq!(format_time_compact(12_300.0), "12.3");
        assert_eq!(format_time_compact(10_000.0), "10");
        assert_eq!(format_time_compact(0.0), "0");
        assert_eq!(format_time_compact(60_000.0), "1:00");
        assert_eq!(format_time_compact(12_340.0), "12.34");
    }

    #[test]
    fn entries_show_penalties() {
        let mut entry = TimeEntry::new(10_500, "R U", false, ms_to_datetime(0));
        assert_eq!(format_entry(&entry), "10.50");
        entry.plus_two = true;
        assert_eq!(format_entry(&entry), "12.50+");
        entry.plus_two = false;
        entry.dnf = true;
        assert_eq!(format_entry(&entry), "DNF");
    }

    #[test]
    fn averages_render_sentinels() {
        assert_eq!(format_average(&Average::Insufficient), "-");
        assert_eq!(format_average(&Average::Dnf), "DNF");
        assert_eq!(format_average(&Average::Time(12_213.33)), "12.21");
    }
}
