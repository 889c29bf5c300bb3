//! Solve statistics.
//!
//! Every function is pure and works on raw entries in chronological order,
//! filtering DNFs itself. Results are unrounded milliseconds; see
//! [`crate::format`] for display.
//!
//! Trimmed averages drop DNFs from the window first, then trim `trim` results
//! from each end of the remaining valid times.

use serde::{Deserialize, Serialize};

use crate::record::TimeEntry;

/// Result of a trimmed rolling average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Average {
    /// Fewer solves than the window needs.
    Insufficient,
    /// Too few valid results left in the window.
    Dnf,
    /// Mean of the middle slice in milliseconds.
    Time(f64),
}

impl Average {
    pub fn value(&self) -> Option<f64> {
        match self {
            Average::Time(ms) => Some(*ms),
            _ => None,
        }
    }

    pub fn is_dnf(&self) -> bool {
        matches!(self, Average::Dnf)
    }
}

/// Window size and how many results are trimmed from each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageWindow {
    pub window: usize,
    pub trim: usize,
}

impl AverageWindow {
    pub const AO5: AverageWindow = AverageWindow { window: 5, trim: 1 };
    pub const AO12: AverageWindow = AverageWindow { window: 12, trim: 1 };
    pub const AO100: AverageWindow = AverageWindow {
        window: 100,
        trim: 5,
    };

    /// Valid results the window must hold for a value.
    pub fn counted(&self) -> usize {
        self.window.saturating_sub(2 * self.trim)
    }
}

fn valid_times(entries: &[TimeEntry]) -> impl Iterator<Item = u64> + '_ {
    entries.iter().filter_map(TimeEntry::effective_time)
}

fn mean_of(times: &[u64]) -> Option<f64> {
    if times.is_empty() {
        return None;
    }
    let sum: u64 = times.iter().sum();
    Some(sum as f64 / times.len() as f64)
}

/// Fastest non-DNF effective time.
pub fn best(entries: &[TimeEntry]) -> Option<u64> {
    valid_times(entries).min()
}

/// Slowest non-DNF effective time.
pub fn worst(entries: &[TimeEntry]) -> Option<u64> {
    valid_times(entries).max()
}

/// Arithmetic mean of non-DNF effective times.
pub fn mean(entries: &[TimeEntry]) -> Option<f64> {
    let times: Vec<u64> = valid_times(entries).collect();
    mean_of(&times)
}

/// Population standard deviation of non-DNF effective times (needs two).
pub fn standard_deviation(entries: &[TimeEntry]) -> Option<f64> {
    let times: Vec<u64> = valid_times(entries).collect();
    if times.len() < 2 {
        return None;
    }
    let avg = mean_of(&times)?;
    let variance = times
        .iter()
        .map(|t| {
            let diff = *t as f64 - avg;
            diff * diff
        })
        .sum::<f64>()
        / times.len() as f64;
    Some(variance.sqrt())
}

/// Trimmed mean of the last `n` entries.
///
/// DNFs count toward the window but are dropped before sorting. Returns
/// [`Average::Insufficient`] with fewer than `n` entries (or a degenerate
/// window) and [`Average::Dnf`] when fewer than `n - 2 * trim` valid times
/// are left in the window.
pub fn average_of_n(entries: &[TimeEntry], n: usize, trim: usize) -> Average {
    if n == 0 || 2 * trim >= n || entries.len() < n {
        return Average::Insufficient;
    }
    let window = &entries[entries.len() - n..];
    let mut times: Vec<u64> = valid_times(window).collect();
    if times.len() < n - 2 * trim || times.len() <= 2 * trim {
        return Average::Dnf;
    }
    times.sort_unstable();
    match mean_of(&times[trim..times.len() - trim]) {
        Some(ms) => Average::Time(ms),
        None => Average::Dnf,
    }
}

pub fn average_of(entries: &[TimeEntry], avg: AverageWindow) -> Average {
    average_of_n(entries, avg.window, avg.trim)
}

pub fn ao5(entries: &[TimeEntry]) -> Average {
    average_of(entries, AverageWindow::AO5)
}

pub fn ao12(entries: &[TimeEntry]) -> Average {
    average_of(entries, AverageWindow::AO12)
}

pub fn ao100(entries: &[TimeEntry]) -> Average {
    average_of(entries, AverageWindow::AO100)
}

/// Percentage change of the mean of the latest 5 solves against the 5
/// before them. Negative means getting faster.
///
/// `None` with fewer than 10 solves or when either half has no valid time.
pub fn trend(entries: &[TimeEntry]) -> Option<f64> {
    if entries.len() < 10 {
        return None;
    }
    let last_ten = &entries[entries.len() - 10..];
    let (earlier, recent) = last_ten.split_at(5);
    let earlier = mean(earlier)?;
    let recent = mean(recent)?;
    if earlier == 0.0 {
        return None;
    }
    Some((recent - earlier) / earlier * 100.0)
}

/// Fraction (0.0 to 1.0) of solves that are not DNF.
pub fn success_rate(entries: &[TimeEntry]) -> Option<f64> {
    if entries.is_empty() {
        return None;
    }
    let valid = valid_times(entries).count();
    Some(valid as f64 / entries.len() as f64)
}

/// Everything a statistics panel shows for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub solves: usize,
    pub valid_solves: usize,
    pub best: Option<u64>,
    pub worst: Option<u64>,
    pub mean: Option<f64>,
    pub ao5: Average,
    pub ao12: Average,
    pub ao100: Average,
    pub standard_deviation: Option<f64>,
    pub trend: Option<f64>,
    pub success_rate: Option<f64>,
}

impl SessionStats {
    pub fn from_entries(entries: &[TimeEntry]) -> Self {
        Self {
            solves: entries.len(),
            valid_solves: valid_times(entries).count(),
            best: best(entries),
            worst: worst(entries),
            mean: mean(entries),
            ao5: ao5(entries),
            ao12: ao12(entries),
            ao100: ao100(entries),
            standard_deviation: standard_deviation(entries),
            trend: trend(entries),
            success_rate: success_rate(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ms_to_datetime;

    fn solve(time: u64) -> TimeEntry {
        TimeEntry::new(time, "R U R' U'", false, ms_to_datetime(0))
    }

    fn dnf(time: u64) -> TimeEntry {
        let mut e = solve(time);
        e.dnf = true;
        e
    }

    fn solves(times: &[u64]) -> Vec<TimeEntry> {
        times.iter().copied().map(solve).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn ao5_trims_best_and_worst() {
        let entries = solves(&[10, 20, 30, 40, 50]);
        assert_eq!(ao5(&entries), Average::Time(30.0));
    }

    #[test]
    fn ao12_trims_one_each_side() {
        let times: Vec<u64> = (1..=12).map(|i| i * 10).collect();
        assert_eq!(ao12(&solves(&times)), Average::Time(65.0));
    }

    #[test]
    fn ao5_of_real_solves() {
        let entries = solves(&[12_340, 11_200, 15_670, 9_800, 13_100]);
        let avg = ao5(&entries).value().unwrap();
        assert_close(avg, (11_200.0 + 12_340.0 + 13_100.0) / 3.0);
        assert!((avg - 12_213.33).abs() < 0.01);
    }

    #[test]
    fn insufficient_entries() {
        assert_eq!(ao5(&solves(&[1, 2, 3, 4])), Average::Insufficient);
        assert_eq!(ao12(&solves(&[1; 11])), Average::Insufficient);
        assert_eq!(ao100(&[]), Average::Insufficient);
    }

    #[test]
    fn only_last_window_counts() {
        let entries = solves(&[1_000_000, 10, 20, 30, 40, 50]);
        assert_eq!(ao5(&entries), Average::Time(30.0));
    }

    #[test]
    fn dnf_is_dropped_before_trimming() {
        let mut entries = solves(&[10, 20, 30, 40]);
        entries.push(dnf(1));
        // valid 10 20 30 40 -> middle 20 30
        assert_eq!(ao5(&entries), Average::Time(25.0));
    }

    #[test]
    fn ao5_needs_three_valid_results() {
        let mut entries = solves(&[10, 20, 30]);
        entries.push(dnf(1));
        entries.push(dnf(2));
        assert_eq!(ao5(&entries), Average::Time(20.0));

        let mut entries = solves(&[10, 20]);
        entries.extend((0..3).map(dnf));
        assert_eq!(ao5(&entries), Average::Dnf);
    }

    #[test]
    fn ao12_needs_ten_valid_results() {
        let mut entries: Vec<TimeEntry> = (1..=10).map(|i| solve(i * 10)).collect();
        entries.extend([dnf(1), dnf(2)]);
        // valid 10..=100 -> middle 20..=90
        assert_close(ao12(&entries).value().unwrap(), 55.0);

        entries.push(dnf(3));
        assert_eq!(ao12(&entries), Average::Dnf);
    }

    #[test]
    fn ao100_requires_ninety_valid() {
        let mut entries: Vec<TimeEntry> = (1..=90).map(|i| solve(i * 100)).collect();
        entries.extend((0..10).map(dnf));
        let avg = ao100(&entries).value().unwrap();
        // valid 100..=9000 -> drop 100..=500 and 8600..=9000
        let expected: u64 = (6..=85).map(|i| i * 100).sum();
        assert_close(avg, expected as f64 / 80.0);

        entries.push(dnf(0));
        assert_eq!(ao100(&entries), Average::Dnf);
    }

    #[test]
    fn plus_two_counts_in_effective_time() {
        let mut entries = solves(&[10_000, 11_000, 12_000, 13_000, 14_000]);
        entries[2].plus_two = true;
        // 10 11 13 14 14(+2) -> middle 11 13 14
        assert_close(ao5(&entries).value().unwrap(), 38_000.0 / 3.0);
        assert_eq!(best(&entries), Some(10_000));
        assert_eq!(worst(&entries), Some(14_000));
    }

    #[test]
    fn best_and_worst_ignore_dnf() {
        let entries = vec![dnf(9_999), solve(500), solve(100)];
        assert_eq!(best(&entries), Some(100));
        assert_eq!(worst(&entries), Some(500));
        assert_close(mean(&entries).unwrap(), 300.0);
    }

    #[test]
    fn empty_history_has_no_values() {
        assert_eq!(best(&[]), None);
        assert_eq!(worst(&[]), None);
        assert_eq!(mean(&[]), None);
        assert_eq!(success_rate(&[]), None);
        assert_eq!(standard_deviation(&[solve(1)]), None);
        assert_eq!(best(&[dnf(5)]), None);
    }

    #[test]
    fn standard_deviation_is_population() {
        let entries = solves(&[2, 4, 4, 4, 5, 5, 7, 9]);
        assert_close(standard_deviation(&entries).unwrap(), 2.0);
    }

    #[test]
    fn trend_compares_halves_of_last_ten() {
        let mut times = vec![20_000; 5];
        times.extend([10_000; 5]);
        assert_close(trend(&solves(&times)).unwrap(), -50.0);
        assert_eq!(trend(&solves(&[1; 9])), None);
    }

    #[test]
    fn success_rate_counts_all_history() {
        let entries = vec![solve(1), dnf(2), solve(3), dnf(4)];
        assert_close(success_rate(&entries).unwrap(), 0.5);
    }

    #[test]
    fn session_stats_summary() {
        let entries = solves(&[12_340, 11_200, 15_670, 9_800, 13_100]);
        let stats = SessionStats::from_entries(&entries);
        assert_eq!(stats.solves, 5);
        assert_eq!(stats.valid_solves, 5);
        assert_eq!(stats.best, Some(9_800));
        assert_eq!(stats.worst, Some(15_670));
        assert!(stats.ao5.value().is_some());
        assert_eq!(stats.ao12, Average::Insufficient);
        assert_eq!(stats.trend, None);

        let json = serde_json::to_string(&stats).unwrap();
        let back: SessionStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back.solves, 5);
        assert_eq!(back.best, stats.best);
        assert_eq!(back.ao12, Average::Insufficient);
    }

    #[test]
    fn degenerate_windows_are_insufficient() {
        let entries = solves(&[1, 2, 3]);
        assert_eq!(average_of_n(&entries, 0, 0), Average::Insufficient);
        assert_eq!(average_of_n(&entries, 2, 1), Average::Insufficient);
        assert_eq!(AverageWindow::AO100.counted(), 90);
    }
}
