//! Completion-ratio extraction from transcriber output lines.

use std::sync::LazyLock;

use regex::Regex;

// Pre-compiled regexes for the two progress markers the transcriber prints
static RE_FRACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("valid fraction regex"));
static RE_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*%").expect("valid percent regex"));

/// Ratios at or below this are too early to trust for progress or ETA.
pub const PROGRESS_EPSILON: f64 = 0.02;

/// Progress information found in one output line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProgress {
    /// Stage-local completion in `[0.0, 1.0]`.
    pub ratio: f64,
    pub message: String,
}

impl ParsedProgress {
    /// Whether the ratio is large enough to drive progress and ETA.
    pub fn is_significant(&self) -> bool {
        self.ratio > PROGRESS_EPSILON
    }
}

/// Scans a line for a `a/b` fraction or an `n%` percentage.
///
/// When both appear the percentage wins. A zero denominator or a number too
/// large to parse disqualifies that marker only.
pub fn parse_progress(line: &str) -> Option<ParsedProgress> {
    let mut parsed = None;

    if let Some(caps) = RE_FRACTION.captures(line) {
        let current = caps[1].parse::<u64>().ok();
        let total = caps[2].parse::<u64>().ok().filter(|t| *t > 0);
        if let (Some(current), Some(total)) = (current, total) {
            parsed = Some(ParsedProgress {
                ratio: (current as f64 / total as f64).min(1.0),
                message: format!("Transcribing audio ({}/{})", current, total),
            });
        }
    }

    if let Some(caps) = RE_PERCENT.captures(line) {
        if let Ok(percent) = caps[1].parse::<u64>() {
            parsed = Some(ParsedProgress {
                ratio: (percent as f64 / 100.0).min(1.0),
                message: format!("Transcribing audio ({}%)", percent),
            });
        }
    }

    parsed
}
