use regex::Regex;
use shakmaty::Color;
use std::sync::LazyLock;
use std::time::Duration;

// `[%clk H:MM:SS]` or `[%clk H:MM:SS.f]`, as written by chess.com and lichess.
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%clk\s+(\d+):([0-5]?\d):([0-5]?\d(?:\.\d+)?)\s*\]").expect("valid clock regex")
});

/// Time remaining on the mover's clock, read from a move annotation.
///
/// Absent or malformed literals yield `None`; a missing clock is ordinary input.
pub fn extract(annotation: &str) -> Option<Duration> {
    let caps = CLOCK_RE.captures(annotation)?;

    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;

    let whole = hours.checked_mul(3600)?.checked_add(minutes * 60)?;
    Duration::try_from_secs_f64(whole as f64 + seconds).ok()
}

/// Per-side clock readings for one game.
#[derive(Debug, Default, Clone)]
pub struct ClockTracker {
    white: Option<Duration>,
    black: Option<Duration>,
}

impl ClockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed thinking time for `side` since its previous reading.
    ///
    /// Only call on `side`'s own ply. A reading higher than the previous one
    /// (increment, misread) counts as zero. An absent reading counts as zero
    /// and clears the baseline, so the next reading also counts as zero.
    pub fn advance(&mut self, side: Color, reading: Option<Duration>) -> Duration {
        let slot = match side {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };

        let previous = std::mem::replace(slot, reading);
        match (previous, reading) {
            (Some(previous), Some(reading)) => {
                previous.checked_sub(reading).unwrap_or(Duration::ZERO)
            }
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_chess_com_literal() {
        assert_eq!(
            extract("[%clk 0:03:01.5]"),
            Some(Duration::from_millis(181_500))
        );
    }

    #[test]
    fn test_extract_without_fraction_and_with_other_commands() {
        assert_eq!(
            extract("[%eval 0.25] [%clk 1:30:43]"),
            Some(Duration::from_secs(5443))
        );
    }

    #[test]
    fn test_extract_missing_or_malformed_is_none() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("great move"), None);
        assert_eq!(extract("[%clk 0:3]"), None);
        assert_eq!(extract("[%clk 0:99:00]"), None);
        assert_eq!(extract("[%clk abc]"), None);
    }

    #[test]
    fn test_advance_reports_own_side_delta() {
        let mut clocks = ClockTracker::new();
        assert_eq!(
            clocks.advance(Color::White, Some(Duration::from_secs(300))),
            Duration::ZERO
        );
        assert_eq!(
            clocks.advance(Color::Black, Some(Duration::from_secs(298))),
            Duration::ZERO
        );
        assert_eq!(
            clocks.advance(Color::White, Some(Duration::from_secs(280))),
            Duration::from_secs(20)
        );
        assert_eq!(
            clocks.advance(Color::Black, Some(Duration::from_secs(290))),
            Duration::from_secs(8)
        );
    }

    #[test]
    fn test_clock_increase_contributes_zero() {
        let mut clocks = ClockTracker::new();
        clocks.advance(Color::White, Some(Duration::from_secs(100)));
        assert_eq!(
            clocks.advance(Color::White, Some(Duration::from_secs(102))),
            Duration::ZERO
        );
        // The higher reading becomes the new baseline.
        assert_eq!(
            clocks.advance(Color::White, Some(Duration::from_secs(95))),
            Duration::from_secs(7)
        );
    }

    #[test]
    fn test_missing_reading_clears_baseline() {
        let mut clocks = ClockTracker::new();
        clocks.advance(Color::Black, Some(Duration::from_secs(60)));
        assert_eq!(clocks.advance(Color::Black, None), Duration::ZERO);
        assert_eq!(
            clocks.advance(Color::Black, Some(Duration::from_secs(50))),
            Duration::ZERO
        );
        assert_eq!(
            clocks.advance(Color::Black, Some(Duration::from_secs(45))),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_missing_reading_leaves_other_side_alone() {
        let mut clocks = ClockTracker::new();
        clocks.advance(Color::White, Some(Duration::from_secs(60)));
        clocks.advance(Color::Black, None);
        assert_eq!(
            clocks.advance(Color::White, Some(Duration::from_secs(55))),
            Duration::from_secs(5)
        );
    }
}
