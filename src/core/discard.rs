//! Discard policy: whether a candidate has fallen below its bracket's threshold.

use crate::model::{Candidate, ScheduleVector};

/// Level at which a candidate is fully upgraded and no longer subject to discard.
pub const TERMINAL_LEVEL: u32 = 25;

/// First level of each bracket, in schedule order.
pub const BRACKET_START_LEVELS: [u32; 4] = [5, 10, 15, 20];

pub const BRACKET_LABELS: [&str; 4] = ["5-9", "10-14", "15-19", "20-24"];

/// Map a level to its bracket: `5..=9 -> 0`, `10..=14 -> 1`, `15..=19 -> 2`,
/// `20..=24 -> 3`. Anything else has no bracket.
pub fn bracket_index(level: u32) -> Option<usize> {
    match level {
        5..=9 => Some(0),
        10..=14 => Some(1),
        15..=19 => Some(2),
        20..=24 => Some(3),
        _ => None,
    }
}

/// A candidate is discarded when its success probability is strictly below
/// the threshold of its current bracket. Candidates without an analysis, at
/// the terminal level, or outside every bracket are kept.
pub fn is_discarded(candidate: &Candidate, schedule: &ScheduleVector) -> bool {
    let Some(analysis) = candidate.analysis.as_ref() else {
        return false;
    };
    if candidate.level() >= TERMINAL_LEVEL {
        return false;
    }
    match bracket_index(candidate.level()).and_then(|i| schedule.get(i)) {
        Some(threshold) => analysis.prob_above_threshold < threshold,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Analysis, Profile};

    fn candidate(level: u32, prob: f64) -> Candidate {
        Candidate {
            profile: Profile::at_level(level),
            analysis: Some(Analysis {
                prob_above_threshold: prob,
                prob_above_threshold_with_discard: prob,
                wasted_exp: 100.0,
                wasted_tuner: 10.0,
                score: 0.0,
                expected_score: 0.0,
            }),
        }
    }

    #[test]
    fn brackets_cover_levels_five_through_twenty_four() {
        assert_eq!(bracket_index(4), None);
        assert_eq!(bracket_index(5), Some(0));
        assert_eq!(bracket_index(9), Some(0));
        assert_eq!(bracket_index(10), Some(1));
        assert_eq!(bracket_index(19), Some(2));
        assert_eq!(bracket_index(24), Some(3));
        assert_eq!(bracket_index(25), None);
    }

    #[test]
    fn level_ten_below_threshold_is_discarded() {
        let c = candidate(10, 0.2);
        assert!(is_discarded(&c, &ScheduleVector::new([0.0, 0.3, 0.0, 0.0])));
        assert!(!is_discarded(&c, &ScheduleVector::new([0.0, 0.1, 0.0, 0.0])));
    }

    #[test]
    fn equality_is_kept() {
        let c = candidate(15, 0.25);
        assert!(!is_discarded(&c, &ScheduleVector::new([0.0, 0.0, 0.25, 0.0])));
    }

    #[test]
    fn terminal_and_unanalysed_candidates_are_kept() {
        let schedule = ScheduleVector::uniform(1.0);
        assert!(!is_discarded(&candidate(25, 0.0), &schedule));
        assert!(!is_discarded(&Candidate::new(Profile::at_level(10)), &schedule));
        assert!(!is_discarded(&candidate(0, 0.0), &schedule));
    }
}
