//! Session state shared by the editors, the automation loop and the panel.

use std::fs;
use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::discard::{is_discarded, TERMINAL_LEVEL};
use crate::history::{cmp_wasted, HistoryEntry, HistoryLedger, HistorySortKey};
use crate::model::{
    Analysis, BriefAnalysis, Candidate, CandidateStatus, ExampleProfile, ScheduleVector,
    WeightVector, BRACKETS, UNBOUNDED_DISPLAY_CUTOFF,
};
use crate::service::{FilterSelection, ScoringQuery};

/// Most target entries the brief analysis accepts.
pub const MAX_TARGETS: usize = 5;

/// Default thresholds are this factor above the brief success probability.
pub const DEFAULT_THRESHOLD_FACTOR: f64 = 1.1;

/// Scoring policy: per-entry coefficients, target entry values, locked keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringInputs {
    #[serde(default)]
    pub coef: HashMap<String, f64>,
    #[serde(default)]
    pub targets: HashMap<String, f64>,
    #[serde(default)]
    pub locked_keys: Vec<String>,
}

impl ScoringInputs {
    /// `Σ target[k] * coef[k]`, rounded to two decimals.
    pub fn score_threshold(&self) -> f64 {
        let total: f64 = self
            .targets
            .iter()
            .map(|(k, t)| t * self.coef.get(k).copied().unwrap_or(0.0))
            .sum();
        (total * 100.0).round() / 100.0
    }

    pub fn nonzero_targets(&self) -> usize {
        self.targets.values().filter(|v| **v != 0.0).count()
    }

    pub fn is_valid(&self) -> bool {
        self.nonzero_targets() <= MAX_TARGETS
    }

    pub fn query(&self) -> ScoringQuery {
        ScoringQuery {
            coef: self.coef.clone(),
            score_thres: self.score_threshold(),
            locked_keys: self.locked_keys.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Standalone actions that carry a visible status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Brief,
    ApplySchedule,
    Optimal,
    Example,
    Filter,
    Scan,
    Run,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Brief,
        Action::ApplySchedule,
        Action::Optimal,
        Action::Example,
        Action::Filter,
        Action::Scan,
        Action::Run,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Brief => "brief",
            Action::ApplySchedule => "apply",
            Action::Optimal => "optimal",
            Action::Example => "example",
            Action::Filter => "filter",
            Action::Scan => "scan",
            Action::Run => "run",
        }
    }
}

/// Latest result of an example lookup for one bracket row.
#[derive(Debug, Clone, PartialEq)]
pub enum ExampleLookup {
    Found {
        bracket: usize,
        example: ExampleProfile,
    },
    NotFound {
        bracket: usize,
    },
    Failed {
        bracket: usize,
    },
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub schedule: ScheduleVector,
    pub weights: WeightVector,
    pub scoring: ScoringInputs,
    pub candidates: Vec<Candidate>,
    pub history: HistoryLedger,
    pub history_sort: HistorySortKey,
    pub selected_history: Option<u64>,
    pub brief: Option<BriefAnalysis>,
    /// Result of the last aggregate "apply schedule".
    pub aggregate: Option<Analysis>,
    pub filter: FilterSelection,
    /// Candidate currently being advanced by the automation loop.
    pub active_candidate: Option<usize>,
    pub example: Option<ExampleLookup>,
    status: [ActionStatus; Action::ALL.len()],
}

/// Persisted subset of the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub schedule: ScheduleVector,
    pub weights: WeightVector,
    pub scoring: ScoringInputs,
    pub history: HistoryLedger,
    pub history_sort: HistorySortKey,
    pub filter: FilterSelection,
    pub candidates: Vec<Candidate>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> ScoringQuery {
        self.scoring.query()
    }

    /// History entry whose result is currently shown.
    pub fn selected_entry(&self) -> Option<&HistoryEntry> {
        self.history.get(self.selected_history?)
    }

    pub fn status(&self, action: Action) -> ActionStatus {
        self.status[action.index()]
    }

    pub fn set_status(&mut self, action: Action, status: ActionStatus) {
        self.status[action.index()] = status;
    }

    /// The automation start gesture needs a successful filter and scan.
    pub fn start_enabled(&self) -> bool {
        self.status(Action::Filter) == ActionStatus::Succeeded
            && self.status(Action::Scan) == ActionStatus::Succeeded
    }

    pub fn invalidate_analyses(&mut self) {
        for c in &mut self.candidates {
            c.invalidate();
        }
    }

    /// Scoring inputs changed: history, aggregate and every candidate
    /// analysis are stale.
    pub fn on_scoring_inputs_changed(&mut self) {
        self.history.clear();
        self.selected_history = None;
        self.aggregate = None;
        self.invalidate_analyses();
        debug!(
            score_thres = self.scoring.score_threshold(),
            "scoring inputs changed"
        );
    }

    pub fn set_coef(&mut self, key: &str, value: f64) {
        if value == 0.0 {
            self.scoring.coef.remove(key);
        } else {
            self.scoring.coef.insert(key.to_string(), value);
        }
        self.on_scoring_inputs_changed();
    }

    pub fn set_target(&mut self, key: &str, value: f64) {
        if value == 0.0 {
            self.scoring.targets.remove(key);
        } else {
            self.scoring.targets.insert(key.to_string(), value);
        }
        self.on_scoring_inputs_changed();
    }

    pub fn set_locked_keys(&mut self, keys: Vec<String>) {
        self.scoring.locked_keys = keys;
        self.on_scoring_inputs_changed();
    }

    /// Thresholds for "apply defaults", if a brief analysis is available.
    pub fn default_thresholds(&self) -> Option<[f64; BRACKETS]> {
        let prob = self.brief?.prob_above_threshold;
        Some([(prob * DEFAULT_THRESHOLD_FACTOR).min(1.0); BRACKETS])
    }

    /// Replace the candidate list with fresh, unanalysed profiles.
    pub fn replace_candidates(&mut self, candidates: Vec<Candidate>) {
        info!(count = candidates.len(), "candidate list replaced");
        self.candidates = candidates;
        self.active_candidate = None;
    }

    /// Next candidate for the automation loop: below the terminal level,
    /// analysed, not discarded, with the lowest bounded non-negative wasted
    /// experience. Ties keep list order.
    pub fn select_next_candidate(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, c) in self.candidates.iter().enumerate() {
            if c.level() >= TERMINAL_LEVEL || is_discarded(c, &self.schedule) {
                continue;
            }
            let Some(a) = c.analysis.as_ref() else {
                continue;
            };
            let exp = a.wasted_exp;
            if !(0.0..UNBOUNDED_DISPLAY_CUTOFF).contains(&exp) {
                continue;
            }
            match best {
                Some((_, b)) if b <= exp => {}
                _ => best = Some((i, exp)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn candidate_status(&self, index: usize) -> Option<CandidateStatus> {
        let c = self.candidates.get(index)?;
        if self.active_candidate == Some(index) {
            return Some(CandidateStatus::Active);
        }
        let Some(a) = c.analysis.as_ref() else {
            return Some(CandidateStatus::Pending);
        };
        let status = if a.prob_above_threshold_with_discard == 1.0 {
            CandidateStatus::Achieved
        } else if a.prob_above_threshold_with_discard == 0.0 {
            CandidateStatus::Failed
        } else if is_discarded(c, &self.schedule) {
            CandidateStatus::Discarded
        } else {
            CandidateStatus::Eligible
        };
        Some(status)
    }

    /// Indices in display order: analysed candidates by wasted experience
    /// (unbounded last), then the unanalysed ones in list order.
    pub fn display_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.candidates.len()).collect();
        order.sort_by(|&a, &b| {
            let ea = self.candidates[a].analysis.map(|x| x.wasted_exp);
            let eb = self.candidates[b].analysis.map(|x| x.wasted_exp);
            match (ea, eb) {
                (Some(x), Some(y)) => cmp_wasted(x, y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        order
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            schedule: self.schedule,
            weights: self.weights,
            scoring: self.scoring.clone(),
            history: self.history.clone(),
            history_sort: self.history_sort,
            filter: self.filter.clone(),
            candidates: self.candidates.clone(),
        }
    }

    pub fn from_snapshot(snap: SessionSnapshot) -> Self {
        Self {
            schedule: snap.schedule,
            weights: snap.weights,
            scoring: snap.scoring,
            history: snap.history,
            history_sort: snap.history_sort,
            filter: snap.filter,
            candidates: snap.candidates,
            ..Self::default()
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text =
            serde_json::to_string_pretty(&self.snapshot()).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "session saved");
        Ok(())
    }

    /// Load a saved session; a missing file is a fresh session.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let snap: SessionSnapshot =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_snapshot(snap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Profile, UNBOUNDED};

    fn analysed(level: u32, prob: f64, exp: f64) -> Candidate {
        Candidate {
            profile: Profile::at_level(level),
            analysis: Some(Analysis {
                prob_above_threshold: prob,
                prob_above_threshold_with_discard: prob,
                wasted_exp: exp,
                wasted_tuner: 0.0,
                score: 0.0,
                expected_score: 0.0,
            }),
        }
    }

    #[test]
    fn score_threshold_sums_weighted_targets() {
        let mut s = ScoringInputs::default();
        s.coef.insert("crit_rate".into(), 2.0);
        s.coef.insert("crit_dmg".into(), 1.0);
        s.targets.insert("crit_rate".into(), 6.3);
        s.targets.insert("crit_dmg".into(), 12.6);
        s.targets.insert("hp".into(), 100.0);
        assert_eq!(s.score_threshold(), 25.2);
        assert!(s.is_valid());
    }

    #[test]
    fn more_than_five_targets_is_invalid() {
        let mut s = ScoringInputs::default();
        for k in ["a", "b", "c", "d", "e", "f"] {
            s.targets.insert(k.into(), 1.0);
        }
        assert!(!s.is_valid());
        s.targets.insert("f".into(), 0.0);
        assert!(s.is_valid());
    }

    #[test]
    fn apply_defaults_is_brief_probability_plus_ten_percent() {
        let mut s = SessionState::new();
        assert_eq!(s.default_thresholds(), None);
        s.brief = Some(BriefAnalysis {
            expected_score: 20.0,
            prob_above_threshold: 0.5,
        });
        assert_eq!(s.default_thresholds(), Some([0.55; BRACKETS]));
        s.brief = Some(BriefAnalysis {
            expected_score: 20.0,
            prob_above_threshold: 0.95,
        });
        assert_eq!(s.default_thresholds(), Some([1.0; BRACKETS]));
    }

    #[test]
    fn scoring_change_clears_history_and_analyses() {
        let mut s = SessionState::new();
        s.candidates.push(analysed(10, 0.5, 100.0));
        s.history.record(ScheduleVector::default(), 0.5, 1.0, 1.0);
        s.aggregate = s.candidates[0].analysis;
        s.set_target("crit_rate", 6.3);
        assert!(s.history.is_empty());
        assert!(s.aggregate.is_none());
        assert!(s.candidates[0].analysis.is_none());
    }

    #[test]
    fn selection_prefers_lowest_bounded_exp_and_skips_ineligible() {
        let mut s = SessionState::new();
        s.schedule = ScheduleVector::new([0.0, 0.3, 0.0, 0.0]);
        s.candidates = vec![
            analysed(5, 0.5, 300.0),
            analysed(10, 0.2, 50.0), // discarded
            analysed(25, 0.9, 10.0), // terminal
            analysed(15, 0.5, UNBOUNDED),
            Candidate::new(Profile::at_level(5)),
            analysed(20, 0.5, 300.0),
            analysed(20, 0.5, 2e9),
        ];
        assert_eq!(s.select_next_candidate(), Some(0));
        s.candidates.remove(0);
        assert_eq!(s.select_next_candidate(), Some(4));
        s.candidates.clear();
        assert_eq!(s.select_next_candidate(), None);
    }

    #[test]
    fn display_order_puts_unbounded_then_unanalysed_last() {
        let mut s = SessionState::new();
        s.candidates = vec![
            Candidate::new(Profile::at_level(5)),
            analysed(5, 0.5, UNBOUNDED),
            analysed(5, 0.5, 40.0),
            analysed(5, 0.5, 10.0),
        ];
        assert_eq!(s.display_order(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn candidate_status_marks_achieved_failed_and_discarded() {
        let mut s = SessionState::new();
        s.schedule = ScheduleVector::uniform(0.4);
        s.candidates = vec![
            analysed(10, 1.0, 0.0),
            analysed(10, 0.0, 0.0),
            analysed(10, 0.3, 0.0),
            analysed(10, 0.6, 0.0),
            Candidate::new(Profile::at_level(10)),
        ];
        s.active_candidate = Some(3);
        let got: Vec<CandidateStatus> = (0..5).filter_map(|i| s.candidate_status(i)).collect();
        assert_eq!(
            got,
            vec![
                CandidateStatus::Achieved,
                CandidateStatus::Failed,
                CandidateStatus::Discarded,
                CandidateStatus::Active,
                CandidateStatus::Pending,
            ]
        );
    }

    #[test]
    fn start_needs_filter_and_scan() {
        let mut s = SessionState::new();
        s.set_status(Action::Filter, ActionStatus::Succeeded);
        assert!(!s.start_enabled());
        s.set_status(Action::Scan, ActionStatus::Succeeded);
        assert!(s.start_enabled());
    }

    #[test]
    fn session_round_trips_through_disk() {
        let path = std::env::temp_dir()
            .join(format!("echotune-session-{}", std::process::id()))
            .join("session.json");
        let mut s = SessionState::new();
        s.schedule = ScheduleVector::new([0.1, 0.2, 0.3, 0.4]);
        s.weights = WeightVector::from_raw([0.5, 0.3, 0.2]);
        s.set_coef("crit_rate", 2.0);
        s.history.record(s.schedule, 0.7, 120.0, 4.0);
        s.candidates.push(analysed(10, 0.5, 1.0));
        s.save(&path).unwrap();

        let back = SessionState::load(&path).unwrap();
        assert_eq!(back.schedule, s.schedule);
        assert_eq!(back.weights, s.weights);
        assert_eq!(back.scoring, s.scoring);
        assert_eq!(back.history.len(), 1);
        assert_eq!(back.candidates.len(), 1);
        assert!(back.candidates[0].analysis.is_none());
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }
}
