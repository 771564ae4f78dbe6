//! In-memory scripted Analysis Service for async tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::model::{Analysis, BriefAnalysis, ExampleProfile, Profile, ScheduleVector, WeightVector};
use crate::service::{AnalysisService, FilterSelection, ScoringQuery, ServiceError};

pub fn analysis(prob: f64, with_discard: f64, exp: f64) -> Analysis {
    Analysis {
        prob_above_threshold: prob,
        prob_above_threshold_with_discard: with_discard,
        wasted_exp: exp,
        wasted_tuner: exp / 10.0,
        score: 0.0,
        expected_score: 0.0,
    }
}

/// Candidates succeed once they reach level 25; below that they sit at 50%.
pub fn terminal_success(p: &Profile) -> Analysis {
    if p.level >= 25 {
        analysis(1.0, 1.0, 0.0)
    } else {
        analysis(0.5, 0.5, 100.0 - p.level as f64)
    }
}

pub fn never_succeeds(p: &Profile) -> Analysis {
    analysis(0.5, 0.5, 100.0 - p.level as f64)
}

pub struct MockService {
    /// Scripted advance responses; when empty the profile gains five levels
    /// (a fresh level-0 item for an empty request).
    pub advance_script: Mutex<VecDeque<Result<Option<Profile>, ServiceError>>>,
    pub analysis: fn(&Profile) -> Analysis,
    pub aggregate: Analysis,
    pub brief: BriefAnalysis,
    pub example: Option<ExampleProfile>,
    pub optimal: ScheduleVector,
    pub scan: Vec<Profile>,
    pub filter_ok: bool,
    pub fail_full_analysis: AtomicBool,
    pub fail_stop: bool,
    pub advance_delay: Duration,
    pub full_delay: Duration,
    pub advance_calls: AtomicUsize,
    pub full_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub last_score_thres: Mutex<Option<f64>>,
}

impl Default for MockService {
    fn default() -> Self {
        Self {
            advance_script: Mutex::new(VecDeque::new()),
            analysis: terminal_success,
            aggregate: analysis(0.4, 0.6, 1500.0),
            brief: BriefAnalysis {
                expected_score: 21.5,
                prob_above_threshold: 0.5,
            },
            example: None,
            optimal: ScheduleVector::new([0.1, 0.2, 0.3, 0.4]),
            scan: Vec::new(),
            filter_ok: true,
            fail_full_analysis: AtomicBool::new(false),
            fail_stop: false,
            advance_delay: Duration::from_millis(0),
            full_delay: Duration::from_millis(0),
            advance_calls: AtomicUsize::new(0),
            full_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            last_score_thres: Mutex::new(None),
        }
    }
}

impl MockService {
    pub fn script(&self, responses: Vec<Result<Option<Profile>, ServiceError>>) {
        if let Ok(mut q) = self.advance_script.lock() {
            q.extend(responses);
        }
    }

    pub fn advance_calls(&self) -> usize {
        self.advance_calls.load(Ordering::SeqCst)
    }
}

impl AnalysisService for MockService {
    async fn brief_analysis(&self, query: &ScoringQuery) -> Result<BriefAnalysis, ServiceError> {
        if let Ok(mut last) = self.last_score_thres.lock() {
            *last = Some(query.score_thres);
        }
        Ok(self.brief)
    }

    async fn full_analysis(
        &self,
        _query: &ScoringQuery,
        _schedule: &ScheduleVector,
        profile: Option<&Profile>,
    ) -> Result<Analysis, ServiceError> {
        self.full_calls.fetch_add(1, Ordering::SeqCst);
        if self.full_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.full_delay).await;
        }
        if self.fail_full_analysis.load(Ordering::SeqCst) {
            return Err(ServiceError::Network("HTTP 500".into()));
        }
        Ok(match profile {
            Some(p) => (self.analysis)(p),
            None => self.aggregate,
        })
    }

    async fn example_profile(
        &self,
        _query: &ScoringQuery,
        _level: u32,
        _prob: f64,
    ) -> Result<Option<ExampleProfile>, ServiceError> {
        Ok(self.example.clone())
    }

    async fn optimal_scheduler(
        &self,
        _query: &ScoringQuery,
        _weights: &WeightVector,
        _iterations: u32,
    ) -> Result<ScheduleVector, ServiceError> {
        Ok(self.optimal)
    }

    async fn apply_filter(&self, _filter: &FilterSelection) -> Result<bool, ServiceError> {
        Ok(self.filter_ok)
    }

    async fn scan_candidates(&self) -> Result<Vec<Profile>, ServiceError> {
        Ok(self.scan.clone())
    }

    async fn advance_candidate(
        &self,
        profile: Option<&Profile>,
    ) -> Result<Option<Profile>, ServiceError> {
        self.advance_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.advance_delay.is_zero() {
            tokio::time::sleep(self.advance_delay).await;
        }
        let scripted = self
            .advance_script
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front());
        let out = match scripted {
            Some(r) => r,
            None => {
                let mut next = profile.cloned().unwrap_or_default();
                next.level = (next.level + 5).min(25);
                Ok(Some(next))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }

    async fn stop_work(&self) -> Result<(), ServiceError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(ServiceError::Network("connection refused".into()));
        }
        Ok(())
    }
}
