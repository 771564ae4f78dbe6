//! Analysis Service contract.
//!
//! All probability math lives behind this trait. Every call is a one-shot
//! request/response; transports map their failures onto [`ServiceError`].

use std::future::Future;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Analysis, BriefAnalysis, ExampleProfile, Profile, ScheduleVector, WeightVector};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport failure or a non-success status.
    #[error("network failure: {0}")]
    Network(String),
    /// The body did not decode, or a required field was null or missing.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The service answered but reported failure.
    #[error("rejected by service: {0}")]
    Rejected(String),
    #[error("request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Scoring parameters shared by every scored request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringQuery {
    pub coef: HashMap<String, f64>,
    pub score_thres: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locked_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FullAnalysisRequest<'a> {
    #[serde(flatten)]
    pub query: &'a ScoringQuery,
    pub scheduler: ScheduleVector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<&'a Profile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleRequest<'a> {
    #[serde(flatten)]
    pub query: &'a ScoringQuery,
    pub level: u32,
    pub prob: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimalSchedulerRequest<'a> {
    #[serde(flatten)]
    pub query: &'a ScoringQuery,
    pub num_echo_weight: f64,
    pub exp_weight: f64,
    pub tuner_weight: f64,
    pub iterations: u32,
}

impl<'a> OptimalSchedulerRequest<'a> {
    pub fn new(query: &'a ScoringQuery, weights: &WeightVector, iterations: u32) -> Self {
        let [a, b, c] = weights.as_array();
        Self {
            query,
            num_echo_weight: a,
            exp_weight: b,
            tuner_weight: c,
            iterations,
        }
    }
}

/// Item filter applied on the service side before a scan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    pub cost: u32,
    #[serde(default)]
    pub suit: String,
    #[serde(default)]
    pub echo: String,
    #[serde(default)]
    pub main_entry: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimalSchedule {
    pub thresholds: ScheduleVector,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterResult {
    #[serde(default)]
    pub success: bool,
}

pub trait AnalysisService: Send + Sync + 'static {
    fn brief_analysis(
        &self,
        query: &ScoringQuery,
    ) -> impl Future<Output = Result<BriefAnalysis, ServiceError>> + Send;

    /// Aggregate analysis when `profile` is `None`, per-candidate otherwise.
    fn full_analysis(
        &self,
        query: &ScoringQuery,
        schedule: &ScheduleVector,
        profile: Option<&Profile>,
    ) -> impl Future<Output = Result<Analysis, ServiceError>> + Send;

    /// `Ok(None)` when the service has no example at that probability.
    fn example_profile(
        &self,
        query: &ScoringQuery,
        level: u32,
        prob: f64,
    ) -> impl Future<Output = Result<Option<ExampleProfile>, ServiceError>> + Send;

    fn optimal_scheduler(
        &self,
        query: &ScoringQuery,
        weights: &WeightVector,
        iterations: u32,
    ) -> impl Future<Output = Result<ScheduleVector, ServiceError>> + Send;

    fn apply_filter(
        &self,
        filter: &FilterSelection,
    ) -> impl Future<Output = Result<bool, ServiceError>> + Send;

    fn scan_candidates(&self) -> impl Future<Output = Result<Vec<Profile>, ServiceError>> + Send;

    /// Advance one candidate. `None` asks the service to pick up a fresh item.
    /// A null body comes back as `Ok(None)`.
    fn advance_candidate(
        &self,
        profile: Option<&Profile>,
    ) -> impl Future<Output = Result<Option<Profile>, ServiceError>> + Send;

    fn stop_work(&self) -> impl Future<Output = Result<(), ServiceError>> + Send;
}
