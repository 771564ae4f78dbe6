//! HTTP/JSON transport for the Analysis Service.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::model::{Analysis, BriefAnalysis, ExampleProfile, Profile, ScheduleVector, WeightVector};
use crate::service::{
    AnalysisService, ExampleRequest, FilterResult, FilterSelection, FullAnalysisRequest,
    OptimalSchedule, OptimalSchedulerRequest, ScoringQuery, ServiceError,
};

pub struct HttpAnalysisService {
    http: Client,
    base: String,
}

impl HttpAnalysisService {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| ServiceError::Network(format!("client setup: {e}")))?;
        Ok(Self {
            http,
            base: cfg.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base, path)
    }

    async fn read_body<T: DeserializeOwned>(
        path: &str,
        resp: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Network(format!("{path}: HTTP {status}")));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ServiceError::Network(format!("{path}: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Malformed(format!("{path}: {e}")))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        debug!(path, "POST");
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(format!("{path}: {e}")))?;
        Self::read_body(path, resp).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        debug!(path, "GET");
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ServiceError::Network(format!("{path}: {e}")))?;
        Self::read_body(path, resp).await
    }
}

#[derive(Serialize)]
struct EmptyBody {}

impl AnalysisService for HttpAnalysisService {
    async fn brief_analysis(&self, query: &ScoringQuery) -> Result<BriefAnalysis, ServiceError> {
        self.post_json("get_brief_analysis", query).await
    }

    async fn full_analysis(
        &self,
        query: &ScoringQuery,
        schedule: &ScheduleVector,
        profile: Option<&Profile>,
    ) -> Result<Analysis, ServiceError> {
        let req = FullAnalysisRequest {
            query,
            scheduler: *schedule,
            profile,
        };
        self.post_json("get_full_analysis", &req).await
    }

    async fn example_profile(
        &self,
        query: &ScoringQuery,
        level: u32,
        prob: f64,
    ) -> Result<Option<ExampleProfile>, ServiceError> {
        let req = ExampleRequest { query, level, prob };
        // A miss comes back as null or as an object without a profile.
        let v: serde_json::Value = self.post_json("get_example_profile", &req).await?;
        if v.get("profile").map_or(true, |p| p.is_null()) {
            return Ok(None);
        }
        serde_json::from_value(v)
            .map(Some)
            .map_err(|e| ServiceError::Malformed(format!("get_example_profile: {e}")))
    }

    async fn optimal_scheduler(
        &self,
        query: &ScoringQuery,
        weights: &WeightVector,
        iterations: u32,
    ) -> Result<ScheduleVector, ServiceError> {
        let req = OptimalSchedulerRequest::new(query, weights, iterations);
        let out: OptimalSchedule = self.post_json("get_optimal_scheduler", &req).await?;
        Ok(out.thresholds)
    }

    async fn apply_filter(&self, filter: &FilterSelection) -> Result<bool, ServiceError> {
        let out: FilterResult = self.post_json("apply_filter", filter).await?;
        Ok(out.success)
    }

    async fn scan_candidates(&self) -> Result<Vec<Profile>, ServiceError> {
        self.get_json("scan_echo").await
    }

    async fn advance_candidate(
        &self,
        profile: Option<&Profile>,
    ) -> Result<Option<Profile>, ServiceError> {
        match profile {
            Some(p) => self.post_json("upgrade_echo", p).await,
            None => self.post_json("upgrade_echo", &EmptyBody {}).await,
        }
    }

    async fn stop_work(&self) -> Result<(), ServiceError> {
        let resp = self
            .http
            .post(self.url("stop_work"))
            .send()
            .await
            .map_err(|e| ServiceError::Network(format!("stop_work: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Network(format!("stop_work: HTTP {status}")));
        }
        Ok(())
    }
}
