//! Automation loop: repeatedly advance the best eligible candidate until one
//! succeeds, the service runs dry, an error occurs, or the user stops it.
//!
//! The loop is a single async task. Stop is cooperative: a cancellation token
//! is checked before each advance request and again before the pause between
//! iterations. An in-flight request is never cancelled.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::discard::TERMINAL_LEVEL;
use crate::model::{Analysis, Candidate, Profile};
use crate::service::{AnalysisService, ServiceError};
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stopping,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// The advanced candidate reached the terminal level with certain success.
    Succeeded,
    /// Stop was requested and observed.
    Stopped,
    /// Nothing was eligible and the service returned no fresh item.
    Exhausted,
    Failed(ServiceError),
    /// A run was already active; the call was treated as a stop request.
    AlreadyRunning,
    /// The start gesture is disabled until filter and scan have succeeded.
    NotReady,
}

impl RunOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, RunOutcome::Failed(_) | RunOutcome::Exhausted)
    }
}

struct RunControl {
    state: RunState,
    token: CancellationToken,
}

/// Resets the run state to `Idle` when the loop ends, however it ends.
struct IdleOnDrop(Arc<Mutex<RunControl>>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        let mut ctl = self.0.lock().unwrap_or_else(|p| p.into_inner());
        ctl.state = RunState::Idle;
    }
}

pub struct AutomationController<S: AnalysisService> {
    service: Arc<S>,
    session: Arc<RwLock<SessionState>>,
    control: Arc<Mutex<RunControl>>,
    poll_interval: Duration,
}

impl<S: AnalysisService> Clone for AutomationController<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            session: Arc::clone(&self.session),
            control: Arc::clone(&self.control),
            poll_interval: self.poll_interval,
        }
    }
}

impl<S: AnalysisService> AutomationController<S> {
    pub fn new(
        service: Arc<S>,
        session: Arc<RwLock<SessionState>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            service,
            session,
            control: Arc::new(Mutex::new(RunControl {
                state: RunState::Idle,
                token: CancellationToken::new(),
            })),
            poll_interval,
        }
    }

    fn control(&self) -> MutexGuard<'_, RunControl> {
        self.control.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> RunState {
        self.control().state
    }

    /// Request a cooperative stop. Returns whether a running loop was told to stop.
    pub fn stop(&self) -> bool {
        let mut ctl = self.control();
        if ctl.state != RunState::Running {
            return false;
        }
        ctl.state = RunState::Stopping;
        ctl.token.cancel();
        info!("automation stop requested");
        true
    }

    /// Stop the loop and tell the service to abandon its current work.
    /// A failed notification is logged and otherwise ignored.
    pub async fn stop_and_notify(&self) -> bool {
        let stopped = self.stop();
        if let Err(e) = self.service.stop_work().await {
            warn!("stop_work failed: {e}");
        }
        stopped
    }

    /// Run the loop to completion. While a run is active, this only toggles
    /// stop and returns [`RunOutcome::AlreadyRunning`].
    pub async fn start(&self) -> RunOutcome {
        let token = {
            let mut ctl = self.control();
            match ctl.state {
                RunState::Idle => {
                    ctl.state = RunState::Running;
                    ctl.token = CancellationToken::new();
                    ctl.token.clone()
                }
                RunState::Running => {
                    ctl.state = RunState::Stopping;
                    ctl.token.cancel();
                    info!("automation stop requested");
                    return RunOutcome::AlreadyRunning;
                }
                RunState::Stopping => return RunOutcome::AlreadyRunning,
            }
        };
        let _idle = IdleOnDrop(Arc::clone(&self.control));

        info!("automation started");
        let outcome = self.run_loop(&token).await;
        {
            let mut s = self.session.write().await;
            s.active_candidate = None;
        }
        match &outcome {
            RunOutcome::Succeeded => info!("automation finished: target reached"),
            RunOutcome::Stopped => info!("automation stopped"),
            RunOutcome::Exhausted => warn!("automation ended: service returned no item"),
            RunOutcome::Failed(e) => error!("automation failed: {e}"),
            RunOutcome::AlreadyRunning | RunOutcome::NotReady => {}
        }
        outcome
    }

    async fn run_loop(&self, token: &CancellationToken) -> RunOutcome {
        // Edits since the last analysis leave candidates unanalysed; selection
        // only considers analysed ones.
        let stale = {
            let s = self.session.read().await;
            s.candidates.iter().any(|c| c.analysis.is_none())
        };
        if stale {
            debug!("recomputing stale candidate analyses before first selection");
            if let Err(e) = recompute_candidate_analyses(&self.service, &self.session).await {
                return RunOutcome::Failed(e);
            }
        }

        let mut iteration: u64 = 0;
        loop {
            iteration += 1;
            let (chosen, profile) = {
                let mut s = self.session.write().await;
                let chosen = s.select_next_candidate();
                s.active_candidate = chosen;
                let profile = chosen.map(|i| s.candidates[i].profile.clone());
                (chosen, profile)
            };

            if token.is_cancelled() {
                return RunOutcome::Stopped;
            }

            debug!(
                iteration,
                candidate = ?chosen,
                level = profile.as_ref().map(|p| p.level),
                "advance request"
            );
            let next = match self.service.advance_candidate(profile.as_ref()).await {
                Ok(Some(p)) => p,
                Ok(None) if chosen.is_some() => {
                    return RunOutcome::Failed(ServiceError::Malformed(
                        "upgrade_echo returned null profile".to_string(),
                    ))
                }
                Ok(None) => return RunOutcome::Exhausted,
                Err(e) => return RunOutcome::Failed(e),
            };
            let reached_level = next.level;

            let advanced = {
                let mut s = self.session.write().await;
                let idx = match chosen {
                    Some(i) if i < s.candidates.len() => {
                        s.candidates[i] = Candidate::new(next);
                        i
                    }
                    _ => {
                        s.candidates.push(Candidate::new(next));
                        s.candidates.len() - 1
                    }
                };
                s.active_candidate = Some(idx);
                idx
            };

            if let Err(e) = recompute_candidate_analyses(&self.service, &self.session).await {
                return RunOutcome::Failed(e);
            }

            let succeeded = {
                let s = self.session.read().await;
                s.candidates.get(advanced).is_some_and(|c| {
                    c.level() >= TERMINAL_LEVEL
                        && c.analysis
                            .is_some_and(|a| a.prob_above_threshold_with_discard == 1.0)
                })
            };
            debug!(iteration, candidate = advanced, level = reached_level, succeeded, "advanced");
            if succeeded {
                return RunOutcome::Succeeded;
            }

            if token.is_cancelled() {
                return RunOutcome::Stopped;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = token.cancelled() => return RunOutcome::Stopped,
            }
        }
    }
}

/// Fetch a fresh analysis for every candidate concurrently and apply them
/// together once all have resolved.
///
/// The first failure aborts the batch: the remaining requests are dropped and
/// nothing is applied. A result is only applied to a candidate whose profile
/// is still the one that was analysed. Returns the number of analyses applied.
pub async fn recompute_candidate_analyses<S: AnalysisService>(
    service: &Arc<S>,
    session: &Arc<RwLock<SessionState>>,
) -> Result<usize, ServiceError> {
    let (query, schedule, profiles) = {
        let s = session.read().await;
        let profiles: Vec<Profile> = s.candidates.iter().map(|c| c.profile.clone()).collect();
        (s.query(), s.schedule, profiles)
    };
    if profiles.is_empty() {
        return Ok(0);
    }
    debug!(count = profiles.len(), "recomputing candidate analyses");

    let mut set = JoinSet::new();
    for (i, profile) in profiles.iter().cloned().enumerate() {
        let service = Arc::clone(service);
        let query = query.clone();
        set.spawn(async move {
            let r = service.full_analysis(&query, &schedule, Some(&profile)).await;
            (i, r)
        });
    }

    let mut results: Vec<Option<Analysis>> = vec![None; profiles.len()];
    while let Some(joined) = set.join_next().await {
        let (i, r) = joined?;
        results[i] = Some(r?);
    }

    let mut s = session.write().await;
    let mut applied = 0;
    for ((candidate, analysed), result) in s.candidates.iter_mut().zip(&profiles).zip(results) {
        if candidate.profile == *analysed {
            candidate.analysis = result;
            applied += 1;
        }
    }
    Ok(applied)
}
