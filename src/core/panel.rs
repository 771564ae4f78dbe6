//! Top-level controller: owns the session, both editors and the automation
//! loop, and turns user gestures and actions into service calls.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::automation::{recompute_candidate_analyses, AutomationController, RunOutcome, RunState};
use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::discard::BRACKET_START_LEVELS;
use crate::history::HistorySortKey;
use crate::model::{Analysis, BriefAnalysis, Candidate, ScheduleVector, WeightSlot, BRACKETS};
use crate::schedule_editor::ScheduleEditor;
use crate::service::{AnalysisService, FilterSelection, ServiceError};
use crate::session::{Action, ActionStatus, ExampleLookup, SessionState};
use crate::surface::DrawSurface;
use crate::weight_editor::WeightEditor;

pub struct Views<D: DrawSurface> {
    pub schedule: ScheduleEditor<D>,
    pub weights: WeightEditor<D>,
}

impl<D: DrawSurface> Views<D> {
    fn redraw(&mut self, state: &SessionState) {
        self.schedule.draw(&state.schedule);
        self.weights.draw(&state.weights);
    }
}

type SharedViews<D> = Arc<Mutex<Views<D>>>;

fn lock_views<D: DrawSurface>(views: &SharedViews<D>) -> MutexGuard<'_, Views<D>> {
    views.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct ControlPanel<S: AnalysisService, D: DrawSurface + Send + 'static> {
    service: Arc<S>,
    session: Arc<RwLock<SessionState>>,
    views: SharedViews<D>,
    automation: AutomationController<S>,
    config: ClientConfig,
    brief_refresh: Debouncer,
    resize: Debouncer,
    pending_size: Arc<Mutex<Option<(f64, f64)>>>,
    example_hover: Debouncer,
    hovered_bracket: Arc<Mutex<Option<usize>>>,
}

impl<S: AnalysisService, D: DrawSurface + Send + 'static> ControlPanel<S, D> {
    pub fn new(
        service: Arc<S>,
        state: SessionState,
        config: ClientConfig,
        schedule_surface: D,
        weight_surface: D,
    ) -> Self {
        let session = Arc::new(RwLock::new(state));
        let views = Arc::new(Mutex::new(Views {
            schedule: ScheduleEditor::new(schedule_surface),
            weights: WeightEditor::new(weight_surface),
        }));
        let automation = AutomationController::new(
            Arc::clone(&service),
            Arc::clone(&session),
            Duration::from_millis(config.poll_interval_ms),
        );

        let brief_refresh = {
            let service = Arc::clone(&service);
            let session = Arc::clone(&session);
            Debouncer::new(
                Duration::from_millis(config.settings_debounce_ms),
                move || {
                    let service = Arc::clone(&service);
                    let session = Arc::clone(&session);
                    async move {
                        let _ = refresh_brief(&service, &session).await;
                    }
                },
            )
        };

        let pending_size: Arc<Mutex<Option<(f64, f64)>>> = Arc::new(Mutex::new(None));
        let resize = {
            let session = Arc::clone(&session);
            let views = Arc::clone(&views);
            let pending_size = Arc::clone(&pending_size);
            Debouncer::new(
                Duration::from_millis(config.resize_debounce_ms),
                move || {
                    let session = Arc::clone(&session);
                    let views = Arc::clone(&views);
                    let pending_size = Arc::clone(&pending_size);
                    async move {
                        let size = pending_size
                            .lock()
                            .unwrap_or_else(|p| p.into_inner())
                            .take();
                        let Some((w, h)) = size else {
                            return;
                        };
                        let schedule = session.read().await.schedule;
                        lock_views(&views).schedule.resize(&schedule, w, h);
                    }
                },
            )
        };

        let hovered_bracket: Arc<Mutex<Option<usize>>> = Arc::new(Mutex::new(None));
        let example_hover = {
            let service = Arc::clone(&service);
            let session = Arc::clone(&session);
            let hovered = Arc::clone(&hovered_bracket);
            Debouncer::new(
                Duration::from_millis(config.example_hover_delay_ms),
                move || {
                    let service = Arc::clone(&service);
                    let session = Arc::clone(&session);
                    let hovered = Arc::clone(&hovered);
                    async move {
                        let bracket = *hovered.lock().unwrap_or_else(|p| p.into_inner());
                        if let Some(bracket) = bracket {
                            let _ = lookup_example(&service, &session, bracket).await;
                        }
                    }
                },
            )
        };

        Self {
            service,
            session,
            views,
            automation,
            config,
            brief_refresh,
            resize,
            pending_size,
            example_hover,
            hovered_bracket,
        }
    }

    pub fn session(&self) -> &Arc<RwLock<SessionState>> {
        &self.session
    }

    pub fn automation(&self) -> &AutomationController<S> {
        &self.automation
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn views(&self) -> MutexGuard<'_, Views<D>> {
        lock_views(&self.views)
    }

    /// Run `f` against the editors, e.g. to export their surfaces.
    pub fn with_views<R>(&self, f: impl FnOnce(&Views<D>) -> R) -> R {
        f(&self.views())
    }

    pub async fn redraw(&self) {
        let s = self.session.read().await;
        self.views().redraw(&s);
    }

    // -- schedule chart --------------------------------------------------

    pub async fn schedule_pointer_down(&self, x: f64, y: f64) {
        let s = self.session.read().await;
        self.views().schedule.pointer_down(&s.schedule, x, y);
    }

    pub async fn schedule_pointer_move(&self, y: f64) -> bool {
        let mut s = self.session.write().await;
        let changed = self.views().schedule.pointer_move(&mut s.schedule, y);
        if changed {
            s.invalidate_analyses();
        }
        changed
    }

    pub async fn schedule_pointer_up(&self) {
        let s = self.session.read().await;
        self.views().schedule.pointer_up(&s.schedule);
    }

    pub async fn schedule_wheel(&self, y: f64, delta_y: f64) {
        let s = self.session.read().await;
        self.views().schedule.wheel(&s.schedule, y, delta_y);
    }

    /// Numeric threshold field, in percent.
    pub async fn schedule_input(&self, bracket: usize, percent: f64) -> bool {
        let mut s = self.session.write().await;
        let changed = self.views().schedule.set_input(&mut s.schedule, bracket, percent);
        if changed {
            s.invalidate_analyses();
        }
        changed
    }

    pub async fn set_schedule(&self, values: [f64; BRACKETS]) -> bool {
        let mut s = self.session.write().await;
        let changed = self.views().schedule.set_all(&mut s.schedule, values);
        if changed {
            s.invalidate_analyses();
        }
        changed
    }

    /// Coalesce a burst of resize events into one redraw.
    pub fn schedule_resized(&self, width: f64, height: f64) {
        *self.pending_size.lock().unwrap_or_else(|p| p.into_inner()) = Some((width, height));
        self.resize.trigger();
    }

    // -- weight chart ----------------------------------------------------

    pub async fn weight_pointer_down(&self, x: f64, y: f64) -> bool {
        let s = self.session.read().await;
        self.views().weights.pointer_down(&s.weights, x, y)
    }

    pub async fn weight_pointer_move(&self, x: f64, y: f64) -> bool {
        let mut s = self.session.write().await;
        let changed = self.views().weights.pointer_move(&mut s.weights, x, y);
        if changed {
            s.invalidate_analyses();
        }
        changed
    }

    pub fn weight_pointer_up(&self) {
        self.views().weights.pointer_up();
    }

    pub async fn weight_slider(&self, slot: WeightSlot, value: f64) -> bool {
        let mut s = self.session.write().await;
        let changed = self.views().weights.set_slider(&mut s.weights, slot, value);
        if changed {
            s.invalidate_analyses();
        }
        changed
    }

    // -- scoring inputs --------------------------------------------------

    pub async fn set_coef(&self, key: &str, value: f64) {
        self.session.write().await.set_coef(key, value);
        self.brief_refresh.trigger();
    }

    pub async fn set_target(&self, key: &str, value: f64) {
        self.session.write().await.set_target(key, value);
        self.brief_refresh.trigger();
    }

    pub async fn set_locked_keys(&self, keys: Vec<String>) {
        self.session.write().await.set_locked_keys(keys);
        self.brief_refresh.trigger();
    }

    pub async fn refresh_brief(&self) -> Result<Option<BriefAnalysis>, ServiceError> {
        refresh_brief(&self.service, &self.session).await
    }

    // -- schedule actions ------------------------------------------------

    /// Set every threshold to the brief success probability plus 10%.
    /// Returns false when no brief analysis is available.
    pub async fn apply_defaults(&self) -> bool {
        let mut s = self.session.write().await;
        let Some(values) = s.default_thresholds() else {
            return false;
        };
        if self.views().schedule.set_all(&mut s.schedule, values) {
            s.invalidate_analyses();
        }
        true
    }

    /// Aggregate analysis of the current schedule. Success is recorded in the
    /// history ledger and triggers a candidate refresh.
    pub async fn apply_schedule(&self) -> Result<Analysis, ServiceError> {
        let (query, schedule) = {
            let mut s = self.session.write().await;
            s.set_status(Action::ApplySchedule, ActionStatus::Pending);
            (s.query(), s.schedule)
        };
        let analysis = match self.service.full_analysis(&query, &schedule, None).await {
            Ok(a) => a,
            Err(e) => {
                warn!("apply schedule failed: {e}");
                let mut s = self.session.write().await;
                s.aggregate = None;
                s.set_status(Action::ApplySchedule, ActionStatus::Failed);
                return Err(e);
            }
        };
        {
            let mut s = self.session.write().await;
            let id = s.history.record(
                schedule,
                analysis.prob_above_threshold_with_discard,
                analysis.wasted_exp,
                analysis.wasted_tuner,
            );
            s.selected_history = Some(id);
            s.aggregate = Some(analysis);
            s.set_status(Action::ApplySchedule, ActionStatus::Succeeded);
        }
        info!(
            prob = analysis.prob_above_threshold_with_discard,
            wasted_exp = analysis.wasted_exp,
            "schedule applied"
        );
        if analysis.wasted_exp != 0.0 {
            self.refresh_candidates().await;
        }
        Ok(analysis)
    }

    /// Ask the optimizer for a schedule under the current weights and apply it.
    pub async fn apply_optimal(&self) -> Result<ScheduleVector, ServiceError> {
        let (query, weights) = {
            let mut s = self.session.write().await;
            s.set_status(Action::Optimal, ActionStatus::Pending);
            (s.query(), s.weights)
        };
        let result = self
            .service
            .optimal_scheduler(&query, &weights, self.config.optimizer_iterations)
            .await;
        let mut s = self.session.write().await;
        match result {
            Ok(schedule) => {
                if self.views().schedule.set_all(&mut s.schedule, schedule.values()) {
                    s.invalidate_analyses();
                }
                s.set_status(Action::Optimal, ActionStatus::Succeeded);
                Ok(s.schedule)
            }
            Err(e) => {
                warn!("optimal schedule failed: {e}");
                s.set_status(Action::Optimal, ActionStatus::Failed);
                Err(e)
            }
        }
    }

    // -- history ---------------------------------------------------------

    /// Restore a history entry's schedule and refresh candidates against it.
    /// The entry itself becomes the shown result; the aggregate of the last
    /// apply is dropped.
    pub async fn select_history(&self, id: u64) -> bool {
        {
            let mut s = self.session.write().await;
            let Some(entry) = s.history.get(id).cloned() else {
                return false;
            };
            self.views()
                .schedule
                .set_all(&mut s.schedule, entry.schedule.values());
            s.invalidate_analyses();
            s.aggregate = None;
            s.selected_history = Some(id);
        }
        self.refresh_candidates().await;
        true
    }

    pub async fn toggle_history_sort(&self) -> HistorySortKey {
        let mut s = self.session.write().await;
        s.history_sort = s.history_sort.toggled();
        s.history_sort
    }

    // -- examples --------------------------------------------------------

    pub async fn lookup_example(&self, bracket: usize) -> Result<ExampleLookup, ServiceError> {
        lookup_example(&self.service, &self.session, bracket).await
    }

    /// Pointer entered a bracket row: look up an example after the hover delay.
    pub fn hover_example(&self, bracket: usize) {
        *self.hovered_bracket.lock().unwrap_or_else(|p| p.into_inner()) = Some(bracket);
        self.example_hover.trigger();
    }

    pub async fn leave_example(&self) {
        *self.hovered_bracket.lock().unwrap_or_else(|p| p.into_inner()) = None;
        self.example_hover.cancel();
        self.session.write().await.example = None;
    }

    // -- candidates ------------------------------------------------------

    pub async fn apply_filter(&self, filter: FilterSelection) -> Result<(), ServiceError> {
        self.session
            .write()
            .await
            .set_status(Action::Filter, ActionStatus::Pending);
        let result = match self.service.apply_filter(&filter).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ServiceError::Rejected("filter not applied".to_string())),
            Err(e) => Err(e),
        };
        let mut s = self.session.write().await;
        match &result {
            Ok(()) => {
                s.filter = filter;
                s.set_status(Action::Filter, ActionStatus::Succeeded);
            }
            Err(e) => {
                warn!("apply filter failed: {e}");
                s.set_status(Action::Filter, ActionStatus::Failed);
            }
        }
        result
    }

    /// Replace the candidate list with a fresh scan and analyse it.
    pub async fn scan(&self) -> Result<usize, ServiceError> {
        self.session
            .write()
            .await
            .set_status(Action::Scan, ActionStatus::Pending);
        let profiles = match self.service.scan_candidates().await {
            Ok(p) => p,
            Err(e) => {
                warn!("scan failed: {e}");
                self.session
                    .write()
                    .await
                    .set_status(Action::Scan, ActionStatus::Failed);
                return Err(e);
            }
        };
        let count = profiles.len();
        self.session
            .write()
            .await
            .replace_candidates(profiles.into_iter().map(Candidate::new).collect());
        self.refresh_candidates().await;
        self.session
            .write()
            .await
            .set_status(Action::Scan, ActionStatus::Succeeded);
        Ok(count)
    }

    /// Recompute every candidate's analysis. A failure leaves them unanalysed
    /// and is only logged.
    pub async fn refresh_candidates(&self) -> usize {
        match recompute_candidate_analyses(&self.service, &self.session).await {
            Ok(n) => n,
            Err(e) => {
                warn!("candidate analysis failed: {e}");
                0
            }
        }
    }

    // -- automation ------------------------------------------------------

    pub async fn start_enabled(&self) -> bool {
        self.session.read().await.start_enabled()
    }

    /// Start (or, while running, stop) the automation loop. Resolves when the
    /// run ends.
    pub async fn start_automation(&self) -> RunOutcome {
        if self.automation.state() == RunState::Idle && !self.start_enabled().await {
            return RunOutcome::NotReady;
        }
        if self.automation.state() == RunState::Idle {
            self.session
                .write()
                .await
                .set_status(Action::Run, ActionStatus::Pending);
        }
        let outcome = self.automation.start().await;
        if matches!(outcome, RunOutcome::AlreadyRunning) {
            if let Err(e) = self.service.stop_work().await {
                warn!("stop_work failed: {e}");
            }
            return outcome;
        }
        let status = match &outcome {
            RunOutcome::Succeeded => ActionStatus::Succeeded,
            RunOutcome::Stopped => ActionStatus::Idle,
            _ => ActionStatus::Failed,
        };
        self.session.write().await.set_status(Action::Run, status);
        outcome
    }

    pub async fn stop_automation(&self) -> bool {
        self.automation.stop_and_notify().await
    }
}

/// Fetch the brief analysis for the current scoring inputs. Skipped (and the
/// stored result cleared) when there are too many targets.
async fn refresh_brief<S: AnalysisService>(
    service: &Arc<S>,
    session: &Arc<RwLock<SessionState>>,
) -> Result<Option<BriefAnalysis>, ServiceError> {
    let query = {
        let mut s = session.write().await;
        if !s.scoring.is_valid() {
            debug!(
                targets = s.scoring.nonzero_targets(),
                "brief analysis skipped: too many targets"
            );
            s.brief = None;
            s.set_status(Action::Brief, ActionStatus::Failed);
            return Ok(None);
        }
        s.set_status(Action::Brief, ActionStatus::Pending);
        s.query()
    };
    let result = service.brief_analysis(&query).await;
    let mut s = session.write().await;
    match result {
        Ok(brief) => {
            s.brief = Some(brief);
            s.set_status(Action::Brief, ActionStatus::Succeeded);
            Ok(Some(brief))
        }
        Err(e) => {
            warn!("brief analysis failed: {e}");
            s.brief = None;
            s.set_status(Action::Brief, ActionStatus::Failed);
            Err(e)
        }
    }
}

/// Look up an example item for a bracket row at that row's threshold.
async fn lookup_example<S: AnalysisService>(
    service: &Arc<S>,
    session: &Arc<RwLock<SessionState>>,
    bracket: usize,
) -> Result<ExampleLookup, ServiceError> {
    let (query, prob) = {
        let mut s = session.write().await;
        let Some(prob) = s.schedule.get(bracket) else {
            return Err(ServiceError::Rejected(format!("no bracket {bracket}")));
        };
        s.set_status(Action::Example, ActionStatus::Pending);
        (s.query(), prob)
    };
    let level = BRACKET_START_LEVELS[bracket];
    let result = service.example_profile(&query, level, prob).await;
    let mut s = session.write().await;
    let lookup = match result {
        Ok(Some(example)) => ExampleLookup::Found { bracket, example },
        Ok(None) => ExampleLookup::NotFound { bracket },
        Err(e) => {
            warn!("example lookup failed: {e}");
            s.example = Some(ExampleLookup::Failed { bracket });
            s.set_status(Action::Example, ActionStatus::Failed);
            return Err(e);
        }
    };
    s.example = Some(lookup.clone());
    s.set_status(Action::Example, ActionStatus::Succeeded);
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExampleProfile, Profile};
    use crate::surface::DisplayList;
    use crate::testing::MockService;
    use std::sync::atomic::Ordering;

    fn panel(svc: MockService) -> ControlPanel<MockService, DisplayList> {
        ControlPanel::new(
            Arc::new(svc),
            SessionState::new(),
            ClientConfig::default(),
            DisplayList::new(400.0, 260.0),
            DisplayList::new(300.0, 300.0),
        )
    }

    fn scan_of(levels: &[u32]) -> Vec<Profile> {
        levels.iter().map(|&l| Profile::at_level(l)).collect()
    }

    #[tokio::test]
    async fn defaults_follow_the_brief_probability() {
        let p = panel(MockService::default());
        assert!(!p.apply_defaults().await);
        p.refresh_brief().await.unwrap();
        assert!(p.apply_defaults().await);
        assert_eq!(p.session().read().await.schedule, ScheduleVector::uniform(0.55));
    }

    #[tokio::test]
    async fn apply_schedule_records_history_and_refreshes_candidates() {
        let svc = MockService {
            scan: scan_of(&[5, 10]),
            ..MockService::default()
        };
        let p = panel(svc);
        p.scan().await.unwrap();
        p.set_schedule([0.1, 0.2, 0.3, 0.4]).await;
        assert!(p
            .session()
            .read()
            .await
            .candidates
            .iter()
            .all(|c| c.analysis.is_none()));

        let a = p.apply_schedule().await.unwrap();
        let s = p.session().read().await;
        assert_eq!(s.history.len(), 1);
        let entry = s.history.entries().next().unwrap();
        assert_eq!(entry.schedule, ScheduleVector::new([0.1, 0.2, 0.3, 0.4]));
        assert_eq!(entry.wasted_exp, a.wasted_exp);
        assert_eq!(s.aggregate, Some(a));
        assert!(s.candidates.iter().all(|c| c.analysis.is_some()));
    }

    #[tokio::test]
    async fn zero_waste_skips_candidate_refresh() {
        let mut svc = MockService {
            scan: scan_of(&[5]),
            ..MockService::default()
        };
        svc.aggregate.wasted_exp = 0.0;
        let p = panel(svc);
        p.scan().await.unwrap();
        let before = p.service.full_calls.load(Ordering::SeqCst);
        p.apply_schedule().await.unwrap();
        assert_eq!(p.service.full_calls.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn coefficient_edit_clears_history() {
        let p = panel(MockService::default());
        p.apply_schedule().await.unwrap();
        assert_eq!(p.session().read().await.history.len(), 1);
        p.set_coef("crit_rate", 2.0).await;
        let s = p.session().read().await;
        assert!(s.history.is_empty());
        assert!(s.aggregate.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn settings_edits_debounce_into_one_brief_refresh() {
        let p = panel(MockService::default());
        p.set_coef("crit_rate", 2.0).await;
        p.set_target("crit_rate", 6.3).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(p.session().read().await.brief.is_none());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(p.session().read().await.brief.is_some());
        assert_eq!(*p.service.last_score_thres.lock().unwrap(), Some(12.6));
    }

    #[tokio::test]
    async fn too_many_targets_skip_brief_analysis() {
        let p = panel(MockService::default());
        {
            let mut s = p.session().write().await;
            for k in ["a", "b", "c", "d", "e", "f"] {
                s.scoring.targets.insert(k.to_string(), 1.0);
            }
        }
        assert!(p.refresh_brief().await.unwrap().is_none());
        let s = p.session().read().await;
        assert!(s.brief.is_none());
        assert_eq!(s.status(Action::Brief), ActionStatus::Failed);
    }

    #[tokio::test]
    async fn optimal_schedule_is_applied_to_the_chart() {
        let p = panel(MockService::default());
        let schedule = p.apply_optimal().await.unwrap();
        assert_eq!(schedule, ScheduleVector::new([0.1, 0.2, 0.3, 0.4]));
        assert_eq!(p.session().read().await.schedule, schedule);
        let frames = p.with_views(|v| v.schedule.surface().frames());
        assert_eq!(frames, 1);
    }

    #[tokio::test]
    async fn history_selection_restores_schedule() {
        let p = panel(MockService::default());
        p.set_schedule([0.2; BRACKETS]).await;
        p.apply_schedule().await.unwrap();
        let id = p.session().read().await.history.entries().next().unwrap().id;
        p.set_schedule([0.9; BRACKETS]).await;

        p.apply_schedule().await.unwrap();
        assert!(p.session().read().await.aggregate.is_some());

        assert!(p.select_history(id).await);
        {
            let s = p.session().read().await;
            assert_eq!(s.schedule, ScheduleVector::uniform(0.2));
            assert!(s.aggregate.is_none());
            let shown = s.selected_entry().unwrap();
            assert_eq!(shown.id, id);
            assert_eq!(shown.schedule, ScheduleVector::uniform(0.2));
        }
        assert!(!p.select_history(id + 100).await);
    }

    #[tokio::test]
    async fn example_lookup_distinguishes_not_found() {
        let p = panel(MockService::default());
        assert_eq!(
            p.lookup_example(1).await.unwrap(),
            ExampleLookup::NotFound { bracket: 1 }
        );

        let found = ExampleProfile {
            profile: Profile::at_level(10).with_entry("crit_rate", 6.9),
            actual_prob: 0.31,
        };
        let p = panel(MockService {
            example: Some(found.clone()),
            ..MockService::default()
        });
        assert_eq!(
            p.lookup_example(1).await.unwrap(),
            ExampleLookup::Found {
                bracket: 1,
                example: found
            }
        );
        assert!(p.lookup_example(7).await.is_err());
    }

    #[tokio::test]
    async fn start_requires_filter_and_scan() {
        let p = panel(MockService {
            scan: scan_of(&[20]),
            ..MockService::default()
        });
        assert!(matches!(p.start_automation().await, RunOutcome::NotReady));

        p.apply_filter(FilterSelection {
            cost: 4,
            ..FilterSelection::default()
        })
        .await
        .unwrap();
        p.scan().await.unwrap();
        assert!(p.start_enabled().await);
        assert!(matches!(p.start_automation().await, RunOutcome::Succeeded));
        assert_eq!(
            p.session().read().await.status(Action::Run),
            ActionStatus::Succeeded
        );
    }

    #[tokio::test]
    async fn schedule_edit_then_run_advances_scanned_candidate() {
        let p = panel(MockService {
            scan: scan_of(&[10, 15]),
            ..MockService::default()
        });
        p.apply_filter(FilterSelection::default()).await.unwrap();
        p.scan().await.unwrap();
        assert_eq!(p.session().read().await.select_next_candidate(), Some(1));

        p.set_schedule([0.1; BRACKETS]).await;
        assert_eq!(p.session().read().await.select_next_candidate(), None);

        assert!(matches!(p.start_automation().await, RunOutcome::Succeeded));
        let s = p.session().read().await;
        let levels: Vec<u32> = s.candidates.iter().map(|c| c.level()).collect();
        assert_eq!(levels, vec![10, 25]);
    }

    #[tokio::test]
    async fn rejected_filter_blocks_start() {
        let p = panel(MockService {
            filter_ok: false,
            ..MockService::default()
        });
        let err = p.apply_filter(FilterSelection::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(_)));
        assert!(!p.start_enabled().await);
    }

    #[tokio::test]
    async fn weight_drag_invalidates_candidate_analyses() {
        let p = panel(MockService {
            scan: scan_of(&[5]),
            ..MockService::default()
        });
        p.scan().await.unwrap();
        assert!(p.weight_slider(WeightSlot::Tuner, 0.5).await);
        let s = p.session().read().await;
        assert!(s.candidates[0].analysis.is_none());
        assert!((s.weights.get(WeightSlot::Tuner) - 0.5).abs() < 1e-9);
    }
}
