//! Single source of truth for what the demo is showing.
//!
//! The controller owns the visible scenario, the selected gap, the resolved gap ids and
//! the guided-tour flag. Every mutation goes through the scenario flow; transitions the
//! flow does not allow are dropped and logged at debug level.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DemoTiming;
use crate::dataset::DemoDataset;
use crate::domain::digest::{derive_digest, DailyDigest};
use crate::domain::gap::{GapId, KnowledgeGap};
use crate::errors::DomainError;
use crate::flows::{
    FlowEngine, Resolution, Scenario, ScenarioAction, ScenarioEvent, ScenarioFlow,
    TransitionOutcome,
};
use crate::notifications::{Notification, NotificationSink, NotificationTone};
use crate::params::DemoParams;
use crate::reveal::ScheduledTask;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoState {
    pub scenario: Scenario,
    pub selected_gap: Option<GapId>,
    /// Insertion ordered, no duplicates.
    pub resolved: Vec<GapId>,
    pub help: bool,
}

impl DemoState {
    pub fn params(&self) -> DemoParams {
        DemoParams::new(self.scenario, self.selected_gap.clone(), self.help)
    }

    pub fn is_resolved(&self, gap_id: &GapId) -> bool {
        self.resolved.contains(gap_id)
    }
}

pub struct ScenarioController {
    session_id: String,
    dataset: Arc<DemoDataset>,
    base_digest: DailyDigest,
    engine: FlowEngine<ScenarioFlow>,
    timing: DemoTiming,
    state: Arc<Mutex<DemoState>>,
    pending_return: Mutex<Option<ScheduledTask>>,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for ScenarioController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioController")
            .field("session_id", &self.session_id)
            .field("state", &self.snapshot())
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl ScenarioController {
    pub fn new(
        dataset: Arc<DemoDataset>,
        timing: DemoTiming,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let base_digest = dataset.todays_digest();
        Self {
            session_id: Uuid::new_v4().to_string(),
            dataset,
            base_digest,
            engine: FlowEngine::default(),
            timing,
            state: Arc::new(Mutex::new(DemoState::default())),
            pending_return: Mutex::new(None),
            notifier,
        }
    }

    /// Starts the session with the guided tour already showing.
    pub fn with_initial_help(self, help: bool) -> Self {
        lock(&self.state).help = help;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn dataset(&self) -> &DemoDataset {
        &self.dataset
    }

    pub fn timing(&self) -> DemoTiming {
        self.timing
    }

    pub fn snapshot(&self) -> DemoState {
        lock(&self.state).clone()
    }

    pub fn scenario(&self) -> Scenario {
        lock(&self.state).scenario
    }

    pub fn params(&self) -> DemoParams {
        lock(&self.state).params()
    }

    /// The selected gap, when it names a record in the dataset.
    pub fn selected_gap(&self) -> Option<KnowledgeGap> {
        let selected = lock(&self.state).selected_gap.clone()?;
        self.dataset.gap(selected.as_str()).cloned()
    }

    pub fn current_digest(&self) -> DailyDigest {
        self.digest_for(&self.snapshot())
    }

    /// The digest as it looks for a previously taken snapshot.
    pub fn digest_for(&self, state: &DemoState) -> DailyDigest {
        derive_digest(&self.base_digest, &state.resolved)
    }

    pub fn has_pending_return(&self) -> bool {
        lock(&self.pending_return).as_ref().is_some_and(ScheduledTask::is_active)
    }

    /// Header navigation. Unknown scenario names leave the state unchanged.
    pub fn set_scenario(&self, scenario: &str, gap_id: Option<&str>) -> bool {
        let parsed = scenario.parse::<Scenario>().map_err(DomainError::from);
        let outcome = parsed.and_then(|scenario| {
            self.dispatch(ScenarioEvent::Navigate { scenario, gap_id: gap_id.map(GapId::from) })
        });
        match outcome {
            Ok(_) => true,
            Err(error) => {
                debug!(
                    event_name = "demo.controller.scenario_ignored",
                    correlation_id = %self.session_id,
                    error = %error,
                    "ignoring navigation request"
                );
                false
            }
        }
    }

    pub fn navigate(&self, scenario: Scenario, gap_id: Option<GapId>) {
        let _ = self.dispatch(ScenarioEvent::Navigate { scenario, gap_id });
    }

    /// Opens the thread for a digest entry. Unknown gap ids are a no-op.
    pub fn view_thread(&self, gap_id: &str) -> bool {
        let Some(gap) = self.dataset.gap(gap_id) else {
            debug!(
                event_name = "demo.controller.unknown_gap",
                correlation_id = %self.session_id,
                gap_id,
                "view thread requested for unknown gap"
            );
            return false;
        };
        self.dispatch(ScenarioEvent::ViewThread { gap_id: gap.id.clone(), action: gap.action })
            .is_ok()
    }

    /// Resolves an auto-PR gap. Unknown ids and gaps of another kind are a no-op.
    pub fn approve(&self, gap_id: &str) -> bool {
        self.resolve(gap_id, Resolution::PrApproved)
    }

    /// Resolves an ask-expert gap. Unknown ids and gaps of another kind are a no-op.
    pub fn complete_qa(&self, gap_id: &str) -> bool {
        self.resolve(gap_id, Resolution::ExpertAnswered)
    }

    pub fn reject(&self, gap_id: &str) -> bool {
        self.dispatch(ScenarioEvent::GapRejected { gap_id: GapId::from(gap_id) }).is_ok()
    }

    pub fn reset(&self) {
        let _ = self.dispatch(ScenarioEvent::Reset);
    }

    pub fn set_help(&self, help: bool) {
        lock(&self.state).help = help;
    }

    pub fn toggle_help(&self) -> bool {
        let mut state = lock(&self.state);
        state.help = !state.help;
        state.help
    }

    /// Hydrates the state from a deep link. A missing or unknown scenario keeps the
    /// current one; a present gap is selected. Parameters that already describe the
    /// current state change nothing, so a pending return survives a page reload.
    pub fn apply_params(&self, params: &DemoParams) {
        let current = self.snapshot();
        if current.params() == *params {
            return;
        }

        if params.scenario.is_some() || params.gap.is_some() {
            let scenario = params.scenario.unwrap_or(current.scenario);
            let target = DemoParams::new(scenario, params.gap.clone(), current.help);
            if target != current.params() {
                self.navigate(scenario, params.gap.clone());
            }
        }
        self.set_help(params.help);
    }

    fn resolve(&self, gap_id: &str, resolution: Resolution) -> bool {
        let gap = match self.dataset.gap(gap_id) {
            Some(gap) if resolution.applies_to(gap.action) => gap,
            found => {
                debug!(
                    event_name = "demo.controller.resolution_ignored",
                    correlation_id = %self.session_id,
                    gap_id,
                    resolution = ?resolution,
                    gap_action = ?found.map(|gap| gap.action),
                    "resolution requested for unknown or mismatched gap"
                );
                return false;
            }
        };
        self.dispatch(ScenarioEvent::GapResolved { gap_id: gap.id.clone(), resolution }).is_ok()
    }

    fn dispatch(&self, event: ScenarioEvent) -> Result<TransitionOutcome, DomainError> {
        let (outcome, follow_ups) = {
            let mut state = lock(&self.state);
            let outcome = self.engine.apply_traced(state.scenario, &event, &self.session_id)?;
            let follow_ups = apply_state_actions(&mut state, &outcome);
            (outcome, follow_ups)
        };

        for action in follow_ups {
            match action {
                ScenarioAction::NotifyResolved(gap_id, resolution) => {
                    self.notify_resolved(gap_id, resolution)
                }
                ScenarioAction::NotifyRejected(gap_id) => self.notify_rejected(gap_id),
                ScenarioAction::ScheduleReturnToDigest => self.schedule_return(),
                ScenarioAction::CancelPendingReturn => self.cancel_pending_return(),
                _ => {}
            }
        }

        Ok(outcome)
    }

    fn notify_resolved(&self, gap_id: GapId, resolution: Resolution) {
        let title = self.gap_title(&gap_id);
        let description = match resolution {
            Resolution::PrApproved => {
                format!("Athena is opening the pull request for {title}.")
            }
            Resolution::ExpertAnswered => {
                format!("The expert answer for {title} was added to the knowledge graph.")
            }
        };
        info!(
            event_name = "demo.controller.gap_resolved",
            correlation_id = %self.session_id,
            gap_id = %gap_id,
            resolution = ?resolution,
            "gap resolved"
        );
        self.notifier.notify(
            Notification::new(
                NotificationTone::Success,
                resolution.notification_title(),
                description,
                self.session_id.clone(),
            )
            .for_gap(gap_id),
        );
    }

    fn notify_rejected(&self, gap_id: GapId) {
        let title = self.gap_title(&gap_id);
        self.notifier.notify(
            Notification::new(
                NotificationTone::Error,
                "PR rejected",
                format!("Athena will not open a pull request for {title}."),
                self.session_id.clone(),
            )
            .for_gap(gap_id),
        );
    }

    fn gap_title(&self, gap_id: &GapId) -> String {
        self.dataset
            .gap(gap_id.as_str())
            .map(|gap| gap.title.clone())
            .unwrap_or_else(|| gap_id.to_string())
    }

    fn schedule_return(&self) {
        let state = Arc::clone(&self.state);
        let engine = self.engine.clone();
        let session_id = self.session_id.clone();
        let scheduled = ScheduledTask::after(self.timing.approve_return_delay(), move || {
            return_to_digest(&engine, &state, &session_id)
        });

        match scheduled {
            Ok(task) => *lock(&self.pending_return) = Some(task),
            Err(error) => {
                warn!(
                    event_name = "demo.controller.return_timer_unavailable",
                    correlation_id = %self.session_id,
                    error = %error,
                    "returning to digest immediately"
                );
                self.cancel_pending_return();
                return_to_digest(&self.engine, &self.state, &self.session_id);
            }
        }
    }

    fn cancel_pending_return(&self) {
        if let Some(mut task) = lock(&self.pending_return).take() {
            task.cancel();
        }
    }
}

fn return_to_digest(engine: &FlowEngine<ScenarioFlow>, state: &Mutex<DemoState>, session_id: &str) {
    let mut state = lock(state);
    if let Ok(outcome) = engine.apply_traced(state.scenario, &ScenarioEvent::ReturnDelayElapsed, session_id)
    {
        apply_state_actions(&mut state, &outcome);
    }
}

/// Applies the state-only actions and hands back the ones with side effects.
fn apply_state_actions(state: &mut DemoState, outcome: &TransitionOutcome) -> Vec<ScenarioAction> {
    state.scenario = outcome.to;
    let mut follow_ups = Vec::new();

    for action in &outcome.actions {
        match action {
            ScenarioAction::SelectGap(gap_id) => state.selected_gap = Some(gap_id.clone()),
            ScenarioAction::ClearSelection => state.selected_gap = None,
            ScenarioAction::MarkResolved(gap_id) => {
                if !state.resolved.contains(gap_id) {
                    state.resolved.push(gap_id.clone());
                }
            }
            ScenarioAction::ClearResolved => state.resolved.clear(),
            ScenarioAction::ClearHelp => state.help = false,
            ScenarioAction::NotifyResolved(..)
            | ScenarioAction::NotifyRejected(_)
            | ScenarioAction::ScheduleReturnToDigest
            | ScenarioAction::CancelPendingReturn => follow_ups.push(action.clone()),
        }
    }

    follow_ups
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
