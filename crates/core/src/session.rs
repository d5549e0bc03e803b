//! One running demo: the controller plus the screen instance currently mounted.
//!
//! A screen is identified by its scenario and selected gap. Whenever either changes the
//! previous instance is dropped, which cancels its reveal and selection timers, and a
//! fresh one starts from zero.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::controller::{DemoState, ScenarioController};
use crate::dataset::DemoDataset;
use crate::domain::gap::GapId;
use crate::flows::Scenario;
use crate::reveal::{RevealSchedule, RevealSequencer};
use crate::selection::{PatternSelection, SelectionError, SelectionStage};

/// Greeting and graph-score messages around the per-gap entries of the digest.
pub const DIGEST_FRAME_MESSAGES: usize = 2;
/// Proposal message and PR preview.
pub const AUTO_PR_MESSAGES: usize = 2;
/// Incident summary; everything after it is driven by the pattern selection.
pub const QNA_LEAD_MESSAGES: usize = 1;

/// How many top-level messages a screen reveals on its timer.
pub fn reveal_steps(scenario: Scenario, gap_present: bool, dataset: &DemoDataset) -> usize {
    match scenario {
        Scenario::Digest => dataset.gaps().len() + DIGEST_FRAME_MESSAGES,
        Scenario::AutoPr if gap_present => AUTO_PR_MESSAGES,
        Scenario::Qna if gap_present => QNA_LEAD_MESSAGES,
        Scenario::AutoPr | Scenario::Qna => 0,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnaProgress {
    pub options_expanded: bool,
    pub selected_pattern: Option<String>,
    pub stage: SelectionStage,
}

impl QnaProgress {
    /// The thread as it looks once the expert has answered with `pattern_id`.
    pub fn finished(pattern_id: impl Into<String>) -> Self {
        Self {
            options_expanded: true,
            selected_pattern: Some(pattern_id.into()),
            stage: SelectionStage::DocumentationUpdated,
        }
    }
}

/// What the mounted screen currently shows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewProgress {
    pub revealed: usize,
    pub qna: Option<QnaProgress>,
}

impl ViewProgress {
    /// Everything revealed, no Q&A interaction yet. Used for static renders.
    pub fn complete() -> Self {
        Self { revealed: usize::MAX, qna: None }
    }

    pub fn shows(&self, index: usize) -> bool {
        index < self.revealed
    }

    pub fn qna_stage(&self) -> SelectionStage {
        self.qna.as_ref().map(|qna| qna.stage).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ScreenKey {
    scenario: Scenario,
    gap: Option<GapId>,
}

#[derive(Debug)]
struct MountedScreen {
    key: ScreenKey,
    reveal: RevealSequencer,
    selection: Option<PatternSelection>,
}

#[derive(Debug)]
pub struct DemoSession {
    controller: Arc<ScenarioController>,
    screen: Mutex<Option<MountedScreen>>,
}

impl DemoSession {
    pub fn new(controller: Arc<ScenarioController>) -> Self {
        Self { controller, screen: Mutex::new(None) }
    }

    pub fn controller(&self) -> &Arc<ScenarioController> {
        &self.controller
    }

    /// Mounts a new screen instance when the controller moved to another screen.
    /// Returns whether a remount happened.
    pub fn sync_screen(&self) -> bool {
        let mut screen = lock(&self.screen);
        self.sync_locked(&mut screen)
    }

    pub fn progress(&self) -> ViewProgress {
        self.view().1
    }

    /// The controller state paired with the progress of the screen mounted for it.
    pub fn view(&self) -> (DemoState, ViewProgress) {
        let mut screen = lock(&self.screen);
        let state = self.controller.snapshot();
        self.mount_for(&mut screen, &state);

        let progress = match screen.as_ref() {
            Some(mounted) => ViewProgress {
                revealed: mounted.reveal.visible(),
                qna: mounted.selection.as_ref().map(|selection| QnaProgress {
                    options_expanded: selection.options_expanded(),
                    selected_pattern: selection.selected_pattern().map(str::to_owned),
                    stage: selection.stage(),
                }),
            },
            None => ViewProgress { revealed: 0, qna: None },
        };
        (state, progress)
    }

    /// Flips the Q&A options disclosure. Returns `None` outside a Q&A thread.
    pub fn toggle_options(&self) -> Option<bool> {
        let mut screen = lock(&self.screen);
        self.sync_locked(&mut screen);
        screen.as_mut()?.selection.as_mut().map(PatternSelection::toggle_options)
    }

    /// Records the expert's pick in the mounted Q&A thread. Completion is reported to
    /// the controller once the documentation update has been shown.
    pub fn select_pattern(&self, pattern_id: &str) -> bool {
        let mut screen = lock(&self.screen);
        self.sync_locked(&mut screen);
        let Some(selection) = screen.as_mut().and_then(|mounted| mounted.selection.as_mut())
        else {
            debug!(
                event_name = "demo.session.selection_ignored",
                correlation_id = %self.controller.session_id(),
                pattern_id,
                "no q&a thread is mounted"
            );
            return false;
        };

        let controller = Arc::clone(&self.controller);
        let result = selection.select(pattern_id, move |gap_id: GapId| {
            controller.complete_qa(gap_id.as_str());
        });

        match result {
            Ok(()) => true,
            Err(SelectionError::Timer(error)) => {
                warn!(
                    event_name = "demo.session.selection_timer_unavailable",
                    correlation_id = %self.controller.session_id(),
                    error = %error,
                    "completing q&a immediately"
                );
                let gap_id = selection.gap_id().clone();
                drop(screen);
                self.controller.complete_qa(gap_id.as_str());
                true
            }
            Err(error) => {
                debug!(
                    event_name = "demo.session.selection_ignored",
                    correlation_id = %self.controller.session_id(),
                    error = %error,
                    "pattern selection refused"
                );
                false
            }
        }
    }

    /// Receiver for the mounted screen's visible count.
    pub fn reveal_watch(&self) -> Option<watch::Receiver<usize>> {
        let mut screen = lock(&self.screen);
        self.sync_locked(&mut screen);
        screen.as_ref().map(|mounted| mounted.reveal.subscribe())
    }

    pub fn reveal_total(&self) -> usize {
        let mut screen = lock(&self.screen);
        self.sync_locked(&mut screen);
        screen.as_ref().map(|mounted| mounted.reveal.total()).unwrap_or_default()
    }

    /// Receiver for the mounted Q&A thread's stage, if one is mounted.
    pub fn selection_watch(&self) -> Option<watch::Receiver<SelectionStage>> {
        let mut screen = lock(&self.screen);
        self.sync_locked(&mut screen);
        screen.as_ref()?.selection.as_ref().map(PatternSelection::subscribe)
    }

    /// Drops the mounted screen and its timers.
    pub fn unmount(&self) {
        lock(&self.screen).take();
    }

    fn sync_locked(&self, screen: &mut Option<MountedScreen>) -> bool {
        let state = self.controller.snapshot();
        self.mount_for(screen, &state)
    }

    fn mount_for(&self, screen: &mut Option<MountedScreen>, state: &DemoState) -> bool {
        let key = ScreenKey { scenario: state.scenario, gap: state.selected_gap.clone() };
        if screen.as_ref().is_some_and(|mounted| mounted.key == key) {
            return false;
        }

        // Old timers must stop before the new instance starts counting.
        screen.take();
        *screen = Some(self.mount(key));
        true
    }

    fn mount(&self, key: ScreenKey) -> MountedScreen {
        let dataset = self.controller.dataset();
        let timing = self.controller.timing();
        let gap = key.gap.as_ref().and_then(|gap_id| dataset.gap(gap_id.as_str()));
        let steps = reveal_steps(key.scenario, gap.is_some(), dataset);

        let reveal = match RevealSequencer::start(RevealSchedule::stepped(steps, timing.reveal_step()))
        {
            Ok(reveal) => reveal,
            Err(error) => {
                debug!(
                    event_name = "demo.session.static_mount",
                    correlation_id = %self.controller.session_id(),
                    error = %error,
                    "mounting fully revealed screen"
                );
                RevealSequencer::completed(steps)
            }
        };

        let selection = match (key.scenario, gap) {
            (Scenario::Qna, Some(gap)) => Some(PatternSelection::new(gap, timing)),
            _ => None,
        };

        debug!(
            event_name = "demo.session.screen_mounted",
            correlation_id = %self.controller.session_id(),
            scenario = %key.scenario,
            gap_id = ?key.gap,
            steps,
            "screen mounted"
        );

        MountedScreen { key, reveal, selection }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::sleep;

    use super::{reveal_steps, DemoSession, ViewProgress};
    use crate::config::DemoTiming;
    use crate::controller::ScenarioController;
    use crate::dataset::DemoDataset;
    use crate::flows::Scenario;
    use crate::notifications::InMemoryNotificationSink;
    use crate::reveal::wait_for_count;
    use crate::selection::{wait_for_stage, SelectionStage};

    fn session() -> (DemoSession, InMemoryNotificationSink) {
        let sink = InMemoryNotificationSink::default();
        let controller = ScenarioController::new(
            Arc::new(DemoDataset::builtin()),
            DemoTiming::default(),
            Arc::new(sink.clone()),
        );
        (DemoSession::new(Arc::new(controller)), sink)
    }

    #[test]
    fn reveal_steps_follow_the_screen_layout() {
        let dataset = DemoDataset::builtin();
        assert_eq!(reveal_steps(Scenario::Digest, false, &dataset), 4);
        assert_eq!(reveal_steps(Scenario::AutoPr, true, &dataset), 2);
        assert_eq!(reveal_steps(Scenario::Qna, true, &dataset), 1);
        assert_eq!(reveal_steps(Scenario::AutoPr, false, &dataset), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn digest_reveals_one_message_per_second() {
        let (session, _) = session();
        let mut visible = session.reveal_watch().expect("digest mounted");

        assert_eq!(wait_for_count(&mut visible, 1).await, 1);
        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(session.progress().revealed, 2);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(session.progress().revealed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_screens_restarts_the_reveal() {
        let (session, _) = session();
        let mut visible = session.reveal_watch().expect("digest mounted");
        wait_for_count(&mut visible, 2).await;

        session.controller().view_thread("retry-logic-stripe");

        assert!(session.sync_screen());
        assert_eq!(session.progress().revealed, 0);
        assert!(!session.sync_screen());
    }

    #[tokio::test(start_paused = true)]
    async fn qna_selection_completes_through_the_controller() {
        let (session, sink) = session();
        session.controller().view_thread("feature-flag-invoice");

        assert_eq!(session.toggle_options(), Some(true));
        assert!(session.select_pattern("flag-with-logging"));
        assert!(!session.select_pattern("no-flag-check"));

        let mut stage = session.selection_watch().expect("qna mounted");
        wait_for_stage(&mut stage, SelectionStage::DocumentationUpdated).await;
        sleep(Duration::from_millis(1)).await;

        let state = session.controller().snapshot();
        assert_eq!(state.resolved.len(), 1);
        assert_eq!(sink.notifications().len(), 1);

        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(session.controller().scenario(), Scenario::Digest);
        assert_eq!(session.progress().qna, None);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_thread_cancels_the_pending_completion() {
        let (session, _) = session();
        session.controller().view_thread("feature-flag-invoice");
        assert!(session.select_pattern("flag-with-logging"));

        session.controller().set_scenario("digest", None);
        session.sync_screen();
        sleep(Duration::from_secs(10)).await;

        assert!(session.controller().snapshot().resolved.is_empty());
    }

    #[test]
    fn without_a_runtime_screens_mount_fully_revealed() {
        let (session, _) = session();
        session.controller().view_thread("feature-flag-invoice");

        let progress = session.progress();
        assert_eq!(progress.revealed, 1);
        assert_eq!(progress.qna_stage(), SelectionStage::AwaitingSelection);

        assert!(session.select_pattern("flag-with-logging"));
        assert_eq!(session.controller().snapshot().resolved.len(), 1);
        assert_eq!(session.controller().scenario(), Scenario::Digest);
    }

    #[tokio::test(start_paused = true)]
    async fn view_pairs_the_state_with_its_own_screen() {
        let (session, _) = session();
        session.controller().view_thread("retry-logic-stripe");
        let mut visible = session.reveal_watch().expect("auto-pr screen mounted");
        assert_eq!(wait_for_count(&mut visible, 2).await, 2);

        session.controller().approve("retry-logic-stripe");
        sleep(Duration::from_millis(1_600)).await;

        let (state, progress) = session.view();
        assert_eq!(state.scenario, Scenario::Digest);
        assert_eq!(progress.revealed, 0);
        assert_eq!(session.reveal_total(), 4);
    }

    #[test]
    fn complete_progress_shows_every_message() {
        let progress = ViewProgress::complete();
        assert!(progress.shows(0));
        assert!(progress.shows(42));
        assert_eq!(progress.qna_stage(), SelectionStage::AwaitingSelection);
    }
}
