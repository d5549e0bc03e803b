//! Pure renderers from demo state to Slack threads.
//!
//! Every renderer takes the data it shows plus the reveal progress of the mounted
//! screen and returns messages; none of them touch the session.

pub mod auto_pr;
pub mod digest;
pub mod header;
pub mod qna;
pub mod welcome;

use athena_core::{
    DailyDigest, DemoDataset, DemoSession, DemoState, KnowledgeGap, Scenario, ScenarioController,
    ViewProgress,
};
use serde::Serialize;

use crate::blocks::MessageTemplate;
use crate::thread::SlackThread;

pub struct ViewContext<'a> {
    pub state: &'a DemoState,
    pub dataset: &'a DemoDataset,
    pub digest: &'a DailyDigest,
    pub progress: &'a ViewProgress,
}

impl<'a> ViewContext<'a> {
    pub fn selected_gap(&self) -> Option<&'a KnowledgeGap> {
        let gap_id = self.state.selected_gap.as_ref()?;
        self.dataset.gap(gap_id.as_str())
    }
}

/// The thread for the current scenario. Screens that need a gap render nothing
/// without one.
pub fn render_thread(context: &ViewContext<'_>) -> SlackThread {
    let gap = context.selected_gap();
    match (context.state.scenario, gap) {
        (Scenario::Digest, _) => digest::digest_thread(context.digest, context.progress),
        (Scenario::AutoPr, Some(gap)) => {
            auto_pr::auto_pr_thread(gap, context.state.is_resolved(&gap.id), context.progress)
        }
        (Scenario::Qna, Some(gap)) => qna::qna_thread(gap, context.digest, context.progress),
        (Scenario::AutoPr | Scenario::Qna, None) => SlackThread::new(),
    }
}

/// Everything a client needs to draw the demo page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedDemo {
    pub state: DemoState,
    pub query: String,
    pub demo_href: String,
    pub overall_score: u8,
    pub progress: ViewProgress,
    pub navigation: MessageTemplate,
    pub badge: MessageTemplate,
    pub tour: Option<MessageTemplate>,
    pub thread: SlackThread,
}

pub fn render_session(session: &DemoSession) -> RenderedDemo {
    let (state, progress) = session.view();
    render_state(session.controller(), state, progress)
}

pub fn render_with_progress(
    controller: &ScenarioController,
    progress: ViewProgress,
) -> RenderedDemo {
    render_state(controller, controller.snapshot(), progress)
}

/// Renders `state` exactly as given; the controller only supplies the dataset.
pub fn render_state(
    controller: &ScenarioController,
    state: DemoState,
    progress: ViewProgress,
) -> RenderedDemo {
    let digest = controller.digest_for(&state);
    let dataset = controller.dataset();
    let context = ViewContext { state: &state, dataset, digest: &digest, progress: &progress };

    let thread = render_thread(&context);
    let gap = context.selected_gap();
    let navigation = header::navigation(&state, dataset);
    let badge = header::scenario_badge(state.scenario, gap);
    let tour = state.help.then(|| header::tour_overlay(state.scenario));
    let params = state.params();

    RenderedDemo {
        query: params.to_query_string(),
        demo_href: params.demo_href(),
        overall_score: digest.overall_score,
        navigation,
        badge,
        tour,
        thread,
        progress,
        state,
    }
}
