//! Plays the scripted demo end to end on real timers and prints a transcript.
//!
//! The script mirrors what a presenter clicks through: digest, auto-PR approval,
//! the return to the digest, the Q&A thread with the expert's answer, and the final
//! digest with both gaps resolved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context};
use athena_core::config::{AppConfig, LoadOptions};
use athena_core::reveal::wait_for_count;
use athena_core::selection::wait_for_stage;
use athena_core::{
    DemoDataset, DemoSession, DemoTiming, GapAction, InMemoryNotificationSink, Scenario,
    ScenarioController, SelectionStage,
};
use athena_slack::actions::{APPROVE_PR, SELECT_PATTERN, TOGGLE_OPTIONS, VIEW_THREAD};
use athena_slack::{apply_action, render_session, ActionOutcome, BlockAction};
use serde::Serialize;

use crate::commands::CommandResult;

const RETURN_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Serialize)]
struct WalkthroughSummary {
    command: &'static str,
    status: &'static str,
    speed: f64,
    steps: usize,
    resolved: Vec<String>,
    final_score: u8,
    notifications: usize,
    elapsed_ms: u64,
}

struct Transcript {
    lines: Vec<String>,
    steps: usize,
    notifications: usize,
    sink: InMemoryNotificationSink,
}

impl Transcript {
    fn new(sink: InMemoryNotificationSink) -> Self {
        Self { lines: Vec::new(), steps: 0, notifications: 0, sink }
    }

    fn record(&mut self, session: &DemoSession, title: &str) {
        let rendered = render_session(session);
        self.steps += 1;
        self.lines.push(format!("── {}. {title} ──", self.steps));
        self.lines.push(rendered.badge.to_terminal_text());
        if !rendered.thread.is_empty() {
            self.lines.push(rendered.thread.to_terminal_text());
        }
        for notification in self.sink.drain() {
            self.notifications += 1;
            self.lines.push(format!("🔔 {}: {}", notification.title, notification.description));
        }
    }
}

pub fn run(speed: f64) -> CommandResult {
    if !speed.is_finite() || speed <= 0.0 {
        return CommandResult::failure(
            "walkthrough",
            "invalid_argument",
            format!("--speed must be a positive number, got {speed}"),
            2,
        );
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("walkthrough", "config", error.to_string(), 3),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "walkthrough",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };

    let started = Instant::now();
    let sink = InMemoryNotificationSink::default();
    let mut transcript = Transcript::new(sink.clone());
    let timing = config.demo.timing.scaled(speed);

    let played = runtime.block_on(play(timing, sink, &mut transcript));
    let (resolved, final_score) = match played {
        Ok(result) => result,
        Err(error) => {
            return CommandResult::failure("walkthrough", "script", format!("{error:#}"), 1)
        }
    };

    let summary = WalkthroughSummary {
        command: "walkthrough",
        status: "ok",
        speed,
        steps: transcript.steps,
        resolved,
        final_score,
        notifications: transcript.notifications,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    match serde_json::to_string(&summary) {
        Ok(machine) => {
            transcript.lines.push(machine);
            CommandResult::output(transcript.lines.join("\n"))
        }
        Err(error) => CommandResult::failure("walkthrough", "serialization", error.to_string(), 1),
    }
}

async fn play(
    timing: DemoTiming,
    sink: InMemoryNotificationSink,
    transcript: &mut Transcript,
) -> anyhow::Result<(Vec<String>, u8)> {
    let dataset = Arc::new(DemoDataset::builtin());
    let auto_pr_gap = dataset
        .first_gap_for(GapAction::AutoPr)
        .context("dataset has no auto-PR gap")?
        .id
        .to_string();
    let qna_gap = dataset
        .first_gap_for(GapAction::AskExpert)
        .context("dataset has no ask-expert gap")?;
    let qna_gap_id = qna_gap.id.to_string();
    let recommended = qna_gap
        .recommended_pattern()
        .with_context(|| format!("gap `{qna_gap_id}` has no recommended pattern"))?
        .id
        .clone();

    let controller =
        Arc::new(ScenarioController::new(Arc::clone(&dataset), timing, Arc::new(sink)));
    let session = DemoSession::new(controller);

    session.sync_screen();
    reveal_all(&session).await;
    transcript.record(&session, "Daily digest");

    press(&session, VIEW_THREAD, Some(auto_pr_gap.as_str()))?;
    reveal_all(&session).await;
    transcript.record(&session, "Auto-PR proposal");

    press(&session, APPROVE_PR, Some(auto_pr_gap.as_str()))?;
    transcript.record(&session, "PR approved");

    settle_return(&session, timing).await;
    reveal_all(&session).await;
    transcript.record(&session, "Back on the digest");

    press(&session, VIEW_THREAD, Some(qna_gap_id.as_str()))?;
    reveal_all(&session).await;
    transcript.record(&session, "Expert question");

    press(&session, TOGGLE_OPTIONS, None)?;
    transcript.record(&session, "Options expanded");

    press(&session, SELECT_PATTERN, Some(recommended.as_str()))?;
    let mut stage = session.selection_watch().context("no q&a thread is mounted")?;
    wait_for_stage(&mut stage, SelectionStage::ExpertReplied).await;
    transcript.record(&session, "Expert reply");

    let reached = wait_for_stage(&mut stage, SelectionStage::DocumentationUpdated).await;
    ensure!(
        reached == SelectionStage::DocumentationUpdated,
        "q&a thread stopped at {reached:?}"
    );
    transcript.record(&session, "Documentation updated");

    settle_return(&session, timing).await;
    reveal_all(&session).await;
    transcript.record(&session, "Final digest");

    let controller = session.controller();
    let state = controller.snapshot();
    ensure!(
        state.scenario == Scenario::Digest,
        "walkthrough ended on `{}` instead of the digest",
        state.scenario
    );
    let final_score = controller.current_digest().overall_score;
    session.unmount();

    Ok((state.resolved.iter().map(ToString::to_string).collect(), final_score))
}

fn press(session: &DemoSession, action_id: &str, value: Option<&str>) -> anyhow::Result<()> {
    let correlation_id = session.controller().session_id().to_owned();
    let outcome = apply_action(session, &BlockAction::new(action_id, value), &correlation_id)
        .with_context(|| format!("action `{action_id}` failed"))?;
    ensure!(outcome == ActionOutcome::Applied, "action `{action_id}` had no effect");
    Ok(())
}

async fn reveal_all(session: &DemoSession) {
    let total = session.reveal_total();
    if let Some(mut receiver) = session.reveal_watch() {
        wait_for_count(&mut receiver, total).await;
    }
}

async fn settle_return(session: &DemoSession, timing: DemoTiming) {
    tokio::time::sleep(timing.approve_return_delay()).await;
    while session.controller().has_pending_return() {
        tokio::time::sleep(RETURN_POLL_INTERVAL).await;
    }
    session.sync_screen();
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn rejects_non_positive_speeds() {
        for speed in [0.0, -2.0, f64::NAN] {
            let result = run(speed);
            assert_eq!(result.exit_code, 2);
            assert!(result.output.contains("invalid_argument"));
        }
    }
}
