use thiserror::Error;
use tracing::debug;

use crate::flows::states::{Scenario, ScenarioAction, ScenarioEvent, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> Scenario;
    fn transition(
        &self,
        current: Scenario,
        event: &ScenarioEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The three-screen demo walkthrough.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScenarioFlow;

impl FlowDefinition for ScenarioFlow {
    fn initial_state(&self) -> Scenario {
        Scenario::Digest
    }

    fn transition(
        &self,
        current: Scenario,
        event: &ScenarioEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_scenario(current, event)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> Scenario {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: Scenario,
        event: &ScenarioEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }

    /// Same as [`apply`](Self::apply), with the outcome recorded on the current span.
    pub fn apply_traced(
        &self,
        current: Scenario,
        event: &ScenarioEvent,
        correlation_id: &str,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => debug!(
                event_name = "demo.flow.transition_applied",
                correlation_id,
                from = %outcome.from,
                to = %outcome.to,
                event = ?outcome.event,
                "scenario transition applied"
            ),
            Err(error) => debug!(
                event_name = "demo.flow.transition_rejected",
                correlation_id,
                error = %error,
                "scenario transition rejected"
            ),
        }
        result
    }
}

impl Default for FlowEngine<ScenarioFlow> {
    fn default() -> Self {
        Self::new(ScenarioFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: Scenario, event: ScenarioEvent },
}

fn transition_scenario(
    current: Scenario,
    event: &ScenarioEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ScenarioAction::{
        CancelPendingReturn, ClearHelp, ClearResolved, ClearSelection, MarkResolved,
        NotifyRejected, NotifyResolved, ScheduleReturnToDigest, SelectGap,
    };
    use ScenarioEvent::{
        GapRejected, GapResolved, Navigate, Reset, ReturnDelayElapsed, ViewThread,
    };

    let (to, actions) = match (current, event) {
        (_, Navigate { scenario, gap_id }) => {
            let selection = match gap_id {
                Some(gap_id) => SelectGap(gap_id.clone()),
                None => ClearSelection,
            };
            (*scenario, vec![CancelPendingReturn, selection])
        }
        (_, ViewThread { gap_id, action }) => {
            (action.scenario(), vec![CancelPendingReturn, SelectGap(gap_id.clone())])
        }
        (_, GapResolved { gap_id, resolution }) => (
            current,
            vec![
                MarkResolved(gap_id.clone()),
                NotifyResolved(gap_id.clone(), *resolution),
                ScheduleReturnToDigest,
            ],
        ),
        (Scenario::AutoPr, GapRejected { gap_id }) => {
            (Scenario::AutoPr, vec![NotifyRejected(gap_id.clone())])
        }
        (_, ReturnDelayElapsed) => (Scenario::Digest, vec![ClearSelection]),
        (_, Reset) => (
            Scenario::Digest,
            vec![CancelPendingReturn, ClearResolved, ClearHelp, ClearSelection],
        ),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::domain::gap::{GapAction, GapId};
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, ScenarioFlow};
    use crate::flows::states::{Resolution, Scenario, ScenarioAction, ScenarioEvent};

    fn view_thread(gap_id: &str, action: GapAction) -> ScenarioEvent {
        ScenarioEvent::ViewThread { gap_id: GapId::from(gap_id), action }
    }

    #[test]
    fn digest_routes_threads_by_gap_action() {
        let engine = FlowEngine::default();

        let auto_pr = engine
            .apply(Scenario::Digest, &view_thread("retry-logic-stripe", GapAction::AutoPr))
            .expect("digest -> auto-pr");
        assert_eq!(auto_pr.to, Scenario::AutoPr);
        assert!(auto_pr
            .actions
            .contains(&ScenarioAction::SelectGap(GapId::from("retry-logic-stripe"))));

        let qna = engine
            .apply(Scenario::Digest, &view_thread("feature-flag-invoice", GapAction::AskExpert))
            .expect("digest -> qna");
        assert_eq!(qna.to, Scenario::Qna);
    }

    #[test]
    fn resolving_a_gap_stays_put_until_the_return_delay_elapses() {
        let engine = FlowEngine::default();
        let gap_id = GapId::from("retry-logic-stripe");

        let resolved = engine
            .apply(
                Scenario::AutoPr,
                &ScenarioEvent::GapResolved {
                    gap_id: gap_id.clone(),
                    resolution: Resolution::PrApproved,
                },
            )
            .expect("approve");
        assert_eq!(resolved.to, Scenario::AutoPr);
        assert_eq!(
            resolved.actions,
            vec![
                ScenarioAction::MarkResolved(gap_id.clone()),
                ScenarioAction::NotifyResolved(gap_id, Resolution::PrApproved),
                ScenarioAction::ScheduleReturnToDigest,
            ]
        );

        let returned = engine
            .apply(resolved.to, &ScenarioEvent::ReturnDelayElapsed)
            .expect("return to digest");
        assert_eq!(returned.to, Scenario::Digest);
        assert_eq!(returned.actions, vec![ScenarioAction::ClearSelection]);
    }

    #[test]
    fn reject_only_notifies() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(
                Scenario::AutoPr,
                &ScenarioEvent::GapRejected { gap_id: GapId::from("retry-logic-stripe") },
            )
            .expect("reject on auto-pr");

        assert_eq!(outcome.to, Scenario::AutoPr);
        assert!(matches!(outcome.actions.as_slice(), [ScenarioAction::NotifyRejected(_)]));
    }

    #[test]
    fn reject_outside_the_pr_screen_is_rejected() {
        let engine = FlowEngine::default();
        let event = ScenarioEvent::GapRejected { gap_id: GapId::from("feature-flag-invoice") };

        let error = engine.apply(Scenario::Qna, &event).expect_err("qna has no reject");

        assert_eq!(error, FlowTransitionError::InvalidTransition { state: Scenario::Qna, event });
    }

    #[test]
    fn reset_is_valid_from_every_scenario() {
        let engine = FlowEngine::default();
        for scenario in Scenario::ALL {
            let outcome = engine.apply(scenario, &ScenarioEvent::Reset).expect("reset");
            assert_eq!(outcome.to, Scenario::Digest);
            assert!(outcome.actions.contains(&ScenarioAction::ClearResolved));
            assert!(outcome.actions.contains(&ScenarioAction::ClearHelp));
        }
    }

    #[test]
    fn navigation_without_gap_clears_selection() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(Scenario::Qna, &ScenarioEvent::Navigate { scenario: Scenario::Digest, gap_id: None })
            .expect("navigate");

        assert_eq!(outcome.to, Scenario::Digest);
        assert!(outcome.actions.contains(&ScenarioAction::ClearSelection));
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = FlowEngine::new(ScenarioFlow);
        let events = [
            view_thread("retry-logic-stripe", GapAction::AutoPr),
            ScenarioEvent::GapResolved {
                gap_id: GapId::from("retry-logic-stripe"),
                resolution: Resolution::PrApproved,
            },
            ScenarioEvent::ReturnDelayElapsed,
            view_thread("feature-flag-invoice", GapAction::AskExpert),
        ];

        let run = |engine: &FlowEngine<ScenarioFlow>| {
            let mut state = engine.initial_state();
            let mut trail = Vec::new();
            for event in &events {
                let outcome = engine.apply(state, event).expect("deterministic run");
                trail.push(outcome.actions);
                state = outcome.to;
            }
            (state, trail)
        };

        let first = run(&engine);
        let second = run(&engine);

        assert_eq!(first, second);
        assert_eq!(first.0, Scenario::Qna);
        assert_eq!(ScenarioFlow.initial_state(), Scenario::Digest);
    }
}
