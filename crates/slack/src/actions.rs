//! Interactive block actions and their effect on a demo session.

use athena_core::{ApplicationError, DemoSession, DomainError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const VIEW_THREAD: &str = "athena.digest.view_thread.v1";
pub const VIEW_COVERAGE: &str = "athena.digest.view_coverage.v1";
pub const NOMINATE_EXPERT: &str = "athena.digest.nominate_expert.v1";
pub const HELP_IMPROVE: &str = "athena.digest.help_improve.v1";

pub const VIEW_PROPOSED_PR: &str = "athena.auto_pr.view_pr.v1";
pub const APPROVE_PR: &str = "athena.auto_pr.approve.v1";
pub const REJECT_PR: &str = "athena.auto_pr.reject.v1";
pub const OPEN_IN_GITHUB: &str = "athena.auto_pr.open_github.v1";

pub const TOGGLE_OPTIONS: &str = "athena.qna.toggle_options.v1";
pub const SELECT_PATTERN: &str = "athena.qna.select_pattern.v1";
pub const ANSWER_NEXT_QUESTION: &str = "athena.qna.answer_next.v1";
pub const VIEW_DOCUMENTATION: &str = "athena.qna.view_docs.v1";
pub const VIEW_README: &str = "athena.qna.view_readme.v1";

pub const SET_SCENARIO: &str = "athena.nav.set_scenario.v1";
pub const TOGGLE_HELP: &str = "athena.nav.toggle_help.v1";
pub const RESET: &str = "athena.nav.reset.v1";

/// Buttons that are part of the script but change nothing.
const DECORATIVE_ACTIONS: [&str; 8] = [
    VIEW_COVERAGE,
    NOMINATE_EXPERT,
    HELP_IMPROVE,
    VIEW_PROPOSED_PR,
    OPEN_IN_GITHUB,
    ANSWER_NEXT_QUESTION,
    VIEW_DOCUMENTATION,
    VIEW_README,
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl BlockAction {
    pub fn new(action_id: impl Into<String>, value: Option<&str>) -> Self {
        Self { action_id: action_id.into(), value: value.map(str::to_owned) }
    }
}

/// Button value for header navigation: `scenario` or `scenario:gap_id`.
pub fn scenario_value(scenario: &str, gap_id: Option<&str>) -> String {
    match gap_id {
        Some(gap_id) => format!("{scenario}:{gap_id}"),
        None => scenario.to_owned(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DemoCommand {
    SetScenario { scenario: String, gap_id: Option<String> },
    ViewThread { gap_id: String },
    Approve { gap_id: String },
    Reject { gap_id: String },
    ToggleOptions,
    SelectPattern { pattern_id: String },
    ToggleHelp,
    Reset,
    Acknowledge,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("unsupported action `{0}`")]
    Unsupported(String),
    #[error("action `{0}` requires a value")]
    MissingValue(String),
}

impl From<ActionError> for ApplicationError {
    fn from(error: ActionError) -> Self {
        match error {
            ActionError::Unsupported(action_id) => Self::UnsupportedAction(action_id),
            ActionError::MissingValue(_) => {
                Self::Domain(DomainError::InvariantViolation(error.to_string()))
            }
        }
    }
}

impl DemoCommand {
    pub fn parse(action: &BlockAction) -> Result<Self, ActionError> {
        let value = || {
            action
                .value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| ActionError::MissingValue(action.action_id.clone()))
        };

        match action.action_id.as_str() {
            VIEW_THREAD => Ok(Self::ViewThread { gap_id: value()? }),
            APPROVE_PR => Ok(Self::Approve { gap_id: value()? }),
            REJECT_PR => Ok(Self::Reject { gap_id: value()? }),
            TOGGLE_OPTIONS => Ok(Self::ToggleOptions),
            SELECT_PATTERN => Ok(Self::SelectPattern { pattern_id: value()? }),
            SET_SCENARIO => {
                let raw = value()?;
                let (scenario, gap_id) = match raw.split_once(':') {
                    Some((scenario, gap_id)) if !gap_id.is_empty() => {
                        (scenario.to_owned(), Some(gap_id.to_owned()))
                    }
                    Some((scenario, _)) => (scenario.to_owned(), None),
                    None => (raw, None),
                };
                Ok(Self::SetScenario { scenario, gap_id })
            }
            TOGGLE_HELP => Ok(Self::ToggleHelp),
            RESET => Ok(Self::Reset),
            other if DECORATIVE_ACTIONS.contains(&other) => Ok(Self::Acknowledge),
            other => Err(ActionError::Unsupported(other.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The session state or the mounted screen changed.
    Applied,
    /// Valid action that had nothing to act on.
    Ignored,
}

pub fn apply_action(
    session: &DemoSession,
    action: &BlockAction,
    correlation_id: &str,
) -> Result<ActionOutcome, ActionError> {
    let command = DemoCommand::parse(action)?;
    let controller = session.controller();
    let before = controller.snapshot();

    let applied = match &command {
        DemoCommand::SetScenario { scenario, gap_id } => {
            controller.set_scenario(scenario, gap_id.as_deref())
        }
        DemoCommand::ViewThread { gap_id } => controller.view_thread(gap_id),
        DemoCommand::Approve { gap_id } => {
            controller.approve(gap_id) && controller.snapshot() != before
        }
        DemoCommand::Reject { gap_id } => controller.reject(gap_id),
        DemoCommand::ToggleOptions => session.toggle_options().is_some(),
        DemoCommand::SelectPattern { pattern_id } => session.select_pattern(pattern_id),
        DemoCommand::ToggleHelp => {
            controller.toggle_help();
            true
        }
        DemoCommand::Reset => {
            controller.reset();
            true
        }
        DemoCommand::Acknowledge => false,
    };

    session.sync_screen();
    let outcome = if applied { ActionOutcome::Applied } else { ActionOutcome::Ignored };

    match outcome {
        ActionOutcome::Applied => info!(
            event_name = "demo.action.applied",
            correlation_id,
            action_id = %action.action_id,
            scenario = %controller.scenario(),
            "block action applied"
        ),
        ActionOutcome::Ignored => debug!(
            event_name = "demo.action.ignored",
            correlation_id,
            action_id = %action.action_id,
            "block action had no effect"
        ),
    }

    Ok(outcome)
}
