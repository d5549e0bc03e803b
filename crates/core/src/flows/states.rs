use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::gap::{GapAction, GapId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    #[default]
    Digest,
    AutoPr,
    Qna,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Digest, Scenario::AutoPr, Scenario::Qna];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digest => "digest",
            Self::AutoPr => "auto-pr",
            Self::Qna => "qna",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Digest => "Daily Digest",
            Self::AutoPr => "Auto-PR (High Confidence)",
            Self::Qna => "Expert Q&A (Medium Confidence)",
        }
    }

    /// Whether the screen needs a selected gap to show anything.
    pub fn requires_gap(&self) -> bool {
        !matches!(self, Self::Digest)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown scenario `{0}` (expected digest|auto-pr|qna)")]
pub struct UnknownScenario(pub String);

impl FromStr for Scenario {
    type Err = UnknownScenario;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "digest" => Ok(Self::Digest),
            "auto-pr" => Ok(Self::AutoPr),
            "qna" => Ok(Self::Qna),
            other => Err(UnknownScenario(other.to_owned())),
        }
    }
}

/// How a gap got resolved; decides the confirmation shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    PrApproved,
    ExpertAnswered,
}

impl Resolution {
    pub fn notification_title(&self) -> &'static str {
        match self {
            Self::PrApproved => "PR approved",
            Self::ExpertAnswered => "Knowledge captured",
        }
    }

    /// Whether this resolution closes gaps with the given action.
    pub fn applies_to(&self, action: GapAction) -> bool {
        matches!(
            (self, action),
            (Self::PrApproved, GapAction::AutoPr) | (Self::ExpertAnswered, GapAction::AskExpert)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioEvent {
    /// Header navigation or a deep link.
    Navigate { scenario: Scenario, gap_id: Option<GapId> },
    /// "View Thread" on a digest entry for a gap known to the dataset.
    ViewThread { gap_id: GapId, action: GapAction },
    /// PR approved or expert answer recorded.
    GapResolved { gap_id: GapId, resolution: Resolution },
    GapRejected { gap_id: GapId },
    ReturnDelayElapsed,
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioAction {
    SelectGap(GapId),
    ClearSelection,
    MarkResolved(GapId),
    NotifyResolved(GapId, Resolution),
    NotifyRejected(GapId),
    ScheduleReturnToDigest,
    CancelPendingReturn,
    ClearResolved,
    ClearHelp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: Scenario,
    pub to: Scenario,
    pub event: ScenarioEvent,
    pub actions: Vec<ScenarioAction>,
}

#[cfg(test)]
mod tests {
    use super::{Resolution, Scenario, UnknownScenario};
    use crate::domain::gap::GapAction;

    #[test]
    fn scenario_names_round_trip_through_from_str() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.as_str().parse::<Scenario>(), Ok(scenario));
        }
    }

    #[test]
    fn unknown_scenario_names_are_rejected() {
        assert_eq!("settings".parse::<Scenario>(), Err(UnknownScenario("settings".to_owned())));
        assert!("Digest".parse::<Scenario>().is_err());
        assert!("".parse::<Scenario>().is_err());
    }

    #[test]
    fn each_resolution_closes_one_kind_of_gap() {
        assert!(Resolution::PrApproved.applies_to(GapAction::AutoPr));
        assert!(!Resolution::PrApproved.applies_to(GapAction::AskExpert));
        assert!(Resolution::ExpertAnswered.applies_to(GapAction::AskExpert));
        assert!(!Resolution::ExpertAnswered.applies_to(GapAction::AutoPr));
    }

    #[test]
    fn only_thread_scenarios_require_a_gap() {
        assert!(!Scenario::Digest.requires_gap());
        assert!(Scenario::AutoPr.requires_gap());
        assert!(Scenario::Qna.requires_gap());
    }
}
