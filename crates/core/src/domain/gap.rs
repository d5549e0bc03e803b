use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::expert::Expert;
use crate::flows::states::Scenario;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GapId(pub String);

impl GapId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GapId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// What Athena proposes for a gap. Also decides which scenario may display it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapAction {
    AutoPr,
    AskExpert,
}

impl GapAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoPr => "auto-pr",
            Self::AskExpert => "ask-expert",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AutoPr => "Propose Auto-PR",
            Self::AskExpert => "Ask Expert",
        }
    }

    pub fn scenario(&self) -> Scenario {
        match self {
            Self::AutoPr => Scenario::AutoPr,
            Self::AskExpert => Scenario::Qna,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub label: String,
    pub description: String,
    pub is_recommended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentLink {
    pub id: String,
    pub url: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGap {
    pub id: GapId,
    pub title: String,
    pub component: String,
    pub confidence: u8,
    pub action: GapAction,
    pub expert: Expert,
    pub nominated_by: Expert,
    pub incident: Option<String>,
    pub incident_links: Vec<IncidentLink>,
    pub reasoning: Option<String>,
    pub status: Option<GapStatus>,
    pub patterns: Vec<Pattern>,
}

impl KnowledgeGap {
    pub fn recommended_pattern(&self) -> Option<&Pattern> {
        self.patterns.iter().find(|pattern| pattern.is_recommended)
    }

    pub fn pattern(&self, pattern_id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|pattern| pattern.id == pattern_id)
    }

    /// Patterns that a refactor would bring in line with the recommended one.
    pub fn outdated_patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter().filter(|pattern| !pattern.is_recommended)
    }

    /// Copy of this gap with `status` overridden; the receiver stays untouched.
    pub fn with_status(&self, status: GapStatus) -> Self {
        Self { status: Some(status), ..self.clone() }
    }

    pub fn is_approved(&self) -> bool {
        self.status == Some(GapStatus::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::{GapAction, GapStatus};
    use crate::dataset::DemoDataset;
    use crate::flows::states::Scenario;

    #[test]
    fn action_maps_to_the_scenario_that_displays_it() {
        assert_eq!(GapAction::AutoPr.scenario(), Scenario::AutoPr);
        assert_eq!(GapAction::AskExpert.scenario(), Scenario::Qna);
    }

    #[test]
    fn action_serializes_as_kebab_case() {
        let json = serde_json::to_string(&GapAction::AskExpert).expect("serialize action");
        assert_eq!(json, "\"ask-expert\"");
    }

    #[test]
    fn with_status_copies_instead_of_mutating() {
        let dataset = DemoDataset::builtin();
        let original = dataset.gap("retry-logic-stripe").expect("retry gap");

        let approved = original.with_status(GapStatus::Approved);

        assert!(approved.is_approved());
        assert_eq!(original.status, None);
        assert_eq!(approved.patterns, original.patterns);
    }

    #[test]
    fn recommended_pattern_is_separated_from_outdated_ones() {
        let dataset = DemoDataset::builtin();
        let gap = dataset.gap("retry-logic-stripe").expect("retry gap");

        assert_eq!(gap.recommended_pattern().map(|p| p.id.as_str()), Some("safe-retry"));
        let outdated: Vec<&str> = gap.outdated_patterns().map(|p| p.id.as_str()).collect();
        assert_eq!(outdated, vec!["no-retry", "manual-retry"]);
    }
}
