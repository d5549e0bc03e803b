//! Built-in demo dataset.
//!
//! Every record the demo shows is defined here and compiled in. Nothing is loaded at
//! runtime and nothing here is ever mutated; derived views are produced by copying.

use chrono::Utc;

use crate::domain::digest::{AreaStatus, DailyDigest, KnowledgeGraphArea};
use crate::domain::expert::{Expert, ExpertId};
use crate::domain::gap::{GapAction, GapId, KnowledgeGap, Pattern};
use crate::errors::DomainError;

pub const INITIAL_OVERALL_SCORE: u8 = 74;

const PLACEHOLDER_AVATAR: &str = "/placeholder.svg";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemoDataset {
    experts: Vec<Expert>,
    gaps: Vec<KnowledgeGap>,
    graph_areas: Vec<KnowledgeGraphArea>,
    overall_score: u8,
}

impl DemoDataset {
    pub fn builtin() -> Self {
        let alice = expert(
            "alice",
            "Alice Chen",
            "@alice",
            &["Payments", "Stripe Integration", "Error Handling"],
        );
        let bob =
            expert("bob", "Bob Williams", "@bob", &["Feature Flags", "Billing Core", "Infrastructure"]);
        let charlie = expert(
            "charlie",
            "Charlie Rodriguez",
            "@charlie",
            &["Team Lead", "Architecture", "Code Review"],
        );

        let gaps = vec![
            KnowledgeGap {
                id: GapId::from("retry-logic-stripe"),
                title: "Retry Logic in `stripe.chargeCustomer()`".to_owned(),
                component: "payments-core".to_owned(),
                confidence: 96,
                action: GapAction::AutoPr,
                expert: alice.clone(),
                nominated_by: charlie.clone(),
                incident: Some("#1129".to_owned()),
                incident_links: Vec::new(),
                reasoning: None,
                status: None,
                patterns: vec![
                    pattern("no-retry", "🅰️", "No retry", false),
                    pattern("manual-retry", "🅱️", "Manual loop with fixed delay", false),
                    pattern(
                        "safe-retry",
                        "🆎",
                        "Uses resolveSafeRetry() with exponential backoff and logging",
                        true,
                    ),
                ],
            },
            KnowledgeGap {
                id: GapId::from("feature-flag-invoice"),
                title: "Feature Flag Guard in `async_invoice_dispatch`".to_owned(),
                component: "billing-core".to_owned(),
                confidence: 83,
                action: GapAction::AskExpert,
                expert: bob.clone(),
                nominated_by: charlie.clone(),
                incident: Some("#1342".to_owned()),
                incident_links: Vec::new(),
                reasoning: None,
                status: None,
                patterns: vec![
                    pattern("no-flag-check", "🅰️", "No flag check", false),
                    pattern("flag-no-logging", "🅱️", "Flag check without fallback logging", false),
                    pattern("flag-with-logging", "🆎", "Flag check + logging fallback", true),
                ],
            },
        ];

        let graph_areas = vec![
            KnowledgeGraphArea {
                name: "Retry Logic".to_owned(),
                component: "payments-core".to_owned(),
                score: 100,
                status: AreaStatus::Verified,
                expert: Some(alice.clone()),
            },
            KnowledgeGraphArea {
                name: "Feature Flags".to_owned(),
                component: "billing-core".to_owned(),
                score: 85,
                status: AreaStatus::InProgress,
                expert: Some(bob.clone()),
            },
            KnowledgeGraphArea {
                name: "Auth Checks".to_owned(),
                component: "payments-service".to_owned(),
                score: 0,
                status: AreaStatus::Unknown,
                expert: None,
            },
        ];

        Self {
            experts: vec![alice, bob, charlie],
            gaps,
            graph_areas,
            overall_score: INITIAL_OVERALL_SCORE,
        }
    }

    pub fn experts(&self) -> &[Expert] {
        &self.experts
    }

    pub fn gaps(&self) -> &[KnowledgeGap] {
        &self.gaps
    }

    pub fn graph_areas(&self) -> &[KnowledgeGraphArea] {
        &self.graph_areas
    }

    pub fn expert(&self, expert_id: &str) -> Option<&Expert> {
        self.experts.iter().find(|expert| expert.id.0 == expert_id)
    }

    pub fn gap(&self, gap_id: &str) -> Option<&KnowledgeGap> {
        self.gaps.iter().find(|gap| gap.id.as_str() == gap_id)
    }

    /// First gap whose action is handled by `action`, used by the header shortcuts.
    pub fn first_gap_for(&self, action: GapAction) -> Option<&KnowledgeGap> {
        self.gaps.iter().find(|gap| gap.action == action)
    }

    pub fn daily_digest(&self, date: impl Into<String>) -> DailyDigest {
        DailyDigest {
            date: date.into(),
            gaps: self.gaps.clone(),
            overall_score: self.overall_score,
            graph_areas: self.graph_areas.clone(),
        }
    }

    pub fn todays_digest(&self) -> DailyDigest {
        self.daily_digest(Utc::now().format("%Y-%m-%d").to_string())
    }

    /// Checks the cross-record invariants the screens rely on.
    pub fn validate(&self) -> Result<(), DomainError> {
        for gap in &self.gaps {
            if gap.confidence > 100 {
                return Err(DomainError::InvariantViolation(format!(
                    "gap `{}` has confidence {} outside 0..=100",
                    gap.id, gap.confidence
                )));
            }

            let recommended = gap.patterns.iter().filter(|pattern| pattern.is_recommended).count();
            if recommended != 1 {
                return Err(DomainError::InvariantViolation(format!(
                    "gap `{}` must recommend exactly one pattern, found {recommended}",
                    gap.id
                )));
            }

            for person in [&gap.expert, &gap.nominated_by] {
                if self.expert(&person.id.0).is_none() {
                    return Err(DomainError::InvariantViolation(format!(
                        "gap `{}` references unknown expert `{}`",
                        gap.id, person.id
                    )));
                }
            }
        }

        if self.gaps.iter().enumerate().any(|(index, gap)| {
            self.gaps[..index].iter().any(|earlier| earlier.id == gap.id)
        }) {
            return Err(DomainError::InvariantViolation("gap ids must be unique".to_owned()));
        }

        Ok(())
    }
}

impl Default for DemoDataset {
    fn default() -> Self {
        Self::builtin()
    }
}

fn expert(id: &str, name: &str, handle: &str, specialties: &[&str]) -> Expert {
    Expert {
        id: ExpertId(id.to_owned()),
        name: name.to_owned(),
        avatar: PLACEHOLDER_AVATAR.to_owned(),
        slack_handle: handle.to_owned(),
        specialties: specialties.iter().map(|specialty| (*specialty).to_owned()).collect(),
    }
}

fn pattern(id: &str, label: &str, description: &str, is_recommended: bool) -> Pattern {
    Pattern {
        id: id.to_owned(),
        label: label.to_owned(),
        description: description.to_owned(),
        is_recommended,
        repo_link: None,
        commit: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{DemoDataset, INITIAL_OVERALL_SCORE};
    use crate::domain::gap::GapAction;
    use crate::errors::DomainError;

    #[test]
    fn literal_gaps_match_the_scripted_scenarios() {
        let dataset = DemoDataset::builtin();

        let retry = dataset.gap("retry-logic-stripe").expect("retry gap");
        assert_eq!(retry.action, GapAction::AutoPr);
        assert_eq!(retry.confidence, 96);
        assert_eq!(retry.expert.slack_handle, "@alice");
        assert_eq!(retry.nominated_by.slack_handle, "@charlie");

        let flags = dataset.gap("feature-flag-invoice").expect("feature flag gap");
        assert_eq!(flags.action, GapAction::AskExpert);
        assert_eq!(flags.confidence, 83);
        assert_eq!(flags.expert.slack_handle, "@bob");
    }

    #[test]
    fn every_gap_has_exactly_one_recommended_pattern() {
        for gap in DemoDataset::builtin().gaps() {
            let recommended = gap.patterns.iter().filter(|pattern| pattern.is_recommended).count();
            assert_eq!(recommended, 1, "gap {} should recommend one pattern", gap.id);
        }
    }

    #[test]
    fn unknown_lookups_return_none() {
        let dataset = DemoDataset::builtin();
        assert!(dataset.gap("does-not-exist").is_none());
        assert!(dataset.expert("mallory").is_none());
    }

    #[test]
    fn digest_carries_initial_score_and_all_gaps() {
        let dataset = DemoDataset::builtin();
        let digest = dataset.daily_digest("2026-10-19");

        assert_eq!(digest.overall_score, INITIAL_OVERALL_SCORE);
        assert_eq!(digest.gaps.len(), 2);
        assert_eq!(digest.graph_areas.len(), 3);
        assert_eq!(digest.date, "2026-10-19");
    }

    #[test]
    fn todays_digest_uses_iso_date() {
        let digest = DemoDataset::builtin().todays_digest();
        assert_eq!(digest.date.len(), 10);
        assert_eq!(digest.date.matches('-').count(), 2);
    }

    #[test]
    fn header_shortcuts_find_first_gap_per_action() {
        let dataset = DemoDataset::builtin();
        assert_eq!(
            dataset.first_gap_for(GapAction::AutoPr).map(|gap| gap.id.as_str()),
            Some("retry-logic-stripe")
        );
        assert_eq!(
            dataset.first_gap_for(GapAction::AskExpert).map(|gap| gap.id.as_str()),
            Some("feature-flag-invoice")
        );
    }

    #[test]
    fn builtin_dataset_passes_validation() {
        assert_eq!(DemoDataset::builtin().validate(), Ok(()));
    }

    #[test]
    fn validation_flags_missing_recommendation() {
        let mut dataset = DemoDataset::builtin();
        for pattern in &mut dataset.gaps[0].patterns {
            pattern.is_recommended = false;
        }

        assert!(matches!(
            dataset.validate(),
            Err(DomainError::InvariantViolation(message)) if message.contains("retry-logic-stripe")
        ));
    }
}
