use serde::{Deserialize, Serialize};

use crate::domain::expert::Expert;
use crate::domain::gap::{GapId, GapStatus, KnowledgeGap};

/// Score points credited to the graph when a gap is resolved.
pub const RESOLUTION_SCORE_BONUS: u8 = 3;

pub const MAX_SCORE: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AreaStatus {
    Verified,
    Unknown,
    InProgress,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGraphArea {
    pub name: String,
    pub component: String,
    pub score: u8,
    pub status: AreaStatus,
    pub expert: Option<Expert>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDigest {
    pub date: String,
    pub gaps: Vec<KnowledgeGap>,
    pub overall_score: u8,
    pub graph_areas: Vec<KnowledgeGraphArea>,
}

impl DailyDigest {
    pub fn gap(&self, gap_id: &str) -> Option<&KnowledgeGap> {
        self.gaps.iter().find(|gap| gap.id.as_str() == gap_id)
    }

    pub fn approved_count(&self) -> usize {
        self.gaps.iter().filter(|gap| gap.is_approved()).count()
    }
}

/// Digest as it looks after the given gaps were resolved.
///
/// Only the first resolved id is taken into account: the score is bumped once and only
/// that gap is flipped to approved, no matter how many gaps were resolved in the session.
/// `base` is never modified.
pub fn derive_digest(base: &DailyDigest, resolved: &[GapId]) -> DailyDigest {
    let Some(first) = resolved.first() else {
        return base.clone();
    };

    DailyDigest {
        date: base.date.clone(),
        gaps: base
            .gaps
            .iter()
            .map(|gap| if &gap.id == first { gap.with_status(GapStatus::Approved) } else { gap.clone() })
            .collect(),
        overall_score: base.overall_score.saturating_add(RESOLUTION_SCORE_BONUS).min(MAX_SCORE),
        graph_areas: base.graph_areas.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{derive_digest, RESOLUTION_SCORE_BONUS};
    use crate::dataset::DemoDataset;
    use crate::domain::gap::{GapId, GapStatus};

    fn base() -> super::DailyDigest {
        DemoDataset::builtin().daily_digest("2026-10-19")
    }

    #[test]
    fn no_resolved_gaps_returns_identical_digest() {
        let base = base();
        assert_eq!(derive_digest(&base, &[]), base);
    }

    #[test]
    fn approval_bumps_score_from_74_to_77() {
        let base = base();
        assert_eq!(base.overall_score, 74);

        let derived = derive_digest(&base, &[GapId::from("retry-logic-stripe")]);

        assert_eq!(derived.overall_score, 77);
        assert_eq!(derived.gap("retry-logic-stripe").and_then(|gap| gap.status), Some(GapStatus::Approved));
        assert_eq!(derived.gap("feature-flag-invoice").and_then(|gap| gap.status), None);
    }

    #[test]
    fn base_digest_is_left_untouched() {
        let base = base();
        let snapshot = base.clone();

        let _ = derive_digest(&base, &[GapId::from("feature-flag-invoice")]);

        assert_eq!(base, snapshot);
        assert_eq!(base.approved_count(), 0);
    }

    #[test]
    fn only_first_resolved_gap_is_used() {
        let base = base();
        let derived = derive_digest(
            &base,
            &[GapId::from("feature-flag-invoice"), GapId::from("retry-logic-stripe")],
        );

        assert_eq!(derived.overall_score, base.overall_score + RESOLUTION_SCORE_BONUS);
        assert_eq!(derived.approved_count(), 1);
        assert!(derived.gap("feature-flag-invoice").is_some_and(|gap| gap.is_approved()));
        assert!(derived.gap("retry-logic-stripe").is_some_and(|gap| !gap.is_approved()));
    }

    #[test]
    fn score_is_capped_at_one_hundred() {
        let mut base = base();
        base.overall_score = 99;

        let derived = derive_digest(&base, &[GapId::from("retry-logic-stripe")]);

        assert_eq!(derived.overall_score, 100);
    }
}
