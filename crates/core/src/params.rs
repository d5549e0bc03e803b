//! Two-way mapping between demo state and the shareable query string.
//!
//! Parsing never fails: unknown scenarios, empty gap ids and any `help` value other
//! than `"true"` fall back to the defaults.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::domain::gap::GapId;
use crate::flows::states::Scenario;

pub const SCENARIO_PARAM: &str = "scenario";
pub const GAP_PARAM: &str = "gap";
pub const HELP_PARAM: &str = "help";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoParams {
    pub scenario: Option<Scenario>,
    pub gap: Option<GapId>,
    pub help: bool,
}

impl DemoParams {
    pub fn new(scenario: Scenario, gap: Option<GapId>, help: bool) -> Self {
        Self { scenario: Some(scenario), gap, help }
    }

    /// Parses a raw query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()))
    }

    /// The first occurrence of each key wins, matching `URLSearchParams.get`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut scenario = None;
        let mut gap = None;
        let mut help = None;

        for (key, value) in pairs {
            match key.as_ref() {
                SCENARIO_PARAM if scenario.is_none() => scenario = Some(value.as_ref().to_owned()),
                GAP_PARAM if gap.is_none() => gap = Some(value.as_ref().to_owned()),
                HELP_PARAM if help.is_none() => help = Some(value.as_ref().to_owned()),
                _ => {}
            }
        }

        Self::from_raw(scenario.as_deref(), gap.as_deref(), help.as_deref())
    }

    pub fn from_raw(scenario: Option<&str>, gap: Option<&str>, help: Option<&str>) -> Self {
        Self {
            scenario: scenario.and_then(|value| value.parse().ok()),
            gap: gap.filter(|value| !value.is_empty()).map(GapId::from),
            help: help == Some("true"),
        }
    }

    pub fn scenario_or_default(&self) -> Scenario {
        self.scenario.unwrap_or_default()
    }

    /// Canonical query string without the leading `?`. Defaults are omitted.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if let Some(scenario) = self.scenario {
            serializer.append_pair(SCENARIO_PARAM, scenario.as_str());
        }
        if let Some(gap) = &self.gap {
            serializer.append_pair(GAP_PARAM, gap.as_str());
        }
        if self.help {
            serializer.append_pair(HELP_PARAM, "true");
        }
        serializer.finish()
    }

    /// Path plus query for links into the demo page.
    pub fn demo_href(&self) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            "/demo".to_owned()
        } else {
            format!("/demo?{query}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DemoParams;
    use crate::domain::gap::GapId;
    use crate::flows::states::Scenario;

    #[test]
    fn parses_all_three_parameters() {
        let params = DemoParams::parse("?scenario=auto-pr&gap=retry-logic-stripe&help=true");

        assert_eq!(params.scenario, Some(Scenario::AutoPr));
        assert_eq!(params.gap, Some(GapId::from("retry-logic-stripe")));
        assert!(params.help);
    }

    #[test]
    fn unknown_or_missing_values_fall_back_to_defaults() {
        let params = DemoParams::parse("scenario=settings&gap=&help=yes");

        assert_eq!(params.scenario, None);
        assert_eq!(params.scenario_or_default(), Scenario::Digest);
        assert_eq!(params.gap, None);
        assert!(!params.help);

        assert_eq!(DemoParams::parse(""), DemoParams::default());
    }

    #[test]
    fn serializes_in_canonical_order_and_omits_defaults() {
        let params = DemoParams::new(Scenario::Qna, Some(GapId::from("feature-flag-invoice")), false);
        assert_eq!(params.to_query_string(), "scenario=qna&gap=feature-flag-invoice");

        let with_help = DemoParams::new(Scenario::Digest, None, true);
        assert_eq!(with_help.to_query_string(), "scenario=digest&help=true");
    }

    #[test]
    fn state_survives_a_trip_through_the_url() {
        let params = DemoParams::new(Scenario::AutoPr, Some(GapId::from("a b&c")), true);

        let reparsed = DemoParams::parse(&params.to_query_string());

        assert_eq!(reparsed, params);
    }

    #[test]
    fn demo_href_points_at_demo_page() {
        assert_eq!(DemoParams::default().demo_href(), "/demo");
        assert_eq!(
            DemoParams::new(Scenario::Digest, None, false).demo_href(),
            "/demo?scenario=digest"
        );
    }

    #[test]
    fn first_occurrence_of_a_key_wins() {
        let params = DemoParams::parse("scenario=qna&scenario=digest&gap=one&gap=two");
        assert_eq!(params.scenario, Some(Scenario::Qna));
        assert_eq!(params.gap, Some(GapId::from("one")));
    }

    #[test]
    fn ignores_unrelated_parameters() {
        let params = DemoParams::parse("utm_source=slack&scenario=qna");
        assert_eq!(params.scenario, Some(Scenario::Qna));
    }
}
