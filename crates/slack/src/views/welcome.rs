use athena_core::{DemoDataset, DemoParams, GapAction, Scenario};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub title: &'static str,
    pub detail: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub icon: &'static str,
    pub title: &'static str,
    pub detail: &'static str,
    pub href: String,
}

/// Landing page content. Every feature links straight into its scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WelcomePage {
    pub title: &'static str,
    pub tagline: &'static str,
    pub problems: Vec<Problem>,
    pub features: Vec<Feature>,
    pub call_to_action: &'static str,
    pub call_to_action_detail: &'static str,
    pub start_href: String,
    pub footer: [&'static str; 2],
}

pub fn welcome_page(dataset: &DemoDataset) -> WelcomePage {
    let link = |scenario: Scenario, action: Option<GapAction>| {
        let gap = action.and_then(|action| dataset.first_gap_for(action)).map(|gap| gap.id.clone());
        DemoParams::new(scenario, gap, false).demo_href()
    };

    WelcomePage {
        title: "Athena Slackbot Demo",
        tagline: "Get to the \"a-ha!\" moment faster by leveraging experts to manage the knowledge graph from Slack",
        problems: vec![
            Problem {
                title: "Time to value isn't consistently low",
                detail: "New teams sometimes struggle to see quick wins during onboarding",
            },
            Problem {
                title: "Experts can't assess slope of hill-climb to quality",
                detail: "Experts need a visual depiction of where to plug gaps in Resolve's understanding of the code base",
            },
        ],
        features: vec![
            Feature {
                icon: "📊",
                title: "Daily Digest",
                detail: "Increase expertise coverage by engaging proactively with experts daily",
                href: link(Scenario::Digest, None),
            },
            Feature {
                icon: "🔁",
                title: "Auto-PR Scenarios",
                detail: "Submit PRs on low-risk tech debt from Day 1!",
                href: link(Scenario::AutoPr, Some(GapAction::AutoPr)),
            },
            Feature {
                icon: "💬",
                title: "Expert Q&A",
                detail: "Slack-native interface for multiple discussions per day",
                href: link(Scenario::Qna, Some(GapAction::AskExpert)),
            },
        ],
        call_to_action: "Ready to Explore?",
        call_to_action_detail: "Start with the Daily Digest to see Athena's knowledge gap analysis",
        start_href: link(Scenario::Digest, None),
        footer: [
            "This is a demonstration of AI-powered engineering workflows.",
            "All data shown is simulated for demo purposes.",
        ],
    }
}
