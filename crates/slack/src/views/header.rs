use athena_core::{DemoDataset, DemoState, GapAction, KnowledgeGap, Scenario};

use crate::actions::{scenario_value, RESET, SET_SCENARIO, TOGGLE_HELP};
use crate::blocks::{ButtonElement, ButtonStyle, MessageBuilder, MessageTemplate};

/// Page header with one shortcut per scenario. Thread shortcuts preselect the first
/// gap whose action the scenario handles.
pub fn navigation(state: &DemoState, dataset: &DemoDataset) -> MessageTemplate {
    let shortcuts = [
        (Scenario::Digest, None, "Daily Digest"),
        (Scenario::AutoPr, dataset.first_gap_for(GapAction::AutoPr), "Auto-PR Flow →"),
        (Scenario::Qna, dataset.first_gap_for(GapAction::AskExpert), "Expert Q&A Flow →"),
    ];
    let tour_label = if state.help { "Hide Tour" } else { "Show Tour" };

    MessageBuilder::new("Resolve.ai – Athena Slackbot")
        .header("athena.nav.title.v1", "Resolve.ai – Athena Slackbot")
        .context("athena.nav.subtitle.v1", |context| {
            context.plain("Expert Feedback Flow Demo");
        })
        .actions("athena.nav.scenarios.v1", |actions| {
            for (scenario, gap, label) in shortcuts {
                let value =
                    scenario_value(scenario.as_str(), gap.map(|gap| gap.id.as_str()));
                let mut button = ButtonElement::new(SET_SCENARIO, label).value(value);
                if scenario == state.scenario {
                    button = button.style(ButtonStyle::Primary);
                }
                actions.button(button);
            }
        })
        .actions("athena.nav.controls.v1", |actions| {
            actions
                .button(ButtonElement::new(TOGGLE_HELP, tour_label))
                .button(ButtonElement::new(RESET, "Reset Demo").style(ButtonStyle::Danger));
        })
        .build()
}

pub fn scenario_badge(scenario: Scenario, gap: Option<&KnowledgeGap>) -> MessageTemplate {
    MessageBuilder::new(format!("Current Scenario: {}", scenario.label()))
        .context("athena.nav.badge.v1", |context| {
            context.mrkdwn(format!("*Current Scenario:* {}", scenario.label()));
            if let Some(gap) = gap {
                context.mrkdwn(format!("*Gap:* {}", gap.title));
            }
        })
        .build()
}

/// Guided-tour text for the scenario on screen.
pub fn tour_overlay(scenario: Scenario) -> MessageTemplate {
    let (title, steps): (&str, &[&str]) = match scenario {
        Scenario::Digest => (
            "Daily Digest",
            &[
                "Athena posts the highest-impact knowledge gaps every morning.",
                "Each gap shows Athena's confidence, the proposed action and the tagged expert.",
                "Click *View Thread* on a gap to follow it into its Slack thread.",
            ],
        ),
        Scenario::AutoPr => (
            "Auto-PR Flow",
            &[
                "With high confidence Athena prepares a refactor instead of asking.",
                "Open the PR preview in the thread to review the proposed diff.",
                "*Approve* to let Athena open the PR. The digest score rises afterwards.",
            ],
        ),
        Scenario::Qna => (
            "Expert Q&A Flow",
            &[
                "With lower confidence Athena asks the tagged expert instead.",
                "Expand *Options in 🧵* and pick the pattern the expert would choose.",
                "The answer updates the knowledge graph and the team documentation.",
            ],
        ),
    };

    let mut builder = MessageBuilder::new(format!("Tour: {title}"))
        .header("athena.tour.header.v1", format!("Tour: {title}"));
    for (index, step) in steps.iter().enumerate() {
        builder = builder.section(format!("athena.tour.step.{}.v1", index + 1), |section| {
            section.mrkdwn(format!("{}. {step}", index + 1));
        });
    }
    builder
        .actions("athena.tour.actions.v1", |actions| {
            actions.button(ButtonElement::new(TOGGLE_HELP, "Hide Tour"));
        })
        .build()
}
