use std::sync::Arc;

use athena_core::params::DemoParams;
use athena_core::{
    DemoDataset, DemoTiming, InMemoryNotificationSink, QnaProgress, Scenario, ScenarioController,
    ViewProgress,
};
use athena_slack::{render_with_progress, RenderedDemo};

use crate::commands::CommandResult;

#[derive(Clone, Debug, Default)]
pub struct RenderArgs {
    pub scenario: Option<String>,
    pub gap: Option<String>,
    pub help_tour: bool,
    pub answered: bool,
    pub json: bool,
}

pub fn run(args: &RenderArgs) -> CommandResult {
    if let Some(raw) = args.scenario.as_deref() {
        if let Err(error) = raw.parse::<Scenario>() {
            return CommandResult::failure("render", "invalid_argument", error.to_string(), 2);
        }
    }

    let controller = ScenarioController::new(
        Arc::new(DemoDataset::builtin()),
        DemoTiming::instant(),
        Arc::new(InMemoryNotificationSink::default()),
    );
    let help = args.help_tour.then_some("true");
    controller.apply_params(&DemoParams::from_raw(
        args.scenario.as_deref(),
        args.gap.as_deref(),
        help,
    ));

    let mut progress = ViewProgress::complete();
    if args.answered && controller.scenario() == Scenario::Qna {
        progress.qna = controller.selected_gap().and_then(|gap| {
            gap.recommended_pattern().map(|pattern| QnaProgress::finished(pattern.id.clone()))
        });
    }

    let rendered = render_with_progress(&controller, progress);
    if args.json {
        return match serde_json::to_string_pretty(&rendered) {
            Ok(json) => CommandResult::output(json),
            Err(error) => CommandResult::failure("render", "serialization", error.to_string(), 1),
        };
    }

    CommandResult::output(terminal_text(&rendered))
}

pub(crate) fn terminal_text(rendered: &RenderedDemo) -> String {
    let mut sections = vec![
        rendered.navigation.to_terminal_text(),
        rendered.badge.to_terminal_text(),
    ];
    if let Some(tour) = &rendered.tour {
        sections.push(tour.to_terminal_text());
    }
    if rendered.thread.is_empty() {
        sections.push("(no thread to show for this gap)".to_owned());
    } else {
        sections.push(rendered.thread.to_terminal_text());
    }
    sections.push(format!("link: {}", rendered.demo_href));
    sections.join("\n\n")
}
