//! Expert Q&A thread.
//!
//! The incident summary is revealed on the screen timer. Everything after it follows the
//! pattern-selection stage: options appear when the disclosure is expanded, the expert
//! reply once the pick is acknowledged, then the graph update and documentation card.

use athena_core::{
    AreaStatus, DailyDigest, KnowledgeGap, KnowledgeGraphArea, Pattern, ProgressBar,
    SelectionStage, ViewProgress,
};

use crate::actions::{
    ANSWER_NEXT_QUESTION, NOMINATE_EXPERT, SELECT_PATTERN, TOGGLE_OPTIONS, VIEW_DOCUMENTATION,
    VIEW_README,
};
use crate::blocks::{code_block, ButtonElement, ButtonStyle, MessageBuilder, MessageTemplate};
use crate::thread::{MessageAuthor, SlackThread, ThreadMessage};

const INCIDENT_AT: &str = "9:15 AM";
const OPTIONS_AT: &str = "9:20 AM";
const REPLY_AT: &str = "9:35 AM";
const UPDATE_AT: &str = "9:36 AM";

/// Confidence scale used by the graph-update line, before and after an expert answer.
const CONFIDENCE_BEFORE: &str = "0.7";
const CONFIDENCE_AFTER: &str = "1.0";

pub fn qna_thread(gap: &KnowledgeGap, digest: &DailyDigest, progress: &ViewProgress) -> SlackThread {
    let mut thread = SlackThread::new();
    if !progress.shows(0) {
        return thread;
    }

    let qna = progress.qna.clone().unwrap_or_default();
    thread.push(ThreadMessage::top_level(
        MessageAuthor::athena(),
        INCIDENT_AT,
        incident_summary(gap, qna.options_expanded),
    ));

    if qna.options_expanded {
        thread.push(ThreadMessage::reply(
            MessageAuthor::athena(),
            OPTIONS_AT,
            pattern_options(gap, qna.selected_pattern.as_deref()),
        ));
    }
    if qna.stage >= SelectionStage::ExpertReplied {
        thread.push(ThreadMessage::reply(
            MessageAuthor::from_expert(&gap.expert),
            REPLY_AT,
            expert_reply(gap),
        ));
    }
    if qna.stage >= SelectionStage::DocumentationUpdated {
        thread.push(ThreadMessage::reply(MessageAuthor::athena(), UPDATE_AT, graph_update(gap, digest)));
        thread.push(ThreadMessage::reply(MessageAuthor::athena(), UPDATE_AT, documentation_card(gap)));
    }
    thread
}

fn incident_summary(gap: &KnowledgeGap, options_expanded: bool) -> MessageTemplate {
    let subject = subject(gap);
    let incidents = if gap.incident_links.is_empty() {
        gap.incident.iter().map(|incident| format!("• {incident}")).collect::<Vec<_>>()
    } else {
        gap.incident_links
            .iter()
            .map(|link| format!("• <{}|{}>: {}", link.url, link.id, link.title))
            .collect()
    };
    let recommended = recommended_name(gap);
    let toggle = if options_expanded { "▼ Options in 🧵" } else { "▶ Options in 🧵" };

    MessageBuilder::new(format!("Incidents traced to {subject}"))
        .section("athena.qna.incident.headline.v1", |section| {
            section.mrkdwn(format!(
                "🚨 *High Priority:* 3 production incidents this week traced to inconsistent `{subject}` feature flag usage"
            ));
        })
        .section("athena.qna.incident.impact.v1", |section| {
            section.mrkdwn(
                "*Impact Summary:*\n• $47K in failed invoice processing\n• 2.3 hours average resolution time\n• 5 different implementation patterns found across codebase",
            );
        })
        .when(!incidents.is_empty(), |builder| {
            builder.section("athena.qna.incident.recent.v1", |section| {
                section.mrkdwn(format!("*Recent incidents:*\n{}", incidents.join("\n")));
            })
        })
        .section("athena.qna.incident.analysis.v1", |section| {
            section.mrkdwn(format!(
                "🤖 *My analysis:* We should standardize on {recommended} (enhanced with metrics + logging) to prevent future incidents and improve observability."
            ));
        })
        .actions("athena.qna.incident.actions.v1", |actions| {
            actions.button(ButtonElement::new(TOGGLE_OPTIONS, toggle).value(gap.id.as_str()));
        })
        .build()
}

fn pattern_options(gap: &KnowledgeGap, selected: Option<&str>) -> MessageTemplate {
    let handle = &gap.expert.slack_handle;
    let mut builder = MessageBuilder::new(format!("Implementation patterns for {}", gap.title))
        .section("athena.qna.options.request.v1", |section| {
            section.mrkdwn(format!(
                "📞 Requesting expert input from *{handle}*\n🔍 Found these implementation patterns in our codebase:"
            ));
        });

    for (index, pattern) in gap.patterns.iter().enumerate() {
        let name = pattern_name(index);
        let is_selected = selected == Some(pattern.id.as_str());
        builder = builder
            .actions(format!("athena.qna.options.{}.pick.v1", pattern.id), |actions| {
                let mut button =
                    ButtonElement::new(SELECT_PATTERN, format!("{} {name}", pattern.label))
                        .value(pattern.id.as_str());
                if is_selected {
                    button = button.style(ButtonStyle::Primary);
                }
                actions.button(button);
            })
            .section(format!("athena.qna.options.{}.v1", pattern.id), |section| {
                section.mrkdwn(pattern_body(&name, pattern));
            });
    }

    builder
        .section("athena.qna.options.prompt.v1", |section| {
            section.mrkdwn(format!(
                "👆 {handle}, which pattern should we standardize on? Click the emoji above each pattern to indicate your choice."
            ));
        })
        .build()
}

fn pattern_body(name: &str, pattern: &Pattern) -> String {
    let heading = format!("*{name}:* {}", pattern.description);
    match pattern_snippet(&pattern.id) {
        Some(snippet) => format!("{heading}\n{}", code_block(snippet)),
        None => heading,
    }
}

/// Code found in the codebase for each feature-flag pattern.
pub fn pattern_snippet(pattern_id: &str) -> Option<&'static [&'static str]> {
    match pattern_id {
        "no-flag-check" => Some(&["await enqueueInvoice(invoiceData);"]),
        "flag-no-logging" => Some(&[
            "if (isFeatureEnabled('async_invoice_dispatch')) {",
            "  await enqueueInvoice(invoiceData);",
            "}",
        ]),
        "flag-with-logging" => Some(&[
            "if (isFeatureEnabled('async_invoice_dispatch')) {",
            "  metrics.increment('invoice.async.enabled');",
            "  await enqueueInvoice(invoiceData);",
            "} else {",
            "  metrics.increment('invoice.async.disabled');",
            "  logger.info('Async invoice dispatch disabled', { invoiceId });",
            "}",
        ]),
        _ => None,
    }
}

fn expert_reply(gap: &KnowledgeGap) -> MessageTemplate {
    let recommended = recommended_name(gap);
    let label = gap.recommended_pattern().map(|pattern| pattern.label.as_str()).unwrap_or("✅");

    MessageBuilder::new(format!("{} answered", gap.expert.slack_handle))
        .section("athena.qna.reply.verdict.v1", |section| {
            section.mrkdwn(format!("{label} *{recommended} is the way to go.*"));
        })
        .section("athena.qna.reply.reasons.v1", |section| {
            section.mrkdwn(format!(
                "*Why {recommended}:*\n✅ Aligns with our observability rollout policy\n✅ Metrics help us track adoption rates and make data-driven decisions\n✅ Logging catches unexpected behavior during rollouts\n✅ We can detect feature flag performance impact"
            ));
        })
        .section("athena.qna.reply.remark.v1", |section| {
            section.mrkdwn(format!(
                "The metrics are crucial - we've had 3 feature flags this quarter where we couldn't tell if low adoption was due to bugs or user behavior. With {recommended}, we'll have the data to make the right call."
            ));
        })
        .build()
}

fn graph_update(gap: &KnowledgeGap, digest: &DailyDigest) -> MessageTemplate {
    let handle = &gap.expert.slack_handle;
    let area_score = digest
        .graph_areas
        .iter()
        .find(|area| area.component == gap.component)
        .map(|area| area.score)
        .unwrap_or(gap.confidence);
    let bar = ProgressBar::new(u32::from(area_score));
    let graph_view = digest
        .graph_areas
        .iter()
        .map(|area| graph_view_line(area, gap))
        .collect::<Vec<_>>()
        .join("\n");

    MessageBuilder::new(format!("Knowledge graph updated for {}", gap.component))
        .section("athena.qna.update.thanks.v1", |section| {
            section.mrkdwn(format!(
                "✅ Thanks {handle}!\n📚 I've updated the internal documentation with the validated pattern and added test guidance."
            ));
        })
        .section("athena.qna.update.graph.v1", |section| {
            section.mrkdwn(format!(
                "🧠 *Knowledge Graph Updated*\n→ `{}` in `{}`: {CONFIDENCE_BEFORE} → {CONFIDENCE_AFTER}\n📈 Score: {}% → {area_score}%\n`{bar}`",
                subject(gap),
                gap.component,
                gap.confidence
            ));
        })
        .section("athena.qna.update.view.v1", |section| {
            section.mrkdwn(format!("*Current Graph View:*\n{graph_view}"));
        })
        .actions("athena.qna.update.actions.v1", |actions| {
            actions
                .button(
                    ButtonElement::new(ANSWER_NEXT_QUESTION, "Want to help? Answer Next Question")
                        .style(ButtonStyle::Primary),
                )
                .button(ButtonElement::new(NOMINATE_EXPERT, "Nominate Expert"));
        })
        .build()
}

fn graph_view_line(area: &KnowledgeGraphArea, gap: &KnowledgeGap) -> String {
    let status = if area.component == gap.component {
        format!("✅ Verified by {}", gap.expert.slack_handle)
    } else {
        match (area.status, &area.expert) {
            (AreaStatus::Verified, Some(expert)) => format!("✅ Verified by {}", expert.slack_handle),
            (AreaStatus::Verified, None) => "✅ Verified".to_owned(),
            (AreaStatus::InProgress, _) => "⏳ In progress".to_owned(),
            (AreaStatus::Unknown, _) => "❓ Unknown".to_owned(),
        }
    };
    format!("→ {} ({}): {status}", area.name, area.component)
}

struct Documentation {
    path: String,
    section: String,
    lines: Vec<String>,
}

fn documentation_for(gap: &KnowledgeGap) -> Documentation {
    if gap.id.as_str() == "feature-flag-invoice" {
        return Documentation {
            path: "/docs/feature-flags.md".to_owned(),
            section: "Async Invoice Dispatch".to_owned(),
            lines: [
                "## Async Invoice Dispatch (Feature Flag)",
                "✅ Always check `isFeatureEnabled('async_invoice_dispatch')` before enqueue",
                "✅ Log when flag is disabled for observability",
                "❌ Do not call dispatch logic unguarded",
                "❌ Avoid dynamically constructing flag names",
            ]
            .iter()
            .map(|line| (*line).to_owned())
            .collect(),
        };
    }

    let title = gap.title.replace('`', "");
    let mut lines = vec![format!("## {title}")];
    lines.extend(gap.recommended_pattern().map(|pattern| format!("✅ {}", pattern.description)));
    lines.extend(gap.outdated_patterns().map(|pattern| format!("❌ {}", pattern.description)));
    Documentation { path: format!("/docs/{}.md", gap.component), section: title, lines }
}

fn documentation_card(gap: &KnowledgeGap) -> MessageTemplate {
    let documentation = documentation_for(gap);

    MessageBuilder::new(format!("Documentation updated: {}", documentation.path))
        .header("athena.qna.docs.header.v1", "Documentation Updated")
        .context("athena.qna.docs.location.v1", |context| {
            context
                .mrkdwn(format!("`{}`", documentation.path))
                .plain(format!("Section: {}", documentation.section));
        })
        .section("athena.qna.docs.body.v1", |section| {
            section.mrkdwn(documentation.lines.join("\n"));
        })
        .actions("athena.qna.docs.actions.v1", |actions| {
            actions
                .button(ButtonElement::new(VIEW_DOCUMENTATION, "View Documentation"))
                .button(ButtonElement::new(VIEW_README, "View README"));
        })
        .build()
}

fn pattern_name(index: usize) -> String {
    let letter = u8::try_from(index).ok().and_then(|index| b'A'.checked_add(index)).map(char::from);
    match letter {
        Some(letter) if letter.is_ascii_uppercase() => format!("Pattern {letter}"),
        _ => format!("Pattern {}", index + 1),
    }
}

fn recommended_name(gap: &KnowledgeGap) -> String {
    gap.patterns
        .iter()
        .position(|pattern| pattern.is_recommended)
        .map(pattern_name)
        .unwrap_or_else(|| "the recommended pattern".to_owned())
}

/// First code span of the title, falling back to the component.
fn subject(gap: &KnowledgeGap) -> &str {
    gap.title.split('`').nth(1).filter(|span| !span.is_empty()).unwrap_or(&gap.component)
}

#[cfg(test)]
mod tests {
    use athena_core::{
        DailyDigest, DemoDataset, KnowledgeGap, QnaProgress, SelectionStage, ViewProgress,
    };

    use super::{pattern_name, pattern_snippet, qna_thread};
    use crate::actions::{SELECT_PATTERN, TOGGLE_OPTIONS, VIEW_DOCUMENTATION};
    use crate::blocks::{Block, ButtonStyle};

    fn fixtures() -> (KnowledgeGap, DailyDigest) {
        let dataset = DemoDataset::builtin();
        let gap = dataset.gap("feature-flag-invoice").cloned().expect("flag gap");
        (gap, dataset.daily_digest("2026-10-19"))
    }

    fn progress(
        options_expanded: bool,
        selected: Option<&str>,
        stage: SelectionStage,
    ) -> ViewProgress {
        ViewProgress {
            revealed: 1,
            qna: Some(QnaProgress {
                options_expanded,
                selected_pattern: selected.map(str::to_owned),
                stage,
            }),
        }
    }

    fn finished() -> ViewProgress {
        ViewProgress { revealed: 1, qna: Some(QnaProgress::finished("flag-with-logging")) }
    }

    fn section_text(block: Option<&Block>) -> &str {
        match block {
            Some(Block::Section { text, .. }) => text.text(),
            _ => "",
        }
    }

    #[test]
    fn collapsed_thread_shows_only_the_incident_summary() {
        let (gap, digest) = fixtures();
        let collapsed = progress(false, None, SelectionStage::AwaitingSelection);
        let thread = qna_thread(&gap, &digest, &collapsed);

        assert_eq!(thread.len(), 1);
        let lead = &thread.messages[0].message;
        assert!(section_text(lead.block("athena.qna.incident.headline.v1"))
            .contains("`async_invoice_dispatch` feature flag usage"));
        assert!(section_text(lead.block("athena.qna.incident.recent.v1")).contains("#1342"));
        assert!(section_text(lead.block("athena.qna.incident.analysis.v1"))
            .contains("standardize on Pattern C"));

        let toggle = lead.buttons().next().expect("toggle");
        assert_eq!(toggle.action_id, TOGGLE_OPTIONS);
        assert_eq!(toggle.text.text(), "▶ Options in 🧵");
    }

    #[test]
    fn nothing_renders_before_the_first_reveal() {
        let (gap, digest) = fixtures();
        let hidden = ViewProgress { revealed: 0, qna: None };
        assert!(qna_thread(&gap, &digest, &hidden).is_empty());
    }

    #[test]
    fn expanded_options_offer_one_button_per_pattern() {
        let (gap, digest) = fixtures();
        let expanded = progress(true, None, SelectionStage::AwaitingSelection);
        let thread = qna_thread(&gap, &digest, &expanded);

        assert_eq!(thread.len(), 2);
        let options = &thread.messages[1];
        assert!(options.in_thread);
        let values: Vec<&str> = options
            .message
            .buttons()
            .filter(|button| button.action_id == SELECT_PATTERN)
            .filter_map(|button| button.value.as_deref())
            .collect();
        assert_eq!(values, vec!["no-flag-check", "flag-no-logging", "flag-with-logging"]);
        assert!(section_text(options.message.block("athena.qna.options.flag-with-logging.v1"))
            .contains("metrics.increment('invoice.async.enabled');"));
        assert!(section_text(options.message.block("athena.qna.options.prompt.v1"))
            .starts_with("👆 @bob, which pattern"));
    }

    #[test]
    fn stages_add_reply_then_update_and_docs() {
        let (gap, digest) = fixtures();

        let pick = |stage| progress(true, Some("flag-with-logging"), stage);

        let picked = qna_thread(&gap, &digest, &pick(SelectionStage::PatternSelected));
        assert_eq!(picked.len(), 2);
        let selected = picked.messages[1]
            .message
            .buttons()
            .find(|button| button.value.as_deref() == Some("flag-with-logging"))
            .expect("selected button");
        assert_eq!(selected.style, Some(ButtonStyle::Primary));

        let replied = qna_thread(&gap, &digest, &pick(SelectionStage::ExpertReplied));
        assert_eq!(replied.len(), 3);
        assert_eq!(replied.messages[2].author.handle, "@bob");
        assert!(section_text(replied.messages[2].message.block("athena.qna.reply.verdict.v1"))
            .contains("*Pattern C is the way to go.*"));

        let documented = qna_thread(&gap, &digest, &finished());
        assert_eq!(documented.len(), 5);
    }

    #[test]
    fn graph_update_reports_area_score_and_graph_view() {
        let (gap, digest) = fixtures();
        let thread = qna_thread(&gap, &digest, &finished());
        let update = &thread.messages[3].message;

        let graph = section_text(update.block("athena.qna.update.graph.v1"));
        assert!(graph.contains("`async_invoice_dispatch` in `billing-core`: 0.7 → 1.0"));
        assert!(graph.contains("📈 Score: 83% → 85%"));
        assert!(graph.contains("████████░░"));

        let view = section_text(update.block("athena.qna.update.view.v1"));
        assert!(view.contains("→ Retry Logic (payments-core): ✅ Verified by @alice"));
        assert!(view.contains("→ Feature Flags (billing-core): ✅ Verified by @bob"));
        assert!(view.contains("→ Auth Checks (payments-service): ❓ Unknown"));
    }

    #[test]
    fn documentation_card_points_at_the_feature_flag_guide() {
        let (gap, digest) = fixtures();
        let thread = qna_thread(&gap, &digest, &finished());
        let card = &thread.messages[4].message;

        assert!(matches!(
            card.block("athena.qna.docs.location.v1"),
            Some(Block::Context { elements, .. }) if elements[0].text() == "`/docs/feature-flags.md`"
        ));
        assert!(section_text(card.block("athena.qna.docs.body.v1"))
            .contains("❌ Do not call dispatch logic unguarded"));
        assert!(card.buttons().any(|button| button.action_id == VIEW_DOCUMENTATION));
    }

    #[test]
    fn other_gaps_get_generated_documentation() {
        let dataset = DemoDataset::builtin();
        let gap = dataset.gap("retry-logic-stripe").cloned().expect("retry gap");
        let digest = dataset.daily_digest("2026-10-19");
        let thread = qna_thread(&gap, &digest, &ViewProgress {
            revealed: 1,
            qna: Some(QnaProgress::finished("safe-retry")),
        });

        let body = section_text(thread.messages[4].message.block("athena.qna.docs.body.v1"));
        assert!(body.starts_with("## Retry Logic in stripe.chargeCustomer()"));
        assert!(body.contains("❌ No retry"));
    }

    #[test]
    fn pattern_names_are_lettered() {
        assert_eq!(pattern_name(0), "Pattern A");
        assert_eq!(pattern_name(2), "Pattern C");
        assert_eq!(pattern_name(30), "Pattern 31");
        assert!(pattern_snippet("unknown").is_none());
    }
}
