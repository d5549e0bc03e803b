use athena_core::{DailyDigest, KnowledgeGap, ProgressBar, ViewProgress};

use crate::actions::{HELP_IMPROVE, NOMINATE_EXPERT, VIEW_COVERAGE, VIEW_THREAD};
use crate::blocks::{ButtonElement, MessageBuilder, MessageTemplate};
use crate::thread::{MessageAuthor, SlackThread, ThreadMessage};

const POSTED_AT: &str = "9:00 AM";

/// Greeting, one message per gap, then the graph score; revealed in that order.
pub fn digest_thread(digest: &DailyDigest, progress: &ViewProgress) -> SlackThread {
    let messages = std::iter::once(greeting(digest))
        .chain(digest.gaps.iter().enumerate().map(|(index, gap)| gap_entry(index + 1, gap)))
        .chain(std::iter::once(graph_score(digest)));

    let mut thread = SlackThread::new();
    for (index, message) in messages.enumerate() {
        if progress.shows(index) {
            thread.push(ThreadMessage::top_level(MessageAuthor::athena(), POSTED_AT, message));
        }
    }
    thread
}

fn greeting(digest: &DailyDigest) -> MessageTemplate {
    let count = digest.gaps.len();
    MessageBuilder::new(format!("Athena daily digest for {}", digest.date))
        .section("athena.digest.greeting.v1", |section| {
            section.plain("👋 Good morning, here's your daily update from Athena.");
        })
        .section("athena.digest.summary.v1", |section| {
            section.mrkdwn(format!(
                "🧠 We found *{count} high-impact knowledge gaps* to resolve today:"
            ));
        })
        .context("athena.digest.date.v1", |context| {
            context.plain(digest.date.clone());
        })
        .build()
}

fn gap_entry(position: usize, gap: &KnowledgeGap) -> MessageTemplate {
    let approved = if gap.is_approved() { " ✅" } else { "" };
    MessageBuilder::new(format!("Knowledge gap {position}: {}", gap.title))
        .section(format!("athena.digest.gap.{}.title.v1", gap.id), |section| {
            section.mrkdwn(format!("{} *{}*{approved}", keycap(position), gap.title));
        })
        .section(format!("athena.digest.gap.{}.details.v1", gap.id), |section| {
            section.mrkdwn(format!(
                "• Confidence: *{}%*\n• Action: {}\n• Tagged Expert: {} (nominated by {})",
                gap.confidence,
                gap.action.label(),
                gap.expert.slack_handle,
                gap.nominated_by.slack_handle
            ));
        })
        .actions(format!("athena.digest.gap.{}.actions.v1", gap.id), |actions| {
            actions.button(ButtonElement::new(VIEW_THREAD, "→ View Thread").value(gap.id.as_str()));
        })
        .build()
}

fn graph_score(digest: &DailyDigest) -> MessageTemplate {
    let bar = ProgressBar::new(u32::from(digest.overall_score));
    let approved = digest.approved_count();

    MessageBuilder::new(format!("Current graph score: {}%", digest.overall_score))
        .section("athena.digest.score.v1", |section| {
            section.mrkdwn(format!("📈 *Current Graph Score: {}%*\n`{bar}`", digest.overall_score));
        })
        .when(approved > 0, |builder| {
            builder.context("athena.digest.resolved.v1", |context| {
                context.plain(format!("✅ {approved} resolved today"));
            })
        })
        .actions("athena.digest.footer.v1", |actions| {
            actions
                .button(ButtonElement::new(VIEW_COVERAGE, "→ View Coverage"))
                .button(ButtonElement::new(NOMINATE_EXPERT, "Nominate Expert"))
                .button(ButtonElement::new(HELP_IMPROVE, "Help Improve"));
        })
        .build()
}

/// `1️⃣` through `9️⃣`; larger positions fall back to `10.`.
fn keycap(position: usize) -> String {
    if (1..=9).contains(&position) {
        format!("{position}\u{fe0f}\u{20e3}")
    } else {
        format!("{position}.")
    }
}
