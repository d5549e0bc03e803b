use athena_core::{KnowledgeGap, Pattern, ViewProgress};

use crate::actions::{APPROVE_PR, OPEN_IN_GITHUB, REJECT_PR, VIEW_PROPOSED_PR};
use crate::blocks::{code_block, ButtonElement, ButtonStyle, MessageBuilder, MessageTemplate};
use crate::thread::{MessageAuthor, SlackThread, ThreadMessage};

const POSTED_AT: &str = "9:15 AM";
const PREVIEW_AT: &str = "9:16 AM";

const SAFE_RETRY_CALL: [&str; 5] = [
    "+ await resolveSafeRetry(() => stripe.charges.create(params), {",
    "+   maxRetries: 3,",
    "+   exponentialBackoff: true,",
    "+   onError: (err) => logger.error('stripe_charge_failed', err)",
    "+ });",
];

pub fn auto_pr_thread(gap: &KnowledgeGap, resolved: bool, progress: &ViewProgress) -> SlackThread {
    let mut thread = SlackThread::new();
    if progress.shows(0) {
        thread.push(ThreadMessage::top_level(MessageAuthor::athena(), POSTED_AT, proposal(gap, resolved)));
    }
    if progress.shows(1) {
        thread.push(ThreadMessage::reply(MessageAuthor::athena(), PREVIEW_AT, pr_preview(gap)));
    }
    thread
}

fn proposal(gap: &KnowledgeGap, resolved: bool) -> MessageTemplate {
    let incident = gap.incident.as_deref().unwrap_or("history");
    let patterns = gap
        .patterns
        .iter()
        .map(|pattern| {
            let marker = if pattern.is_recommended { " ✅" } else { "" };
            format!("{} {}{marker}", pattern.label, pattern.description)
        })
        .collect::<Vec<_>>()
        .join("\n");
    let outdated = gap.outdated_patterns().map(|pattern| pattern.label.as_str()).collect::<Vec<_>>();
    let recommended = gap.recommended_pattern().map(|pattern| pattern.label.as_str()).unwrap_or("?");

    MessageBuilder::new(format!("Auto-PR proposal for {}", gap.title))
        .section("athena.auto_pr.match.v1", |section| {
            section.mrkdwn(format!(
                "🔁 Athena: High-confidence knowledge match found in {} for `{}`",
                subject(gap),
                gap.component
            ));
        })
        .section("athena.auto_pr.basis.v1", |section| {
            section.mrkdwn(format!("📄 Auto-PR prepared based on prior patterns + incident {incident}"));
        })
        .section("athena.auto_pr.confidence.v1", |section| {
            section.mrkdwn(format!(
                "🎯 Confidence: {}% → Proceeding with proposed refactor  `High Confidence`",
                gap.confidence
            ));
        })
        .section("athena.auto_pr.expert.v1", |section| {
            section.mrkdwn(format!(
                "👩‍💻 Expert: {} (nominated by {})",
                gap.expert.slack_handle, gap.nominated_by.slack_handle
            ));
        })
        .section("athena.auto_pr.patterns.v1", |section| {
            section.mrkdwn(format!("📍 Summary of existing patterns:\n{patterns}"));
        })
        .section("athena.auto_pr.proposed.v1", |section| {
            section.mrkdwn(format!(
                "✅ Proposed: Refactor {} to match {recommended}",
                outdated.join(" and ")
            ));
        })
        .when(resolved, |builder| {
            builder.context("athena.auto_pr.approved.v1", |context| {
                context.plain("✅ Approved. Athena is opening the PR.");
            })
        })
        .when(!resolved, |builder| {
            builder.actions("athena.auto_pr.decision.v1", |actions| {
                actions
                    .button(
                        ButtonElement::new(VIEW_PROPOSED_PR, "View Proposed PR")
                            .value(gap.id.as_str()),
                    )
                    .button(
                        ButtonElement::new(APPROVE_PR, "Approve")
                            .style(ButtonStyle::Primary)
                            .value(gap.id.as_str()),
                    )
                    .button(
                        ButtonElement::new(REJECT_PR, "Reject")
                            .style(ButtonStyle::Danger)
                            .value(gap.id.as_str()),
                    );
            })
        })
        .build()
}

fn pr_preview(gap: &KnowledgeGap) -> MessageTemplate {
    let incident = gap.incident.as_deref().unwrap_or("n/a");
    let commit = code_block([
        "Standardize retry logic with exponential backoff and logging".to_owned(),
        String::new(),
        "- Refactor to use resolveSafeRetry() pattern".to_owned(),
        "- Add proper error logging and incident tracking".to_owned(),
        format!("- Reference: incident {incident}"),
        format!("- Expert: {}", gap.expert.slack_handle),
    ]);

    let mut builder = MessageBuilder::new(format!("PR preview for {}", gap.title))
        .header("athena.auto_pr.preview.header.v1", "GitHub PR Preview")
        .section("athena.auto_pr.preview.title.v1", |section| {
            section.mrkdwn(format!("*[resolve-ai] Standardize {}*", gap.title.replace('`', "")));
        });

    for pattern in &gap.patterns {
        builder = builder.section(format!("athena.auto_pr.preview.{}.v1", pattern.id), |section| {
            section.mrkdwn(pattern_change(pattern));
        });
    }

    builder
        .divider("athena.auto_pr.preview.divider.v1")
        .section("athena.auto_pr.preview.commit.v1", |section| {
            section.mrkdwn(format!("*Commit message*\n{commit}"));
        })
        .context("athena.auto_pr.preview.reviewer.v1", |context| {
            context.plain(format!("Reviewer: {}", gap.expert.slack_handle));
        })
        .actions("athena.auto_pr.preview.actions.v1", |actions| {
            actions.button(ButtonElement::new(OPEN_IN_GITHUB, "Open in GitHub").value(gap.id.as_str()));
        })
        .build()
}

fn pattern_change(pattern: &Pattern) -> String {
    let role = if pattern.is_recommended { "Target" } else { "To be updated" };
    let heading = format!("{} *{}* · _{role}_", pattern.label, pattern.description);
    match proposed_diff(pattern) {
        Some(diff) => format!("{heading}\n{}", code_block(diff)),
        None => format!("{heading}\n✅ Already implements the recommended pattern"),
    }
}

/// Scripted diff for a pattern of the retry gap. Recommended and unknown patterns have
/// nothing to change.
pub fn proposed_diff(pattern: &Pattern) -> Option<Vec<&'static str>> {
    if pattern.is_recommended {
        return None;
    }
    let removed: &[&'static str] = match pattern.id.as_str() {
        "no-retry" => &["- await stripe.charges.create(params);"],
        "manual-retry" => &[
            "- for (let i = 0; i < 3; i++) {",
            "-   try {",
            "-     return await stripe.charges.create(params);",
            "-   } catch (e) {",
            "-     await sleep(1000);",
            "-   }",
            "- }",
        ],
        _ => return None,
    };
    Some(removed.iter().copied().chain(SAFE_RETRY_CALL).collect())
}

/// Lower-cased title without the code span, e.g. "retry logic".
fn subject(gap: &KnowledgeGap) -> String {
    let prefix = gap.title.split(" in ").next().unwrap_or(&gap.title);
    prefix.trim().to_lowercase()
}
