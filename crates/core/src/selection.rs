//! Pattern selection inside the expert Q&A thread.
//!
//! Once a pattern is picked the thread plays out on its own: the expert replies after
//! `expert_reply_delay`, the documentation update lands `documentation_delay` later,
//! and then the completion callback fires exactly once.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;

use crate::config::DemoTiming;
use crate::domain::gap::{GapId, KnowledgeGap};
use crate::reveal::{ensure_runtime, ScheduledTask, TimerError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    #[default]
    AwaitingSelection,
    PatternSelected,
    ExpertReplied,
    DocumentationUpdated,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("a pattern was already selected for gap `{0}`")]
    AlreadySelected(GapId),
    #[error("gap `{gap_id}` has no pattern `{pattern_id}`")]
    UnknownPattern { gap_id: GapId, pattern_id: String },
    #[error(transparent)]
    Timer(#[from] TimerError),
}

#[derive(Debug)]
pub struct PatternSelection {
    gap_id: GapId,
    pattern_ids: Vec<String>,
    timing: DemoTiming,
    options_expanded: bool,
    selected: Option<String>,
    stage: watch::Receiver<SelectionStage>,
    stage_sender: Option<watch::Sender<SelectionStage>>,
    task: Option<ScheduledTask>,
}

impl PatternSelection {
    pub fn new(gap: &KnowledgeGap, timing: DemoTiming) -> Self {
        let (stage_sender, stage) = watch::channel(SelectionStage::AwaitingSelection);
        Self {
            gap_id: gap.id.clone(),
            pattern_ids: gap.patterns.iter().map(|pattern| pattern.id.clone()).collect(),
            timing,
            options_expanded: false,
            selected: None,
            stage,
            stage_sender: Some(stage_sender),
            task: None,
        }
    }

    pub fn gap_id(&self) -> &GapId {
        &self.gap_id
    }

    /// Flips the "Options in 🧵" disclosure and returns the new state.
    pub fn toggle_options(&mut self) -> bool {
        self.options_expanded = !self.options_expanded;
        self.options_expanded
    }

    pub fn options_expanded(&self) -> bool {
        self.options_expanded
    }

    pub fn selected_pattern(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn stage(&self) -> SelectionStage {
        *self.stage.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SelectionStage> {
        self.stage.clone()
    }

    /// Accepts the first valid selection only. `on_complete` runs after the
    /// documentation update unless this instance is dropped first.
    pub fn select<F>(&mut self, pattern_id: &str, on_complete: F) -> Result<(), SelectionError>
    where
        F: FnOnce(GapId) + Send + 'static,
    {
        if self.selected.is_some() {
            return Err(SelectionError::AlreadySelected(self.gap_id.clone()));
        }
        if !self.pattern_ids.iter().any(|id| id == pattern_id) {
            return Err(SelectionError::UnknownPattern {
                gap_id: self.gap_id.clone(),
                pattern_id: pattern_id.to_owned(),
            });
        }
        ensure_runtime()?;
        let Some(sender) = self.stage_sender.take() else {
            return Err(SelectionError::AlreadySelected(self.gap_id.clone()));
        };

        sender.send_replace(SelectionStage::PatternSelected);
        self.selected = Some(pattern_id.to_owned());
        self.options_expanded = true;

        let gap_id = self.gap_id.clone();
        let reply_delay = self.timing.expert_reply_delay();
        let documentation_delay = self.timing.documentation_delay();
        debug!(
            event_name = "demo.qna.pattern_selected",
            gap_id = %gap_id,
            pattern_id,
            "pattern selected"
        );

        self.task = Some(ScheduledTask::spawn(async move {
            sleep(reply_delay).await;
            sender.send_replace(SelectionStage::ExpertReplied);
            sleep(documentation_delay).await;
            sender.send_replace(SelectionStage::DocumentationUpdated);
            on_complete(gap_id);
        })?);

        Ok(())
    }

    pub async fn wait_for_stage(&mut self, stage: SelectionStage) -> SelectionStage {
        wait_for_stage(&mut self.stage, stage).await
    }
}

pub async fn wait_for_stage(
    receiver: &mut watch::Receiver<SelectionStage>,
    stage: SelectionStage,
) -> SelectionStage {
    let reached = match receiver.wait_for(|current| *current >= stage).await {
        Ok(current) => Some(*current),
        Err(_) => None,
    };
    reached.unwrap_or_else(|| *receiver.borrow())
}
