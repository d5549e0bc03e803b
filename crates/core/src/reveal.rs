//! Owned timers for staged reveals.
//!
//! Every timer is held by a [`ScheduledTask`]; dropping the handle aborts the task, so
//! a screen that is torn down can never be updated by one of its own leftover timers.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("no async runtime is available to drive demo timers")]
    NoRuntime,
}

/// Returns an error when called outside a tokio runtime.
pub fn ensure_runtime() -> Result<Handle, TimerError> {
    Handle::try_current().map_err(|_| TimerError::NoRuntime)
}

#[derive(Debug)]
pub struct ScheduledTask {
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn spawn<F>(future: F) -> Result<Self, TimerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = ensure_runtime()?;
        Ok(Self { handle: Some(runtime.spawn(future)) })
    }

    pub fn after<F>(delay: Duration, callback: F) -> Result<Self, TimerError>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn(async move {
            sleep(delay).await;
            callback();
        })
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Offsets, relative to activation, at which each item becomes visible.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevealSchedule {
    offsets: Vec<Duration>,
}

impl RevealSchedule {
    /// First item immediately, then one more every `step`.
    pub fn stepped(items: usize, step: Duration) -> Self {
        Self { offsets: (0..items).map(|index| step.saturating_mul(index as u32)).collect() }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[Duration] {
        &self.offsets
    }

    pub fn total_duration(&self) -> Duration {
        self.offsets.last().copied().unwrap_or_default()
    }
}

/// Visible-item counter for one screen instance.
///
/// The count starts at zero, only ever grows, and stops growing as soon as the
/// sequencer is cancelled or dropped. A new instance always starts from zero again.
#[derive(Debug)]
pub struct RevealSequencer {
    visible: watch::Receiver<usize>,
    total: usize,
    task: Option<ScheduledTask>,
}

impl RevealSequencer {
    pub fn start(schedule: RevealSchedule) -> Result<Self, TimerError> {
        let total = schedule.len();
        let (sender, visible) = watch::channel(0usize);
        let activated_at = Instant::now();

        let task = ScheduledTask::spawn(async move {
            for (index, offset) in schedule.offsets.into_iter().enumerate() {
                sleep_until(activated_at + offset).await;
                sender.send_replace(index + 1);
            }
        })?;

        Ok(Self { visible, total, task: Some(task) })
    }

    /// An instance with everything already visible and no timers.
    pub fn completed(total: usize) -> Self {
        let (_, visible) = watch::channel(total);
        Self { visible, total, task: None }
    }

    pub fn visible(&self) -> usize {
        *self.visible.borrow()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.visible() >= self.total
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.visible.clone()
    }

    /// Waits until at least `count` items are visible, or until the sequencer stops.
    /// Returns the visible count at that point.
    pub async fn wait_until(&mut self, count: usize) -> usize {
        wait_for_count(&mut self.visible, count.min(self.total)).await
    }

    pub fn cancel(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
        }
    }
}

/// Resolves once `count` items are visible, or with the last published count when
/// the sequencer is gone first.
pub async fn wait_for_count(receiver: &mut watch::Receiver<usize>, count: usize) -> usize {
    let reached = match receiver.wait_for(|visible| *visible >= count).await {
        Ok(visible) => Some(*visible),
        Err(_) => None,
    };
    reached.unwrap_or_else(|| *receiver.borrow())
}
