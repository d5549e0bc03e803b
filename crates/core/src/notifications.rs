use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::gap::GapId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTone {
    Success,
    Error,
    Info,
}

/// A toast shown to the viewer. Purely informational; nothing reacts to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,
    pub tone: NotificationTone,
    pub title: String,
    pub description: String,
    pub gap_id: Option<GapId>,
    pub correlation_id: String,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        tone: NotificationTone,
        title: impl Into<String>,
        description: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            notification_id: Uuid::new_v4().to_string(),
            tone,
            title: title.into(),
            description: description.into(),
            gap_id: None,
            correlation_id: correlation_id.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn for_gap(mut self, gap_id: GapId) -> Self {
        self.gap_id = Some(gap_id);
        self
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationSink {
    pub fn notifications(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(notifications) => notifications.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Removes and returns everything raised so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(mut notifications) => std::mem::take(&mut *notifications),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn notify(&self, notification: Notification) {
        match self.notifications.lock() {
            Ok(mut notifications) => notifications.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notification: Notification) {
        info!(
            event_name = "demo.notification.raised",
            correlation_id = %notification.correlation_id,
            gap_id = notification.gap_id.as_ref().map(GapId::as_str).unwrap_or("none"),
            tone = ?notification.tone,
            title = %notification.title,
            "{}",
            notification.description
        );
    }
}

/// Forwards every notification to each inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, notification: Notification) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.notify(notification.clone());
            }
            last.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::gap::GapId;
    use crate::notifications::{
        FanoutSink, InMemoryNotificationSink, Notification, NotificationSink, NotificationTone,
        TracingNotificationSink,
    };

    #[test]
    fn in_memory_sink_records_notifications_in_order() {
        let sink = InMemoryNotificationSink::default();
        sink.notify(
            Notification::new(NotificationTone::Success, "PR approved", "returning", "req-1")
                .for_gap(GapId::from("retry-logic-stripe")),
        );
        sink.notify(Notification::new(NotificationTone::Error, "PR rejected", "kept", "req-2"));

        let notifications = sink.notifications();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].tone, NotificationTone::Success);
        assert_eq!(notifications[0].gap_id.as_ref().map(GapId::as_str), Some("retry-logic-stripe"));
        assert_eq!(notifications[1].correlation_id, "req-2");
        assert_ne!(notifications[0].notification_id, notifications[1].notification_id);
    }

    #[test]
    fn drain_empties_the_sink() {
        let sink = InMemoryNotificationSink::default();
        sink.notify(Notification::new(NotificationTone::Info, "Tour", "enabled", "req-3"));

        assert_eq!(sink.drain().len(), 1);
        assert!(sink.notifications().is_empty());
    }

    #[test]
    fn fanout_delivers_to_every_sink() {
        let first = InMemoryNotificationSink::default();
        let second = InMemoryNotificationSink::default();
        let fanout = FanoutSink::new()
            .with(Arc::new(first.clone()))
            .with(Arc::new(TracingNotificationSink))
            .with(Arc::new(second.clone()));

        fanout.notify(Notification::new(NotificationTone::Success, "PR approved", "ok", "req-4"));

        assert_eq!(first.notifications().len(), 1);
        assert_eq!(second.notifications(), first.notifications());
    }
}
