pub mod config;
pub mod controller;
pub mod dataset;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod notifications;
pub mod params;
pub mod progress;
pub mod reveal;
pub mod selection;
pub mod session;

pub use config::{AppConfig, DemoTiming, LogFormat};
pub use controller::{DemoState, ScenarioController};
pub use dataset::DemoDataset;
pub use domain::digest::{derive_digest, AreaStatus, DailyDigest, KnowledgeGraphArea};
pub use domain::expert::{Expert, ExpertId};
pub use domain::gap::{GapAction, GapId, GapStatus, KnowledgeGap, Pattern};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{Resolution, Scenario};
pub use notifications::{
    FanoutSink, InMemoryNotificationSink, Notification, NotificationSink, NotificationTone,
    TracingNotificationSink,
};
pub use params::DemoParams;
pub use progress::ProgressBar;
pub use reveal::{RevealSchedule, RevealSequencer, ScheduledTask, TimerError};
pub use selection::{PatternSelection, SelectionStage};
pub use session::{DemoSession, QnaProgress, ViewProgress};
