//! Slack surface of the Athena demo.
//!
//! - `blocks`: Block Kit message builder
//! - `thread`: channel transcript model
//! - `views`: renderers from demo state to threads, header and welcome page
//! - `actions`: interactive button ids and how they drive a session

pub mod actions;
pub mod blocks;
pub mod thread;
pub mod views;

pub use actions::{apply_action, ActionError, ActionOutcome, BlockAction, DemoCommand};
pub use blocks::{MessageBuilder, MessageTemplate};
pub use thread::{SlackThread, ThreadMessage};
pub use views::{render_session, render_state, render_with_progress, RenderedDemo};
