//! Chat transcript model: who said what, when, and whether it sits in a thread.

use athena_core::Expert;
use serde::Serialize;

use crate::blocks::MessageTemplate;

pub const DEMO_CHANNEL: &str = "resolve-ai-feedback";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageAuthor {
    pub name: String,
    pub handle: String,
    pub avatar: String,
    pub is_bot: bool,
}

impl MessageAuthor {
    pub fn athena() -> Self {
        Self {
            name: "Athena".to_owned(),
            handle: "@athena".to_owned(),
            avatar: "/athena-avatar.webp".to_owned(),
            is_bot: true,
        }
    }

    pub fn from_expert(expert: &Expert) -> Self {
        Self {
            name: expert.name.clone(),
            handle: expert.slack_handle.clone(),
            avatar: expert.avatar.clone(),
            is_bot: false,
        }
    }

    fn display(&self) -> String {
        if self.is_bot {
            format!("{} APP", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadMessage {
    pub author: MessageAuthor,
    pub timestamp: String,
    pub in_thread: bool,
    pub message: MessageTemplate,
}

impl ThreadMessage {
    pub fn top_level(author: MessageAuthor, timestamp: &str, message: MessageTemplate) -> Self {
        Self { author, timestamp: timestamp.to_owned(), in_thread: false, message }
    }

    pub fn reply(author: MessageAuthor, timestamp: &str, message: MessageTemplate) -> Self {
        Self { author, timestamp: timestamp.to_owned(), in_thread: true, message }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SlackThread {
    pub channel: String,
    pub messages: Vec<ThreadMessage>,
}

impl SlackThread {
    pub fn new() -> Self {
        Self { channel: DEMO_CHANNEL.to_owned(), messages: Vec::new() }
    }

    pub fn push(&mut self, message: ThreadMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn to_terminal_text(&self) -> String {
        let mut output = format!("#{}\n", self.channel);
        for message in &self.messages {
            let indent = if message.in_thread { "    │ " } else { "" };
            output.push('\n');
            output.push_str(&format!(
                "{indent}{} ({}) {}\n",
                message.author.display(),
                message.author.handle,
                message.timestamp
            ));
            for line in message.message.to_terminal_text().lines() {
                output.push_str(indent);
                output.push_str(line);
                output.push('\n');
            }
        }
        output
    }
}
