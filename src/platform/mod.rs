pub mod slack;
#[cfg(test)]
pub mod testing;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::blame::message::BlameMessage;

/// A conversation event received from the platform
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Platform message timestamp, unique per channel and reused on redelivery
    #[serde(rename = "ts")]
    pub id: String,
    pub channel: String,
    /// Author of the message; absent on some system messages
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    /// Set when the message was posted inside a thread
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Present on system-generated messages (edits, joins, bot posts)
    #[serde(default)]
    pub subtype: Option<String>,
}

/// A workspace member as returned by `users.info`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl UserInfo {
    /// Bots and deactivated accounts can never be blamed
    pub fn is_blameable(&self) -> bool {
        !(self.is_bot || self.deleted)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub image_48: Option<String>,
}

impl Profile {
    /// Display name, falling back to the real name, falling back to nothing.
    pub fn name(&self) -> &str {
        if !self.display_name.is_empty() {
            &self.display_name
        } else {
            &self.real_name
        }
    }

    pub fn avatar(&self) -> Option<&str> {
        self.image_48.as_deref().filter(|url| !url.is_empty())
    }
}

/// A new message to post
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub channel: String,
    pub thread_ts: Option<String>,
    pub content: BlameMessage,
}

/// Acknowledgement for a posted message
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PostedMessage {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The chat operations the bot relies on.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Member ids of a channel
    async fn list_members(&self, channel: &str) -> Result<Vec<String>>;

    async fn user_info(&self, user: &str) -> Result<UserInfo>;

    /// Post a message. A transport failure is an `Err`; a rejected post is
    /// reported through the returned acknowledgement.
    async fn post_message(&self, message: &OutgoingMessage) -> Result<PostedMessage>;

    /// Replace the content of a previously posted message
    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        content: &BlameMessage,
    ) -> Result<()>;
}
