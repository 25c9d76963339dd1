//! In-memory chat client that records every call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::blame::message::BlameMessage;
use crate::platform::{ChatClient, OutgoingMessage, PostedMessage, Profile, UserInfo};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListMembers(String),
    UserInfo(String),
    Post(OutgoingMessage),
    Update {
        channel: String,
        ts: String,
        content: BlameMessage,
    },
}

#[derive(Default)]
pub struct FakeChat {
    members: HashMap<String, Vec<String>>,
    users: HashMap<String, UserInfo>,
    post_ack: Option<PostedMessage>,
    latency: Duration,
    fail_post: bool,
    fail_update_at: Option<usize>,
    calls: Mutex<Vec<(Instant, Call)>>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: &str, members: &[&str]) -> Self {
        self.members.insert(
            channel.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_user(mut self, user: UserInfo) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }

    /// Acknowledgement returned for every post
    pub fn with_post_ack(mut self, ack: PostedMessage) -> Self {
        self.post_ack = Some(ack);
        self
    }

    /// Simulated network time for posts and updates
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every post fails at the transport level
    pub fn with_failing_post(mut self) -> Self {
        self.fail_post = true;
        self
    }

    /// The `n`-th update (1-based) fails at the transport level
    pub fn with_failing_update(mut self, n: usize) -> Self {
        self.fail_update_at = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.timed_calls().into_iter().map(|(_, call)| call).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<OutgoingMessage> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Post(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<BlameMessage> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn list_members(&self, channel: &str) -> Result<Vec<String>> {
        self.record(Call::ListMembers(channel.to_string()));
        self.members
            .get(channel)
            .cloned()
            .with_context(|| format!("channel_not_found: {channel}"))
    }

    async fn user_info(&self, user: &str) -> Result<UserInfo> {
        self.record(Call::UserInfo(user.to_string()));
        self.users
            .get(user)
            .cloned()
            .with_context(|| format!("user_not_found: {user}"))
    }

    async fn post_message(&self, message: &OutgoingMessage) -> Result<PostedMessage> {
        self.record(Call::Post(message.clone()));
        tokio::time::sleep(self.latency).await;
        if self.fail_post {
            bail!("connection reset while posting");
        }
        Ok(self.post_ack.clone().unwrap_or_else(|| PostedMessage {
            ok: true,
            ts: Some("2000.0001".to_string()),
            channel: Some(message.channel.clone()),
            error: None,
        }))
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        content: &BlameMessage,
    ) -> Result<()> {
        self.record(Call::Update {
            channel: channel.to_string(),
            ts: ts.to_string(),
            content: content.clone(),
        });
        tokio::time::sleep(self.latency).await;
        if self.fail_update_at == Some(self.updates().len()) {
            bail!("connection reset while updating {ts}");
        }
        Ok(())
    }
}

pub fn human(id: &str, name: &str, avatar: Option<&str>) -> UserInfo {
    UserInfo {
        id: id.to_string(),
        is_bot: false,
        deleted: false,
        profile: Some(Profile {
            display_name: name.to_string(),
            real_name: String::new(),
            image_48: avatar.map(str::to_string),
        }),
    }
}

pub fn bot(id: &str) -> UserInfo {
    UserInfo {
        is_bot: true,
        ..human(id, "robot", None)
    }
}

pub fn deleted(id: &str) -> UserInfo {
    UserInfo {
        deleted: true,
        ..human(id, "gone", None)
    }
}
