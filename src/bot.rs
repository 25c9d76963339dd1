use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::blame::message::{BlameMessage, FALLBACK_TEXT};
use crate::blame::{run_blame_animation, select_blamee, Animation, Pacing, RecentEvents};
use crate::platform::{ChatClient, IncomingMessage, OutgoingMessage, UserInfo};

/// The phrase that starts the blame game, compared trimmed and lowercased.
pub const TRIGGER_PHRASE: &str = "not my fault";

/// What happened to a single incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    NotTriggered,
    /// Edits, joins and other system messages
    SystemMessage,
    /// Already handled; the transport delivered it again
    Duplicate,
    /// Nobody could be blamed, so the author was told off instead
    Fallback,
    PostFailed,
    Blamed { user_id: String },
}

pub fn is_trigger(text: &str) -> bool {
    text.trim().to_lowercase() == TRIGGER_PHRASE
}

/// Shared state for handling trigger messages
pub struct TriggerHandler {
    client: Arc<dyn ChatClient>,
    pacing: Pacing,
    recent: Mutex<RecentEvents>,
    rng: Mutex<StdRng>,
}

impl TriggerHandler {
    pub fn new(client: Arc<dyn ChatClient>, pacing: Pacing) -> Self {
        Self::with_rng(client, pacing, StdRng::from_os_rng())
    }

    pub fn with_rng(client: Arc<dyn ChatClient>, pacing: Pacing, rng: StdRng) -> Self {
        Self {
            client,
            pacing,
            recent: Mutex::new(RecentEvents::new()),
            rng: Mutex::new(rng),
        }
    }

    pub async fn handle_message(&self, msg: &IncomingMessage) -> Result<TriggerOutcome> {
        if !is_trigger(&msg.text) {
            return Ok(TriggerOutcome::NotTriggered);
        }
        debug!(?msg, "trigger message received");

        if msg.subtype.is_some() {
            return Ok(TriggerOutcome::SystemMessage);
        }

        // Check and record under one lock so concurrent redeliveries can't both pass.
        if !self.recent.lock().await.record(&msg.id) {
            info!("ignoring duplicate message {}", msg.id);
            return Ok(TriggerOutcome::Duplicate);
        }

        let members = self
            .client
            .list_members(&msg.channel)
            .await
            .with_context(|| format!("Failed to list members of {}", msg.channel))?;

        let mut rng = StdRng::from_rng(&mut *self.rng.lock().await);
        let blamee = select_blamee(self.client.as_ref(), members, &msg.user, &mut rng)
            .await
            .context("Failed to select a blamee")?;
        debug!(?blamee, "blamee selected");

        match blamee {
            Some(UserInfo {
                id,
                profile: Some(profile),
                ..
            }) => {
                let animation =
                    run_blame_animation(self.client.as_ref(), msg, &id, &profile, self.pacing)
                        .await?;
                Ok(match animation {
                    Animation::Revealed => TriggerOutcome::Blamed { user_id: id },
                    Animation::PostFailed => TriggerOutcome::PostFailed,
                })
            }
            _ => {
                info!(channel = %msg.channel, "nobody to blame, falling back");
                self.client
                    .post_message(&OutgoingMessage {
                        channel: msg.channel.clone(),
                        thread_ts: None,
                        content: BlameMessage::Markdown(FALLBACK_TEXT.to_string()),
                    })
                    .await
                    .context("Failed to send fallback message")?;
                Ok(TriggerOutcome::Fallback)
            }
        }
    }
}
