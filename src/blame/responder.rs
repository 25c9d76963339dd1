use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::blame::message::{
    final_blame_message, possessive, BlameMessage, Phase, THINKING, WIND_UP_FRAMES,
};
use crate::platform::{ChatClient, IncomingMessage, OutgoingMessage, Profile};

/// Minimum time each frame stays on screen before the next edit is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub frame: Duration,
    /// Hold for the drumroll, right before the reveal
    pub drumroll: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            frame: Duration::from_millis(1500),
            drumroll: Duration::from_millis(2500),
        }
    }
}

/// One edit of the animated message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub content: BlameMessage,
    pub hold: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Revealed,
    /// The placeholder could not be posted; nothing was edited
    PostFailed,
}

/// Resolve to `fut`'s output, but no sooner than `min` after starting.
async fn at_least<F: Future>(min: Duration, fut: F) -> F::Output {
    let (output, ()) = tokio::join!(fut, tokio::time::sleep(min));
    output
}

/// The edits applied after the placeholder, in order.
pub fn blame_frames(user_id: &str, profile: &Profile, pacing: Pacing) -> Vec<Frame> {
    let final_frame = |phase| final_blame_message(user_id, profile.name(), profile.avatar(), phase);

    let mut frames: Vec<Frame> = WIND_UP_FRAMES
        .iter()
        .map(|emoji| Frame {
            content: BlameMessage::plain(*emoji),
            hold: pacing.frame,
        })
        .collect();
    frames.push(Frame {
        content: final_frame(Phase::Drumroll),
        hold: pacing.drumroll,
    });
    frames.push(Frame {
        content: final_frame(Phase::Reveal),
        hold: Duration::ZERO,
    });
    frames
}

/// Post a placeholder next to `trigger` and animate it into the reveal.
pub async fn run_blame_animation<C>(
    client: &C,
    trigger: &IncomingMessage,
    user_id: &str,
    profile: &Profile,
    pacing: Pacing,
) -> Result<Animation>
where
    C: ChatClient + ?Sized,
{
    let placeholder = OutgoingMessage {
        channel: trigger.channel.clone(),
        thread_ts: trigger.thread_ts.clone(),
        content: BlameMessage::plain(THINKING),
    };

    let posted = at_least(pacing.frame, client.post_message(&placeholder)).await?;
    let (ts, channel) = match (posted.ok, posted.ts.as_deref(), posted.channel.as_deref()) {
        (true, Some(ts), Some(channel)) => (ts, channel),
        _ => {
            error!(error = ?posted.error, "message posting failed: {:?}", posted);
            return Ok(Animation::PostFailed);
        }
    };

    for (step, frame) in blame_frames(user_id, profile, pacing).into_iter().enumerate() {
        debug!(step, ts, "updating blame message");
        at_least(frame.hold, client.update_message(channel, ts, &frame.content)).await?;
    }

    info!(user = user_id, "it's {} fault", possessive(profile.name()));
    Ok(Animation::Revealed)
}
