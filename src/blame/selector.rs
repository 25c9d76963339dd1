use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::platform::{ChatClient, UserInfo};

/// Pick a random member to blame.
///
/// Members are visited in a uniformly random order, each at most once. The
/// `author` is skipped without a lookup; bots and deleted accounts are
/// skipped after one. Returns `None` when nobody qualifies.
pub async fn select_blamee<C, R>(
    client: &C,
    mut candidates: Vec<String>,
    author: &str,
    rng: &mut R,
) -> Result<Option<UserInfo>>
where
    C: ChatClient + ?Sized,
    R: Rng + ?Sized,
{
    candidates.shuffle(rng);

    for candidate in candidates {
        if candidate == author {
            continue;
        }

        let user = client.user_info(&candidate).await?;
        if user.is_blameable() {
            return Ok(Some(user));
        }
        debug!(user = %candidate, "skipping bot or deleted account");
    }

    Ok(None)
}
