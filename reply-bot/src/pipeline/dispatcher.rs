//! Sends the follow request and the reply for a composed plan.

use super::composer::ReplyPlan;
use crate::twitter::{ApiError, PlatformApi};

/// Follow the author, then reply to their post.
///
/// Errors are returned as-is; nothing here retries.
pub async fn dispatch<A>(api: &A, plan: &ReplyPlan) -> Result<String, ApiError>
where
    A: PlatformApi + ?Sized,
{
    api.follow(&plan.username).await?;
    let reply_id = api.reply(&plan.message, &plan.post_id).await?;
    log::debug!("Reply {} posted to {}", reply_id, plan.post_id);
    Ok(reply_id)
}
