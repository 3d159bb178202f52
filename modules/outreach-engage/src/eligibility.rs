//! Eligibility checks, fail-closed.
//!
//! A channel is worth engaging only if it has an attached discussion
//! surface; a post only if it additionally exposes a reply structure. Any
//! lookup failure (private channel, invalid handle, platform error) answers
//! "no" — it is logged here and never raised to the caller.

use std::sync::Arc;

use tracing::warn;

use outreach_common::{ChannelHandle, Post};

use crate::traits::ChannelClient;

#[derive(Clone)]
pub struct EligibilityFilter {
    client: Arc<dyn ChannelClient>,
}

impl EligibilityFilter {
    pub fn new(client: Arc<dyn ChannelClient>) -> Self {
        Self { client }
    }

    pub async fn channel_eligible(&self, handle: &ChannelHandle) -> bool {
        match self.client.has_discussion_group(handle).await {
            Ok(eligible) => eligible,
            Err(e) => {
                warn!(channel = %handle, error = %e, "Eligibility lookup failed, treating as ineligible");
                false
            }
        }
    }

    pub async fn post_eligible(&self, post: &Post) -> bool {
        if post.reply_count.is_none() {
            return false;
        }
        match self.client.post_supports_comments(post).await {
            Ok(supported) => supported,
            Err(e) => {
                warn!(
                    channel = %post.channel,
                    post = post.id,
                    error = %e,
                    "Post eligibility lookup failed, treating as ineligible"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use async_trait::async_trait;

    use outreach_common::ChannelInfo;

    use super::*;
    use crate::traits::{ClientError, ClientResult};

    /// Client whose every lookup fails.
    struct BrokenClient;

    #[async_trait]
    impl ChannelClient for BrokenClient {
        async fn resolve(&self, _: &ChannelHandle) -> ClientResult<ChannelInfo> {
            Err(ClientError::Unavailable("private".into()))
        }
        async fn join(&self, _: &ChannelHandle) -> ClientResult<()> {
            Err(anyhow!("boom").into())
        }
        async fn leave(&self, _: &ChannelHandle) -> ClientResult<()> {
            Err(anyhow!("boom").into())
        }
        async fn recent_posts(&self, _: &ChannelHandle, _: u32) -> ClientResult<Vec<Post>> {
            Err(anyhow!("boom").into())
        }
        async fn submit_comment(&self, _: &Post, _: &str) -> ClientResult<()> {
            Err(anyhow!("boom").into())
        }
        async fn send_reaction(&self, _: &Post, _: &str) -> ClientResult<()> {
            Err(anyhow!("boom").into())
        }
        async fn has_discussion_group(&self, _: &ChannelHandle) -> ClientResult<bool> {
            Err(ClientError::Unavailable("private".into()))
        }
        async fn post_supports_comments(&self, _: &Post) -> ClientResult<bool> {
            Err(anyhow!("boom").into())
        }
    }

    fn post(reply_count: Option<u32>) -> Post {
        Post {
            id: 1,
            channel: ChannelHandle::new("@c"),
            text: Some("a sufficiently long post body".into()),
            reply_count,
        }
    }

    #[tokio::test]
    async fn lookup_failure_is_ineligible_not_an_error() {
        let filter = EligibilityFilter::new(Arc::new(BrokenClient));
        assert!(!filter.channel_eligible(&ChannelHandle::new("@x")).await);
        assert!(!filter.post_eligible(&post(Some(3))).await);
    }

    #[tokio::test]
    async fn post_without_reply_structure_is_ineligible() {
        let filter = EligibilityFilter::new(Arc::new(BrokenClient));
        // Short-circuits before the client is consulted.
        assert!(!filter.post_eligible(&post(None)).await);
    }
}
