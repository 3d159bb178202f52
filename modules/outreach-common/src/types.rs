use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical channel identifier: exactly one leading `@`.
///
/// Handles arrive from search results and operator input in mixed forms
/// (`name`, `@name`, `@@name`, padded with whitespace). Normalization happens
/// once, at construction, so set and map lookups are plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelHandle(String);

impl ChannelHandle {
    pub fn new(raw: &str) -> Self {
        let bare = raw.trim().trim_start_matches('@');
        Self(format!("@{bare}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelHandle {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// A channel post as seen by the engagement worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub channel: ChannelHandle,
    /// Post body. Absent for media-only posts.
    pub text: Option<String>,
    /// Reply thread size, if the post exposes a reply structure at all.
    /// `None` means commenting is structurally unavailable for this post.
    pub reply_count: Option<u32>,
}

/// Channel metadata returned by a platform client's `resolve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub handle: ChannelHandle,
    pub title: String,
    pub about: Option<String>,
    /// Whether the acting account is already a member/subscriber.
    pub is_member: bool,
}
