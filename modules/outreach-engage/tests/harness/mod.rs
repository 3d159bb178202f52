//! Shared mocks for pipeline integration tests: no network, no live
//! platform account, deterministic behavior scripted per test.

// Each integration test binary compiles this module; not every binary uses
// every helper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use outreach_common::{ChannelHandle, ChannelInfo, EngageConfig, Post};
use outreach_engage::traits::{
    ChannelClient, ClientError, ClientResult, CommentGenerator, SearchProvider,
};

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config tuned for tests: fixed post budget, no jittered delays.
pub fn fast_config(min_posts: u32, max_posts: u32) -> EngageConfig {
    EngageConfig::builder()
        .min_posts(min_posts)
        .max_posts(max_posts)
        .min_delay_secs(0)
        .max_delay_secs(0)
        .pass_cooldown_secs(30)
        .build()
}

/// Poll a condition under the paused tokio clock, panicking past `deadline`.
pub async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) {
    let limit = tokio::time::Instant::now() + deadline;
    while !condition() {
        if tokio::time::Instant::now() >= limit {
            panic!("condition not met within {deadline:?}");
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSearch {
    results: Mutex<HashMap<(String, String), Vec<ChannelHandle>>>,
    failing_pairs: Mutex<HashSet<(String, String)>>,
    calls: Mutex<Vec<(String, String, bool)>>,
    close_count: AtomicU32,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_results(&self, keyword: &str, topic: &str, handles: &[&str]) {
        self.results.lock().unwrap().insert(
            (keyword.to_string(), topic.to_string()),
            handles.iter().map(|h| ChannelHandle::new(h)).collect(),
        );
    }

    pub fn fail_pair(&self, keyword: &str, topic: &str) {
        self.failing_pairs
            .lock()
            .unwrap()
            .insert((keyword.to_string(), topic.to_string()));
    }

    pub fn calls(&self) -> Vec<(String, String, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> u32 {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(
        &self,
        keyword: &str,
        topic: &str,
        first_in_session: bool,
    ) -> Result<Vec<ChannelHandle>> {
        self.calls
            .lock()
            .unwrap()
            .push((keyword.to_string(), topic.to_string(), first_in_session));
        if self
            .failing_pairs
            .lock()
            .unwrap()
            .contains(&(keyword.to_string(), topic.to_string()))
        {
            anyhow::bail!("search backend unavailable");
        }
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&(keyword.to_string(), topic.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Resolve(ChannelHandle),
    Join(ChannelHandle),
    Leave(ChannelHandle),
    Comment(i64, String),
    Reaction(i64),
}

#[derive(Clone)]
pub struct ChannelScript {
    pub info: ChannelInfo,
    pub posts: Vec<Post>,
    pub has_discussion: bool,
}

/// How `submit_comment` behaves, shared across all posts.
#[derive(Clone, Copy)]
pub enum SubmitBehavior {
    Succeed,
    /// Throttle with the given hint this many times, then succeed.
    ThrottleThenSucceed { failures: u32, wait_seconds: u64 },
    AlwaysThrottle { wait_seconds: u64 },
    Forbidden,
}

pub struct MockClient {
    channels: Mutex<HashMap<ChannelHandle, ChannelScript>>,
    actions: Mutex<Vec<Action>>,
    submit_behavior: Mutex<SubmitBehavior>,
    submit_failures: AtomicU32,
    submit_attempts: Mutex<Vec<tokio::time::Instant>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            actions: Mutex::new(Vec::new()),
            submit_behavior: Mutex::new(SubmitBehavior::Succeed),
            submit_failures: AtomicU32::new(0),
            submit_attempts: Mutex::new(Vec::new()),
        }
    }

    /// Script a channel with the given posts. Unscripted channels fail
    /// resolution, modeling private/invalid channels.
    pub fn script(&self, handle: &str, posts: Vec<Post>) {
        let handle = ChannelHandle::new(handle);
        self.channels.lock().unwrap().insert(
            handle.clone(),
            ChannelScript {
                info: ChannelInfo {
                    handle: handle.clone(),
                    title: format!("{handle} channel"),
                    about: None,
                    is_member: false,
                },
                posts,
                has_discussion: true,
            },
        );
    }

    pub fn script_without_discussion(&self, handle: &str) {
        self.script(handle, Vec::new());
        self.channels
            .lock()
            .unwrap()
            .get_mut(&ChannelHandle::new(handle))
            .unwrap()
            .has_discussion = false;
    }

    pub fn set_submit_behavior(&self, behavior: SubmitBehavior) {
        *self.submit_behavior.lock().unwrap() = behavior;
        self.submit_failures.store(0, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn comment_count(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, Action::Comment(..)))
            .count()
    }

    pub fn reaction_count(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, Action::Reaction(_)))
            .count()
    }

    pub fn resolve_count(&self, handle: &str) -> usize {
        let handle = ChannelHandle::new(handle);
        self.actions()
            .iter()
            .filter(|a| matches!(a, Action::Resolve(h) if *h == handle))
            .count()
    }

    pub fn submit_attempts(&self) -> Vec<tokio::time::Instant> {
        self.submit_attempts.lock().unwrap().clone()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl ChannelClient for MockClient {
    async fn resolve(&self, handle: &ChannelHandle) -> ClientResult<ChannelInfo> {
        self.record(Action::Resolve(handle.clone()));
        self.channels
            .lock()
            .unwrap()
            .get(handle)
            .map(|script| script.info.clone())
            .ok_or_else(|| ClientError::Unavailable(format!("{handle} is private or invalid")))
    }

    async fn join(&self, handle: &ChannelHandle) -> ClientResult<()> {
        self.record(Action::Join(handle.clone()));
        Ok(())
    }

    async fn leave(&self, handle: &ChannelHandle) -> ClientResult<()> {
        self.record(Action::Leave(handle.clone()));
        Ok(())
    }

    async fn recent_posts(&self, handle: &ChannelHandle, limit: u32) -> ClientResult<Vec<Post>> {
        let channels = self.channels.lock().unwrap();
        let script = channels
            .get(handle)
            .ok_or_else(|| ClientError::Unavailable(format!("{handle} is private or invalid")))?;
        Ok(script.posts.iter().take(limit as usize).cloned().collect())
    }

    async fn submit_comment(&self, post: &Post, text: &str) -> ClientResult<()> {
        self.submit_attempts
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        let behavior = *self.submit_behavior.lock().unwrap();
        match behavior {
            SubmitBehavior::Succeed => {
                self.record(Action::Comment(post.id, text.to_string()));
                Ok(())
            }
            SubmitBehavior::ThrottleThenSucceed {
                failures,
                wait_seconds,
            } => {
                if self.submit_failures.fetch_add(1, Ordering::SeqCst) < failures {
                    Err(ClientError::Throttled { wait_seconds })
                } else {
                    self.record(Action::Comment(post.id, text.to_string()));
                    Ok(())
                }
            }
            SubmitBehavior::AlwaysThrottle { wait_seconds } => {
                Err(ClientError::Throttled { wait_seconds })
            }
            SubmitBehavior::Forbidden => Err(ClientError::WriteForbidden),
        }
    }

    async fn send_reaction(&self, post: &Post, _emoji: &str) -> ClientResult<()> {
        self.record(Action::Reaction(post.id));
        Ok(())
    }

    async fn has_discussion_group(&self, handle: &ChannelHandle) -> ClientResult<bool> {
        self.channels
            .lock()
            .unwrap()
            .get(handle)
            .map(|script| script.has_discussion)
            .ok_or_else(|| ClientError::Unavailable(format!("{handle} is private or invalid")))
    }

    async fn post_supports_comments(&self, post: &Post) -> ClientResult<bool> {
        Ok(post.reply_count.is_some())
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

pub struct MockGenerator {
    pub reply: String,
}

impl MockGenerator {
    pub fn ok() -> Self {
        Self { reply: "ok".into() }
    }
}

#[async_trait]
impl CommentGenerator for MockGenerator {
    async fn generate(&self, _post_text: &str, _topics: &[String]) -> Result<String> {
        Ok(self.reply.clone())
    }
}

// ---------------------------------------------------------------------------
// Post builders
// ---------------------------------------------------------------------------

pub fn long_post(channel: &str, id: i64) -> Post {
    Post {
        id,
        channel: ChannelHandle::new(channel),
        text: Some(format!("A substantial post number {id} with plenty of text")),
        reply_count: Some(0),
    }
}

pub fn short_post(channel: &str, id: i64) -> Post {
    Post {
        id,
        channel: ChannelHandle::new(channel),
        text: Some("hi".into()),
        reply_count: Some(0),
    }
}
