//! Comment generation: HTTP-backed generator plus the hardening wrapper the
//! worker actually talks to.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::prelude::IndexedRandom;
use tracing::{info, warn};

use crate::traits::CommentGenerator;

/// Generic replies substituted when generation fails. Bland on purpose.
pub const FALLBACK_COMMENTS: [&str; 5] = [
    "Interesting, thanks for sharing!",
    "Useful post",
    "Good material, keep it up",
    "Well put",
    "Agreed with the author",
];

const MAX_COMMENT_CHARS: usize = 200;

pub fn random_fallback() -> &'static str {
    FALLBACK_COMMENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(FALLBACK_COMMENTS[0])
}

/// Trim, strip one pair of surrounding quotes, cap the length.
pub fn tidy_comment(raw: &str) -> String {
    let mut text = raw.trim();
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = &text[1..text.len() - 1];
        }
    }
    let text = text.trim();
    if text.chars().count() > MAX_COMMENT_CHARS {
        let truncated: String = text.chars().take(MAX_COMMENT_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// FallbackGenerator
// ---------------------------------------------------------------------------

/// Wraps any generator so the worker always gets usable text: output is
/// tidied, and any failure is replaced with a fixed generic comment rather
/// than propagated.
pub struct FallbackGenerator {
    inner: Arc<dyn CommentGenerator>,
}

impl FallbackGenerator {
    pub fn new(inner: Arc<dyn CommentGenerator>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CommentGenerator for FallbackGenerator {
    async fn generate(&self, post_text: &str, topics: &[String]) -> Result<String> {
        match self.inner.generate(post_text, topics).await {
            Ok(raw) => {
                let comment = tidy_comment(&raw);
                if comment.is_empty() {
                    warn!("Generator returned empty text, substituting fallback");
                    Ok(random_fallback().to_string())
                } else {
                    Ok(comment)
                }
            }
            Err(e) => {
                warn!(error = %e, "Comment generation failed, substituting fallback");
                Ok(random_fallback().to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// HttpGenerator
// ---------------------------------------------------------------------------

const DEFAULT_TEMPLATE: &str = "Write a short, natural reply to this post.\n\n\
Post: {post_text}\n\n\
Channel topics: {topics}\n\n\
Keep it to one or two sentences, positive or neutral in tone, \
like a real reader's comment. Reply with the comment only.";

/// Truncation bound for post text embedded in the prompt.
const MAX_PROMPT_POST_CHARS: usize = 1000;

/// Build the final prompt. Templates without a `{post_text}` placeholder get
/// the post appended instead of inlined.
pub fn render_prompt(template: &str, post_text: &str, topics: &[String]) -> String {
    let truncated: String = post_text.chars().take(MAX_PROMPT_POST_CHARS).collect();
    let mut prompt = if template.contains("{post_text}") {
        template.replace("{post_text}", &truncated)
    } else {
        format!("{template}\n\nPost: {truncated}")
    };
    let topics_text = if topics.is_empty() {
        "general".to_string()
    } else {
        topics.join(", ")
    };
    if prompt.contains("{topics}") {
        prompt = prompt.replace("{topics}", &topics_text);
    }
    prompt
}

/// Comment generator over an OpenAI-compatible chat-completions endpoint.
pub struct HttpGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    template: String,
}

impl HttpGenerator {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Override the prompt template. `{post_text}` and `{topics}`
    /// placeholders are substituted at generation time.
    pub fn with_template(mut self, template: &str) -> Self {
        self.template = template.to_string();
        self
    }
}

#[async_trait]
impl CommentGenerator for HttpGenerator {
    async fn generate(&self, post_text: &str, topics: &[String]) -> Result<String> {
        let prompt = render_prompt(&self.template, post_text, topics);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("generator API error (status {status}): {detail}"));
        }

        let payload: serde_json::Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("malformed generator response"))?
            .trim()
            .to_string();

        info!(preview = %content.chars().take(50).collect::<String>(), "Generated comment");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_strips_quotes_and_whitespace() {
        assert_eq!(tidy_comment("  \"Nice post\"  "), "Nice post");
        assert_eq!(tidy_comment("'Nice post'"), "Nice post");
        assert_eq!(tidy_comment("Nice \"quoted\" post"), "Nice \"quoted\" post");
    }

    #[test]
    fn tidy_caps_length() {
        let long = "x".repeat(500);
        let tidied = tidy_comment(&long);
        assert_eq!(tidied.chars().count(), MAX_COMMENT_CHARS + 3);
        assert!(tidied.ends_with("..."));
    }

    #[test]
    fn prompt_substitutes_placeholders() {
        let prompt = render_prompt(
            "Reply to: {post_text} ({topics})",
            "hello world",
            &["travel".into(), "food".into()],
        );
        assert_eq!(prompt, "Reply to: hello world (travel, food)");
    }

    #[test]
    fn prompt_appends_post_when_placeholder_missing() {
        let prompt = render_prompt("Be nice.", "hello", &[]);
        assert!(prompt.starts_with("Be nice."));
        assert!(prompt.ends_with("Post: hello"));
    }

    #[test]
    fn prompt_truncates_long_posts() {
        let post = "y".repeat(5000);
        let prompt = render_prompt("{post_text}", &post, &[]);
        assert_eq!(prompt.chars().count(), MAX_PROMPT_POST_CHARS);
    }

    #[tokio::test]
    async fn fallback_substitutes_on_failure() {
        struct FailingGenerator;
        #[async_trait]
        impl CommentGenerator for FailingGenerator {
            async fn generate(&self, _: &str, _: &[String]) -> Result<String> {
                Err(anyhow!("model unavailable"))
            }
        }

        let generator = FallbackGenerator::new(Arc::new(FailingGenerator));
        let comment = generator.generate("post", &[]).await.unwrap();
        assert!(FALLBACK_COMMENTS.contains(&comment.as_str()));
    }

    #[tokio::test]
    async fn fallback_tidies_successful_output() {
        struct QuotingGenerator;
        #[async_trait]
        impl CommentGenerator for QuotingGenerator {
            async fn generate(&self, _: &str, _: &[String]) -> Result<String> {
                Ok("\"Lovely thread\"".to_string())
            }
        }

        let generator = FallbackGenerator::new(Arc::new(QuotingGenerator));
        assert_eq!(generator.generate("post", &[]).await.unwrap(), "Lovely thread");
    }
}
