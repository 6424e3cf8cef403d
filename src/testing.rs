//! Test doubles for the embedding and language model seams.

use crate::embedding::Embedder;
use crate::error::{PlotlineError, Result};
use crate::llm::{CompletionRequest, LanguageModel};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const KEYWORD_DIMENSIONS: usize = 64;

/// Bag-of-words embedder: each lower-cased word bumps one hashed bucket.
#[derive(Default)]
pub struct KeywordEmbedder {
    embedded: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total texts embedded so far.
    pub fn texts_embedded(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; KEYWORD_DIMENSIONS];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % KEYWORD_DIMENSIONS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedded.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        KEYWORD_DIMENSIONS
    }
}

/// Embedder whose every call fails.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(PlotlineError::Embedding("embedding service unavailable".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(PlotlineError::Embedding("embedding service unavailable".to_string()))
    }

    fn dimensions(&self) -> usize {
        KEYWORD_DIMENSIONS
    }
}

type Reply = Box<dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync>;

/// Language model that answers from a closure and records every request.
pub struct ScriptedModel {
    reply: Reply,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always replies with `text`.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Replies with a valid recommendation object.
    pub fn recommending() -> Self {
        Self::new(|request| {
            Ok(serde_json::json!({
                "reason": format!("Matches the search ({} prompt characters).", request.user.len()),
                "highlights": ["scripted"],
            })
            .to_string())
        })
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self::new(|_| Err(PlotlineError::OpenAI("scripted failure".to_string())))
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        (self.reply)(request)
    }
}
