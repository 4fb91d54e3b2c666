//! Trait seams for the external generators the pipeline drives.
//!
//! Production: `OpenAiCollaborators` (all three traits on one LLM client).
//! Offline: `LocalFixtures` (files on disk). Tests: in-module stubs.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{ImageAsset, ImageAssetError};
use crate::llm_client::LlmError;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// What the story generator is asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRequest {
    pub grade: u8,
    pub kanji: Vec<char>,
    pub min_freq: usize,
    /// Inclusive character-count range for the story body.
    pub wc_range: (u32, u32),
    pub idea: Option<String>,
}

/// Raw generator output. `story` may still carry the end marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryDraft {
    pub title: String,
    pub story: String,
}

/// One piece as returned by the splitter, before indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceDraft {
    pub text: String,
    #[serde(default)]
    pub prompt: String,
}

/// Wire shape of a split reply: `{"pieces": [{"text", "prompt"}, …]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitReply {
    pub pieces: Vec<PieceDraft>,
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("fixture {path} unreadable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fixture {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("generated image rejected: {0}")]
    Image(#[from] ImageAssetError),
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait StoryGenerator: Send + Sync {
    async fn generate(&self, request: &StoryRequest) -> Result<StoryDraft, CollaboratorError>;
}

#[async_trait]
pub trait StorySplitter: Send + Sync {
    /// Asks for `pieces` consecutive pieces with illustration prompts. The
    /// count is not guaranteed; the caller checks it.
    async fn split(
        &self,
        story: &str,
        pieces: usize,
        style: &str,
    ) -> Result<Vec<PieceDraft>, CollaboratorError>;
}

#[async_trait]
pub trait Illustrator: Send + Sync {
    /// Produces the picture for piece `index` (1-based) from a full prompt.
    async fn illustrate(&self, index: usize, prompt: &str)
        -> Result<ImageAsset, CollaboratorError>;
}

/// The three collaborators one pipeline uses.
#[derive(Clone)]
pub struct Collaborators {
    pub story: Arc<dyn StoryGenerator>,
    pub splitter: Arc<dyn StorySplitter>,
    pub illustrator: Arc<dyn Illustrator>,
}

impl Collaborators {
    /// Uses one value for all three roles.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: StoryGenerator + StorySplitter + Illustrator + 'static,
    {
        Self {
            story: backend.clone(),
            splitter: backend.clone(),
            illustrator: backend,
        }
    }
}
