//! Offline collaborators backed by a fixture directory:
//!
//! ```text
//! story.json   {"title": "...", "story": "..."}   (story.txt with the same JSON also works)
//! split.json   {"pieces": [{"text": "...", "prompt": "..."}]}
//! img1.jpg     picture for piece 1, img2.jpg for piece 2, …
//! ```
//!
//! Lets the whole pipeline run without network access.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::generation::collaborators::{
    CollaboratorError, Illustrator, PieceDraft, SplitReply, StoryDraft, StoryGenerator,
    StoryRequest, StorySplitter,
};
use crate::layout::ImageAsset;

pub struct LocalFixtures {
    dir: PathBuf,
}

impl LocalFixtures {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read(&self, name: &str) -> Result<(PathBuf, Vec<u8>), CollaboratorError> {
        let path = self.dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((path, bytes)),
            Err(source) => Err(CollaboratorError::Io { path, source }),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, CollaboratorError> {
        let (path, bytes) = self.read(name).await?;
        serde_json::from_slice(&bytes).map_err(|source| CollaboratorError::Parse { path, source })
    }
}

#[async_trait]
impl StoryGenerator for LocalFixtures {
    async fn generate(&self, _request: &StoryRequest) -> Result<StoryDraft, CollaboratorError> {
        match self.read_json("story.json").await {
            Err(CollaboratorError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                self.read_json("story.txt").await
            }
            other => other,
        }
    }
}

#[async_trait]
impl StorySplitter for LocalFixtures {
    async fn split(
        &self,
        _story: &str,
        _pieces: usize,
        _style: &str,
    ) -> Result<Vec<PieceDraft>, CollaboratorError> {
        let reply: SplitReply = self.read_json("split.json").await?;
        Ok(reply.pieces)
    }
}

#[async_trait]
impl Illustrator for LocalFixtures {
    async fn illustrate(
        &self,
        index: usize,
        _prompt: &str,
    ) -> Result<ImageAsset, CollaboratorError> {
        let (_, bytes) = self.read(&format!("img{index}.jpg")).await?;
        Ok(ImageAsset::from_bytes(bytes)?)
    }
}
