//! OpenAI-backed collaborators: chat completions for the story and the split,
//! image generation for illustrations.

use async_trait::async_trait;
use tracing::debug;

use crate::generation::collaborators::{
    CollaboratorError, Illustrator, PieceDraft, SplitReply, StoryDraft, StoryGenerator,
    StoryRequest, StorySplitter,
};
use crate::generation::prompts::{split_prompt, story_prompt};
use crate::layout::ImageAsset;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::LlmClient;

const STORY_TEMPERATURE: f32 = 0.7;
const SPLIT_TEMPERATURE: f32 = 0.5;

pub struct OpenAiCollaborators {
    llm: LlmClient,
}

impl OpenAiCollaborators {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl StoryGenerator for OpenAiCollaborators {
    async fn generate(&self, request: &StoryRequest) -> Result<StoryDraft, CollaboratorError> {
        let prompt = story_prompt(request);
        let draft: StoryDraft = self
            .llm
            .call_json(&prompt, JSON_ONLY_SYSTEM, STORY_TEMPERATURE)
            .await?;
        debug!("Story generated: {} chars", draft.story.chars().count());
        Ok(draft)
    }
}

#[async_trait]
impl StorySplitter for OpenAiCollaborators {
    async fn split(
        &self,
        story: &str,
        pieces: usize,
        style: &str,
    ) -> Result<Vec<PieceDraft>, CollaboratorError> {
        let prompt = split_prompt(story, pieces, style);
        let reply: SplitReply = self
            .llm
            .call_json(&prompt, JSON_ONLY_SYSTEM, SPLIT_TEMPERATURE)
            .await?;
        Ok(reply.pieces)
    }
}

#[async_trait]
impl Illustrator for OpenAiCollaborators {
    async fn illustrate(
        &self,
        index: usize,
        prompt: &str,
    ) -> Result<ImageAsset, CollaboratorError> {
        let bytes = self.llm.generate_image(prompt).await?;
        debug!("Image {index} generated: {} bytes", bytes.len());
        Ok(ImageAsset::from_bytes(bytes)?)
    }
}
