//! Reader pipeline: orchestrates one run from request to emitted documents.
//!
//! Flow: GENERATE_STORY → SANITIZE → SPLIT_FOR_ILLUSTRATION* → ILLUSTRATE →
//!       ANNOTATE → ASSEMBLE → EMIT
//!
//! The split is the only retried step. Every other failure ends the run, and a
//! run either emits both documents or nothing: files are staged in a private
//! temporary directory under the output directory and renamed into place last.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::{PipelineError, Stage};
use crate::generation::collaborators::{Collaborators, PieceDraft, StoryRequest};
use crate::generation::debug_dump::DebugDump;
use crate::generation::prompts::{
    illustration_prompt, split_prompt, story_prompt, STORY_END_MARKER,
};
use crate::layout::{assemble, BookLayout, ImageAsset, LayoutUnit, SectionKind, DEFAULT_CHAR_THRESHOLD};
use crate::render::epub::DEFAULT_AUTHOR;
use crate::render::{render_document, write_epub, EpubMetadata};
use crate::text::slug::DEFAULT_SLUG_LEN;
use crate::text::{inject_ruby, romaji_slug, sanitize, validate_story, TextContext, ValidationMode};

/// Upper bound on illustrations per book; larger requests are capped.
pub const MAX_PICTURES: usize = 3;
/// Extra split attempts after the first when the piece count is wrong.
pub const DEFAULT_MAX_SPLIT_RETRIES: u32 = 2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_STYLE: &str = "Colored Pencil sketch";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub out_dir: PathBuf,
    pub char_threshold: usize,
    pub max_split_retries: u32,
    pub validation: ValidationMode,
    pub concurrent_illustrations: bool,
    pub author: String,
    pub timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("books"),
            char_threshold: DEFAULT_CHAR_THRESHOLD,
            max_split_retries: DEFAULT_MAX_SPLIT_RETRIES,
            validation: ValidationMode::Off,
            concurrent_illustrations: false,
            author: DEFAULT_AUTHOR.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One reader to build.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderRequest {
    /// School grade, 1–6.
    pub grade: u8,
    /// Kanji the story must practise.
    pub kanji: Vec<char>,
    pub min_freq: usize,
    pub wc_range: (u32, u32),
    #[serde(default)]
    pub n_pics: usize,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub idea: Option<String>,
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

impl ReaderRequest {
    fn story_request(&self) -> StoryRequest {
        StoryRequest {
            grade: self.grade,
            kanji: self.kanji.clone(),
            min_freq: self.min_freq,
            wc_range: self.wc_range,
            idea: self.idea.clone(),
        }
    }
}

/// A narrative segment, optionally paired with one illustration.
#[derive(Debug, Clone, Serialize)]
pub struct Piece {
    /// 1-based position in the story.
    pub index: usize,
    pub text: String,
    pub illustration_prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    pub kind: SectionKind,
    pub piece_index: usize,
    /// Image file name inside the EPUB, for `side` and `picture` sections.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReaderOutput {
    pub title: String,
    pub slug: String,
    pub epub_path: PathBuf,
    pub html_path: PathBuf,
    pub sections: Vec<SectionSummary>,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct Pipeline {
    text: TextContext,
    collaborators: Collaborators,
    dump: DebugDump,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(text: TextContext, collaborators: Collaborators, settings: PipelineSettings) -> Self {
        Self {
            text,
            collaborators,
            dump: DebugDump::disabled(),
            settings,
        }
    }

    pub fn with_debug_dump(mut self, dump: DebugDump) -> Self {
        self.dump = dump;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// `make_reader` under the configured deadline. On timeout the run is
    /// dropped mid-flight and nothing is emitted.
    pub async fn make_reader_with_timeout(
        &self,
        request: ReaderRequest,
    ) -> Result<ReaderOutput, PipelineError> {
        let limit = self.settings.timeout;
        match tokio::time::timeout(limit, self.make_reader(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Reader pipeline exceeded {}s deadline", limit.as_secs());
                Err(PipelineError::TimedOut {
                    secs: limit.as_secs(),
                })
            }
        }
    }

    /// Runs every stage once (the split up to `1 + max_split_retries` times).
    pub async fn make_reader(&self, request: ReaderRequest) -> Result<ReaderOutput, PipelineError> {
        let grade = request.grade;

        // Step 1: GENERATE_STORY
        info!(
            "Generating grade {grade} story ({} required kanji, min_freq={})",
            request.kanji.len(),
            request.min_freq
        );
        let story_request = request.story_request();
        let draft = self
            .collaborators
            .story
            .generate(&story_request)
            .await
            .map_err(|e| PipelineError::generation(Stage::GenerateStory, e))?;
        let title = draft.title.trim().to_string();
        let raw_story = cut_story(&draft.story);

        // Step 2: SANITIZE
        let ctx = self.text.clone();
        let story = run_blocking(Stage::Sanitize, move || sanitize(&raw_story, grade, &ctx)).await?;
        self.check_story(&story, &request)?;

        let slug = romaji_slug(&title, DEFAULT_SLUG_LEN, self.text.transliterator.as_ref());
        self.dump.prompt("story", &slug, &story_prompt(&story_request));
        self.dump.reply("story", &slug, &draft);
        info!(
            "Story \"{title}\" ({slug}): {} chars after sanitizing",
            story.chars().count()
        );

        // Steps 3–4: SPLIT_FOR_ILLUSTRATION, ILLUSTRATE
        let n_pics = request.n_pics.min(MAX_PICTURES);
        if request.n_pics > MAX_PICTURES {
            info!("Capping {} requested pictures at {MAX_PICTURES}", request.n_pics);
        }
        let (pieces, images): (Vec<Piece>, Vec<Option<ImageAsset>>) = if n_pics > 0 {
            let drafts = self
                .split_with_retry(&story, n_pics, &request.style, &slug)
                .await?;
            let pieces = index_pieces(drafts);
            let images = self.illustrate(&pieces, &request.style, &slug).await?;
            (pieces, images.into_iter().map(Some).collect())
        } else {
            let piece = Piece {
                index: 1,
                text: story,
                illustration_prompt: String::new(),
            };
            (vec![piece], vec![None])
        };

        // Step 5: ANNOTATE
        let ctx = self.text.clone();
        let texts: Vec<String> = pieces.iter().map(|p| p.text.clone()).collect();
        let annotated = run_blocking(Stage::Annotate, move || {
            texts
                .iter()
                .map(|t| inject_ruby(&sanitize(t, grade, &ctx), grade, &ctx))
                .collect::<Vec<_>>()
        })
        .await?;

        // Step 6: ASSEMBLE
        let units: Vec<LayoutUnit> = pieces
            .iter()
            .zip(annotated)
            .zip(images)
            .map(|((piece, html), image)| LayoutUnit {
                piece_index: piece.index,
                html,
                image,
            })
            .collect();
        let threshold = self.settings.char_threshold;
        let layout = run_blocking(Stage::Assemble, move || assemble(units, threshold))
            .await?
            .map_err(|e| PipelineError::Image(e.to_string()))?;
        let sections = summarize(&layout);
        info!(
            "Assembled {} sections with {} images",
            sections.len(),
            layout.images.len()
        );

        // Step 7: EMIT
        let meta = EpubMetadata::for_book(&title, &slug, &self.settings.author);
        let (epub_path, html_path) = emit(layout, meta, &slug, &self.settings.out_dir).await?;
        info!(
            "Reader written: {} and {}",
            epub_path.display(),
            html_path.display()
        );

        Ok(ReaderOutput {
            title,
            slug,
            epub_path,
            html_path,
            sections,
        })
    }

    fn check_story(&self, story: &str, request: &ReaderRequest) -> Result<(), PipelineError> {
        if self.settings.validation == ValidationMode::Off {
            return Ok(());
        }
        match validate_story(
            story,
            request.grade,
            &request.kanji,
            request.min_freq,
            &self.text.grades,
        ) {
            Ok(()) => Ok(()),
            Err(e) if self.settings.validation == ValidationMode::Warn => {
                warn!("Story validation: {e}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Asks the splitter for exactly `expected` pieces, repeating the same
    /// request up to `max_split_retries` more times on a wrong count.
    async fn split_with_retry(
        &self,
        story: &str,
        expected: usize,
        style: &str,
        slug: &str,
    ) -> Result<Vec<PieceDraft>, PipelineError> {
        self.dump
            .prompt("split", slug, &split_prompt(story, expected, style));

        let max_retries = self.settings.max_split_retries;
        let mut observed = 0usize;

        for attempt in 0..=max_retries {
            let pieces = self
                .collaborators
                .splitter
                .split(story, expected, style)
                .await
                .map_err(|e| PipelineError::generation(Stage::Split, e))?;
            self.dump.reply("split", slug, &pieces);

            if pieces.len() == expected {
                info!("Story split into {expected} pieces (attempt {})", attempt + 1);
                return Ok(pieces);
            }

            observed = pieces.len();
            if attempt < max_retries {
                warn!(
                    "Split attempt {}/{}: {} pieces, expected {}, retrying",
                    attempt + 1,
                    max_retries + 1,
                    observed,
                    expected
                );
            }
        }

        Err(PipelineError::SplitCardinality {
            observed,
            expected,
            attempts: max_retries + 1,
        })
    }

    /// One illustration per piece, returned in piece order.
    async fn illustrate(
        &self,
        pieces: &[Piece],
        style: &str,
        slug: &str,
    ) -> Result<Vec<ImageAsset>, PipelineError> {
        let prompts: Vec<(usize, String)> = pieces
            .iter()
            .map(|p| (p.index, illustration_prompt(style, &p.illustration_prompt)))
            .collect();
        for (index, prompt) in &prompts {
            self.dump.prompt(&format!("image{index}"), slug, prompt);
        }

        let images = if self.settings.concurrent_illustrations {
            self.illustrate_concurrently(prompts).await?
        } else {
            let mut images = Vec::with_capacity(prompts.len());
            for (index, prompt) in &prompts {
                info!("Illustrating piece {index}/{}", prompts.len());
                let image = self
                    .collaborators
                    .illustrator
                    .illustrate(*index, prompt)
                    .await
                    .map_err(|e| PipelineError::generation(Stage::Illustrate, e))?;
                images.push(image);
            }
            images
        };

        for (piece, image) in pieces.iter().zip(&images) {
            self.dump.reply(
                &format!("image{}", piece.index),
                slug,
                &json!({ "content_type": image.content_type, "bytes": image.len() }),
            );
        }
        Ok(images)
    }

    /// All requests in flight at once. The first failure returns immediately;
    /// dropping the set aborts the rest.
    async fn illustrate_concurrently(
        &self,
        prompts: Vec<(usize, String)>,
    ) -> Result<Vec<ImageAsset>, PipelineError> {
        info!("Illustrating {} pieces concurrently", prompts.len());
        let mut set = JoinSet::new();
        for (index, prompt) in prompts {
            let illustrator = Arc::clone(&self.collaborators.illustrator);
            set.spawn(async move { (index, illustrator.illustrate(index, &prompt).await) });
        }

        let mut images = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            let (index, result) = joined.map_err(|e| PipelineError::internal(Stage::Illustrate, e))?;
            let image = result.map_err(|e| PipelineError::generation(Stage::Illustrate, e))?;
            images.push((index, image));
        }
        images.sort_by_key(|(index, _)| *index);
        Ok(images.into_iter().map(|(_, image)| image).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Story body up to the first end marker, trimmed.
fn cut_story(story: &str) -> String {
    story
        .split(STORY_END_MARKER)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn index_pieces(drafts: Vec<PieceDraft>) -> Vec<Piece> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(i, draft)| Piece {
            index: i + 1,
            text: draft.text,
            illustration_prompt: draft.prompt,
        })
        .collect()
}

fn summarize(layout: &BookLayout) -> Vec<SectionSummary> {
    layout
        .sections
        .iter()
        .map(|s| SectionSummary {
            kind: s.kind,
            piece_index: s.piece_index,
            image: s
                .image
                .and_then(|i| layout.images.get(i))
                .map(|slot| slot.file_name.clone()),
        })
        .collect()
}

/// Runs CPU-bound or blocking work off the async workers.
async fn run_blocking<T, F>(stage: Stage, f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::internal(stage, e))
}

/// Both documents, written but not yet visible in the output directory.
struct StagedDocuments {
    dir: TempDir,
    epub: PathBuf,
    html: PathBuf,
    epub_target: PathBuf,
    html_target: PathBuf,
}

impl StagedDocuments {
    /// Renames both files into place. A book already published under the same
    /// slug is set aside first and restored if either rename fails, so the
    /// output directory always holds a complete pair.
    fn publish(self) -> io::Result<(PathBuf, PathBuf)> {
        let previous = self.dir.path().join("previous.epub");
        let had_previous = set_aside(&self.epub_target, &previous)?;

        let published = std::fs::rename(&self.epub, &self.epub_target).and_then(|()| {
            std::fs::rename(&self.html, &self.html_target).inspect_err(|_| {
                if !had_previous {
                    if let Err(e) = std::fs::remove_file(&self.epub_target) {
                        warn!("Could not remove {}: {e}", self.epub_target.display());
                    }
                }
            })
        });

        if let Err(e) = published {
            if had_previous {
                if let Err(restore) = std::fs::rename(&previous, &self.epub_target) {
                    warn!(
                        "Could not restore previous {}: {restore}",
                        self.epub_target.display()
                    );
                }
            }
            return Err(e);
        }

        drop(self.dir);
        Ok((self.epub_target, self.html_target))
    }
}

/// Moves `target` to `backup` when it exists. Returns whether it existed.
fn set_aside(target: &Path, backup: &Path) -> io::Result<bool> {
    match std::fs::rename(target, backup) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn stage_documents(
    layout: &BookLayout,
    meta: &EpubMetadata,
    slug: &str,
    out_dir: &Path,
) -> io::Result<StagedDocuments> {
    std::fs::create_dir_all(out_dir)?;
    let dir = tempfile::Builder::new()
        .prefix(".reader-")
        .tempdir_in(out_dir)?;

    let epub = dir.path().join(format!("{slug}.epub"));
    let writer = write_epub(BufWriter::new(File::create(&epub)?), meta, layout)?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    let html = dir.path().join(format!("{slug}.html"));
    std::fs::write(&html, render_document(&meta.title, layout))?;

    Ok(StagedDocuments {
        dir,
        epub,
        html,
        epub_target: out_dir.join(format!("{slug}.epub")),
        html_target: out_dir.join(format!("{slug}.html")),
    })
}

/// Writes on the blocking pool, then publishes without an intervening await so
/// a cancelled run cannot stop between the two renames.
async fn emit(
    layout: BookLayout,
    meta: EpubMetadata,
    slug: &str,
    out_dir: &Path,
) -> Result<(PathBuf, PathBuf), PipelineError> {
    let slug = slug.to_string();
    let out_dir = out_dir.to_path_buf();
    let staged = run_blocking(Stage::Emit, move || {
        stage_documents(&layout, &meta, &slug, &out_dir)
    })
    .await??;
    Ok(staged.publish()?)
}
