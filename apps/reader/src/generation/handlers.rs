//! Axum route handlers for the Reader API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::pipeline::{ReaderOutput, ReaderRequest};
use crate::state::AppState;
use crate::text::grades::{is_kanji, MAX_GRADE, MIN_GRADE};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GradeKanjiResponse {
    pub grade: u8,
    pub kanji: Vec<char>,
}

fn check_grade(grade: u8) -> Result<(), AppError> {
    if (MIN_GRADE..=MAX_GRADE).contains(&grade) {
        return Ok(());
    }
    Err(AppError::Validation(format!(
        "grade must be between {MIN_GRADE} and {MAX_GRADE}, got {grade}"
    )))
}

/// Rejects requests the pipeline cannot serve before any collaborator is called.
pub fn validate_request(request: &ReaderRequest) -> Result<(), AppError> {
    check_grade(request.grade)?;
    if request.kanji.is_empty() {
        return Err(AppError::Validation("kanji cannot be empty".to_string()));
    }
    if let Some(bad) = request.kanji.iter().find(|c| !is_kanji(**c)) {
        return Err(AppError::Validation(format!("'{bad}' is not a kanji")));
    }
    let (min, max) = request.wc_range;
    if min > max {
        return Err(AppError::Validation(format!(
            "wc_range minimum {min} exceeds maximum {max}"
        )));
    }
    if request.style.trim().is_empty() && request.n_pics > 0 {
        return Err(AppError::Validation(
            "style cannot be empty when pictures are requested".to_string(),
        ));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/readers
///
/// Runs the full pipeline and returns where the EPUB and HTML were written,
/// plus the page sequence both documents share. Blocks until the run finishes
/// or the configured deadline passes.
pub async fn handle_make_reader(
    State(state): State<AppState>,
    Json(request): Json<ReaderRequest>,
) -> Result<Json<ReaderOutput>, AppError> {
    validate_request(&request)?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("reader", %run_id, grade = request.grade);
    async move {
        info!(
            "Reader requested: {} kanji, {} pictures",
            request.kanji.len(),
            request.n_pics
        );
        let output = state.pipeline.make_reader_with_timeout(request).await?;
        info!("Reader {} ready ({} pages)", output.slug, output.sections.len());
        Ok::<_, AppError>(Json(output))
    }
    .instrument(span)
    .await
}

/// GET /api/v1/grades/:grade/kanji
///
/// Kanji taught in one grade, in table order. Clients pick the practice list
/// for a reader from here.
pub async fn handle_grade_kanji(
    State(state): State<AppState>,
    Path(grade): Path<u8>,
) -> Result<Json<GradeKanjiResponse>, AppError> {
    check_grade(grade)?;
    Ok(Json(GradeKanjiResponse {
        grade,
        kanji: state.grades.kanji_for(grade).to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::response::IntoResponse;

    use super::*;
    use crate::config::Config;
    use crate::errors::Stage;
    use crate::generation::collaborators::{
        CollaboratorError, Collaborators, Illustrator, PieceDraft, StoryDraft, StoryGenerator,
        StoryRequest, StorySplitter,
    };
    use crate::generation::pipeline::{Pipeline, PipelineSettings, DEFAULT_STYLE};
    use crate::layout::images::test_support::png;
    use crate::layout::ImageAsset;
    use crate::llm_client::LlmError;
    use crate::text::test_support::{context, grades};

    /// Succeeds everywhere except the stage named in `fail_at`.
    struct FailAt(Option<Stage>);

    impl FailAt {
        fn check(&self, stage: Stage) -> Result<(), CollaboratorError> {
            if self.0 == Some(stage) {
                return Err(CollaboratorError::Llm(LlmError::Api {
                    status: 503,
                    message: format!("{stage} unavailable"),
                }));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StoryGenerator for FailAt {
        async fn generate(&self, _request: &StoryRequest) -> Result<StoryDraft, CollaboratorError> {
            self.check(Stage::GenerateStory)?;
            Ok(StoryDraft {
                title: "山と川".to_string(),
                story: "先生は海で泳ぐ魚を見る。".to_string(),
            })
        }
    }

    #[async_trait]
    impl StorySplitter for FailAt {
        async fn split(
            &self,
            story: &str,
            _pieces: usize,
            _style: &str,
        ) -> Result<Vec<PieceDraft>, CollaboratorError> {
            Ok(vec![PieceDraft {
                text: story.to_string(),
                prompt: "sea".to_string(),
            }])
        }
    }

    #[async_trait]
    impl Illustrator for FailAt {
        async fn illustrate(
            &self,
            _index: usize,
            _prompt: &str,
        ) -> Result<ImageAsset, CollaboratorError> {
            self.check(Stage::Illustrate)?;
            Ok(ImageAsset::from_bytes(png(8, 8))?)
        }
    }

    fn app_state(fail_at: Option<Stage>, out_dir: PathBuf) -> AppState {
        let config = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "DICTIONARY_PATH" => Some("dict.zst".to_string()),
            _ => None,
        })
        .unwrap();
        let settings = PipelineSettings {
            out_dir,
            ..PipelineSettings::default()
        };
        let collaborators = Collaborators::shared(Arc::new(FailAt(fail_at)));
        AppState {
            config,
            pipeline: Arc::new(Pipeline::new(context(), collaborators, settings)),
            grades: Arc::new(grades()),
        }
    }

    async fn failure_body(state: AppState) -> serde_json::Value {
        let err = handle_make_reader(State(state), Json(request()))
            .await
            .unwrap_err();
        let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request() -> ReaderRequest {
        ReaderRequest {
            grade: 2,
            kanji: vec!['海', '魚'],
            min_freq: 2,
            wc_range: (200, 400),
            n_pics: 1,
            style: DEFAULT_STYLE.to_string(),
            idea: None,
        }
    }

    fn rejected(request: &ReaderRequest) -> String {
        match validate_request(request) {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_request_accepted() {
        assert!(validate_request(&request()).is_ok());
    }

    #[test]
    fn test_grade_out_of_range() {
        for grade in [0, 7] {
            let mut r = request();
            r.grade = grade;
            assert!(rejected(&r).contains("grade"));
        }
    }

    #[test]
    fn test_empty_kanji_list() {
        let mut r = request();
        r.kanji.clear();
        assert!(rejected(&r).contains("kanji"));
    }

    #[test]
    fn test_non_kanji_entry() {
        let mut r = request();
        r.kanji.push('あ');
        assert!(rejected(&r).contains("'あ'"));
    }

    #[test]
    fn test_inverted_word_count_range() {
        let mut r = request();
        r.wc_range = (500, 100);
        assert!(rejected(&r).contains("wc_range"));
    }

    #[test]
    fn test_empty_style_only_matters_with_pictures() {
        let mut r = request();
        r.style = "  ".to_string();
        assert!(rejected(&r).contains("style"));
        r.n_pics = 0;
        assert!(validate_request(&r).is_ok());
    }

    #[tokio::test]
    async fn test_make_reader_success() {
        let out = tempfile::tempdir().unwrap();
        let state = app_state(None, out.path().to_path_buf());
        let Json(output) = handle_make_reader(State(state), Json(request()))
            .await
            .unwrap();
        assert_eq!(output.slug, "yamatokawa");
        assert!(output.epub_path.exists());
        assert!(output.html_path.exists());
    }

    #[tokio::test]
    async fn test_failure_body_names_story_stage() {
        let out = tempfile::tempdir().unwrap();
        let body = failure_body(app_state(Some(Stage::GenerateStory), out.path().into())).await;
        assert_eq!(body["error"]["code"], "GENERATION_ERROR");
        assert_eq!(body["error"]["stage"], "generate_story");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("generate_story unavailable"));
    }

    #[tokio::test]
    async fn test_failure_body_names_illustrate_stage() {
        let out = tempfile::tempdir().unwrap();
        let body = failure_body(app_state(Some(Stage::Illustrate), out.path().into())).await;
        assert_eq!(body["error"]["code"], "GENERATION_ERROR");
        assert_eq!(body["error"]["stage"], "illustrate");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("illustrate unavailable"));
    }

    #[tokio::test]
    async fn test_failure_body_names_emit_stage() {
        let out = tempfile::tempdir().unwrap();
        // A regular file where the output directory's parent should be.
        let blocker = out.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let body = failure_body(app_state(None, blocker.join("books"))).await;
        assert_eq!(body["error"]["code"], "EMIT_ERROR");
        assert_eq!(body["error"]["stage"], "emit");
    }

    #[tokio::test]
    async fn test_grade_kanji_listing() {
        let out = tempfile::tempdir().unwrap();
        let state = app_state(None, out.path().into());
        let Json(listing) = handle_grade_kanji(State(state.clone()), Path(2)).await.unwrap();
        assert_eq!(listing.grade, 2);
        assert_eq!(listing.kanji, vec!['海', '魚', '読', '食']);

        let err = handle_grade_kanji(State(state), Path(7)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
