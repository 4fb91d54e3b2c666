use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::text::StoryValidationError;

/// Pipeline state a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GenerateStory,
    Sanitize,
    Split,
    Illustrate,
    Annotate,
    Assemble,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::GenerateStory => "generate_story",
            Stage::Sanitize => "sanitize",
            Stage::Split => "split",
            Stage::Illustrate => "illustrate",
            Stage::Annotate => "annotate",
            Stage::Assemble => "assemble",
            Stage::Emit => "emit",
        })
    }
}

/// Terminal failure of one reader run. Every variant names its stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed: {message}")]
    Generation { stage: Stage, message: String },

    #[error("split returned {observed} pieces, expected {expected} ({attempts} attempts)")]
    SplitCardinality {
        observed: usize,
        expected: usize,
        attempts: u32,
    },

    #[error("story validation failed: {0}")]
    Validation(#[from] StoryValidationError),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("failed to write documents: {0}")]
    Emit(#[from] std::io::Error),

    #[error("pipeline timed out after {secs}s")]
    TimedOut { secs: u64 },

    #[error("{stage} failed internally: {message}")]
    Internal { stage: Stage, message: String },
}

impl PipelineError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Generation { stage, .. } | PipelineError::Internal { stage, .. } => {
                Some(*stage)
            }
            PipelineError::SplitCardinality { .. } => Some(Stage::Split),
            PipelineError::Validation(_) => Some(Stage::Sanitize),
            PipelineError::Image(_) => Some(Stage::Assemble),
            PipelineError::Emit(_) => Some(Stage::Emit),
            // A deadline covers the whole run, not one state.
            PipelineError::TimedOut { .. } => None,
        }
    }

    pub(crate) fn generation(stage: Stage, err: impl fmt::Display) -> Self {
        PipelineError::Generation {
            stage,
            message: err.to_string(),
        }
    }

    pub(crate) fn internal(stage: Stage, err: impl fmt::Display) -> Self {
        PipelineError::Internal {
            stage,
            message: err.to_string(),
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, stage) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::Pipeline(err) => {
                let (status, code) = match err {
                    PipelineError::SplitCardinality { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "SPLIT_CARDINALITY")
                    }
                    PipelineError::Validation(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "STORY_VALIDATION")
                    }
                    PipelineError::Generation { .. } => (StatusCode::BAD_GATEWAY, "GENERATION_ERROR"),
                    PipelineError::TimedOut { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMED_OUT"),
                    PipelineError::Image(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IMAGE_ERROR"),
                    PipelineError::Emit(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EMIT_ERROR"),
                    PipelineError::Internal { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    }
                };
                if status.is_server_error() {
                    tracing::error!("Reader pipeline failed: {err:?}");
                }
                (status, code, err.to_string(), err.stage())
            }
        };

        // `stage` is null when the failure is not tied to one pipeline state
        // (request validation, the overall deadline).
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "stage": stage.map(|s| s.to_string())
            }
        }));

        (status, body).into_response()
    }
}
