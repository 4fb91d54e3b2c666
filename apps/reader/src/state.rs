use std::sync::Arc;

use crate::config::Config;
use crate::generation::pipeline::Pipeline;
use crate::text::GradeTable;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Built once at startup: grade table, dictionary and collaborators.
    pub pipeline: Arc<Pipeline>,
    /// The same table the pipeline classifies with, for the grade listing route.
    pub grades: Arc<GradeTable>,
}
