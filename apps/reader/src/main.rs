mod config;
mod errors;
mod generation;
mod layout;
mod llm_client;
mod render;
mod routes;
mod state;
mod text;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::collaborators::Collaborators;
use crate::generation::debug_dump::DebugDump;
use crate::generation::local::LocalFixtures;
use crate::generation::openai::OpenAiCollaborators;
use crate::generation::pipeline::Pipeline;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::text::{GradeTable, KakasiTransliterator, TextContext, VibratoTokenizer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting kanji-reader v{}", env!("CARGO_PKG_VERSION"));

    // Grade table and morphological analyzer
    let grades = GradeTable::builtin().context("Failed to load the kanji grade table")?;
    info!("Grade table loaded ({} kanji)", grades.len());

    let dictionary = config.dictionary_path.clone();
    let reading_field = config.reading_field;
    let tokenizer = tokio::task::spawn_blocking(move || {
        VibratoTokenizer::from_path(&dictionary, reading_field)
    })
    .await?
    .with_context(|| format!("Failed to load dictionary {}", config.dictionary_path.display()))?;

    let text = TextContext::new(grades, Arc::new(tokenizer), Arc::new(KakasiTransliterator));
    let grades = text.grades.clone();

    // Collaborators: fixture directory when configured, otherwise the OpenAI API
    let collaborators = match (&config.local_fixtures_dir, &config.openai_api_key) {
        (Some(dir), _) => {
            let fixtures = LocalFixtures::new(dir.clone());
            info!("Using local fixtures from {}", fixtures.dir().display());
            Collaborators::shared(Arc::new(fixtures))
        }
        (None, Some(api_key)) => {
            let llm = LlmClient::new(api_key.clone(), &config.openai_base_url)?
                .with_models(&config.text_model, &config.image_model);
            info!(
                "LLM client initialized (text: {}, image: {})",
                config.text_model, config.image_model
            );
            Collaborators::shared(Arc::new(OpenAiCollaborators::new(llm)))
        }
        (None, None) => anyhow::bail!("OPENAI_API_KEY or LOCAL_FIXTURES_DIR must be set"),
    };

    let dump = DebugDump::new(config.debug_dump_dir.clone());
    if dump.is_enabled() {
        info!("Dumping prompts and replies to {:?}", config.debug_dump_dir);
    }

    let pipeline = Pipeline::new(text, collaborators, config.pipeline_settings()).with_debug_dump(dump);
    info!(
        "Pipeline ready: output {}, validation {}, timeout {}s",
        pipeline.settings().out_dir.display(),
        pipeline.settings().validation,
        pipeline.settings().timeout.as_secs()
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        pipeline: Arc::new(pipeline),
        grades,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
