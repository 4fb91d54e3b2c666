use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::generation::pipeline::{PipelineSettings, DEFAULT_MAX_SPLIT_RETRIES};
use crate::layout::DEFAULT_CHAR_THRESHOLD;
use crate::llm_client::{DEFAULT_BASE_URL, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::render::epub::DEFAULT_AUTHOR;
use crate::text::tokenizer::DEFAULT_READING_FIELD;
use crate::text::ValidationMode;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Required unless `local_fixtures_dir` is set.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub text_model: String,
    pub image_model: String,
    /// Compiled vibrato dictionary (zstd-compressed).
    pub dictionary_path: PathBuf,
    pub reading_field: usize,
    pub output_dir: PathBuf,
    pub char_threshold: usize,
    pub max_split_retries: u32,
    pub pipeline_timeout_secs: u64,
    pub validation_mode: ValidationMode,
    pub concurrent_illustrations: bool,
    pub debug_dump_dir: Option<PathBuf>,
    pub local_fixtures_dir: Option<PathBuf>,
    pub book_author: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let local_fixtures_dir = var("LOCAL_FIXTURES_DIR").map(PathBuf::from);
        let openai_api_key = var("OPENAI_API_KEY");
        if openai_api_key.is_none() && local_fixtures_dir.is_none() {
            return Err(anyhow!(
                "Required environment variable 'OPENAI_API_KEY' is not set \
                 (or set LOCAL_FIXTURES_DIR to run offline)"
            ));
        }

        Ok(Config {
            openai_api_key,
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            text_model: var("TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: var("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            dictionary_path: var("DICTIONARY_PATH")
                .map(PathBuf::from)
                .context("Required environment variable 'DICTIONARY_PATH' is not set")?,
            reading_field: parse_var(&var, "READING_FIELD", DEFAULT_READING_FIELD)?,
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("books")),
            char_threshold: parse_var(&var, "CHAR_THRESHOLD", DEFAULT_CHAR_THRESHOLD)?,
            max_split_retries: parse_var(&var, "MAX_SPLIT_RETRIES", DEFAULT_MAX_SPLIT_RETRIES)?,
            pipeline_timeout_secs: parse_var(&var, "PIPELINE_TIMEOUT_SECS", 600)?,
            validation_mode: parse_var(&var, "VALIDATION_MODE", ValidationMode::Off)?,
            concurrent_illustrations: match var("CONCURRENT_ILLUSTRATIONS") {
                Some(raw) => parse_flag(&raw).with_context(|| {
                    format!("CONCURRENT_ILLUSTRATIONS must be true or false, got '{raw}'")
                })?,
                None => false,
            },
            debug_dump_dir: var("DEBUG_DUMP_DIR").map(PathBuf::from),
            local_fixtures_dir,
            book_author: var("BOOK_AUTHOR").unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            port: parse_var(&var, "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            out_dir: self.output_dir.clone(),
            char_threshold: self.char_threshold,
            max_split_retries: self.max_split_retries,
            validation: self.validation_mode,
            concurrent_illustrations: self.concurrent_illustrations,
            author: self.book_author.clone(),
            timeout: Duration::from_secs(self.pipeline_timeout_secs),
        }
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
