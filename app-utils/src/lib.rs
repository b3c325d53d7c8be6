use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use moodle_api::fetch::HttpFetcher;
use moodle_api::pipeline::Pipeline;
use moodle_api::scoring::GeminiScorer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

pub struct InitFromEnv {
    pub pipeline: Pipeline<HttpFetcher, GeminiScorer>,
    pub bind_addr: String,
}

/// Builds the grading pipeline from the process environment. `GEMINI_API_KEY`
/// is required; everything else has a default. The session cookie is not part
/// of the environment: callers supply it per request.
pub fn init_from_env() -> Result<InitFromEnv> {
    dotenv().ok();

    let api_key = env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;
    let scorer = match env::var("GEMINI_MODEL") {
        Ok(model) => GeminiScorer::with_model(api_key, model),
        Err(_) => GeminiScorer::new(api_key),
    }
    .context("could not build the scoring client")?;

    let fetcher = HttpFetcher::new().context("could not build the HTTP fetcher")?;

    let concurrency = match env::var("SCORING_CONCURRENCY") {
        Ok(concurrency) => concurrency
            .parse()
            .with_context(|| format!("SCORING_CONCURRENCY is not a number: \"{concurrency}\""))?,
        Err(_) => 1,
    };

    let mut pipeline = Pipeline::new(fetcher, scorer).with_concurrency(concurrency);
    if let Ok(base_url) = env::var("MOODLE_BASE_URL") {
        pipeline = pipeline.with_base_url(base_url);
    }

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_owned());

    Ok(InitFromEnv {
        pipeline,
        bind_addr,
    })
}

pub fn init_tracing() {
    registry()
        .with(fmt::layer().event_format(format().pretty()))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()
                .unwrap(),
        )
        .init();
}
