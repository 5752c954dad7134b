//! Analysis engine binary.
//!
//! Wires the engine against the in-memory store and the Gemini client and
//! runs a single portfolio job. Deployments with a real persistence backend
//! swap the store construction; everything downstream only sees the
//! repository traits.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use folio_engine::{
    sweep_stale_jobs, AnalyzerContext, EngineConfig, JobOrchestrator, RateLimiter, ReanalysisGate,
};
use folio_gemini::{GeminiClient, GeminiConfig};
use folio_media::{MediaFetcher, YtDlp};
use folio_models::AnalysisJob;
use folio_store::{JobStore, MemoryStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);
    let env_filter = EnvFilter::from_default_env()
        .add_directive("folio=info".parse().unwrap());
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    let mut args = std::env::args().skip(1);
    let (portfolio_id, creator_id) = match (args.next(), args.next()) {
        (Some(p), Some(c)) => (p, c),
        _ => {
            eprintln!("Usage: folio-engine <portfolio_id> <creator_id>");
            std::process::exit(2);
        }
    };

    info!("Starting folio-engine");

    let config = EngineConfig::from_env();

    let provider = match GeminiConfig::from_env().and_then(GeminiClient::new) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create Gemini client: {}", e);
            std::process::exit(1);
        }
    };

    let fetcher = match MediaFetcher::new(
        Arc::new(YtDlp::new(config.download_timeout)),
        config.scratch_dir.clone(),
        config.download_timeout,
    ) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Failed to create media fetcher: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(MemoryStore::new());
    let limiter = Arc::new(RateLimiter::new(&config));
    let ctx = AnalyzerContext {
        jobs: store.clone(),
        images: store.clone(),
        videos: store.clone(),
        projects: store.clone(),
        portfolios: store.clone(),
        provider,
        limiter,
        fetcher,
        config: config.clone(),
    };

    let jobs: Arc<dyn JobStore> = store.clone();
    match sweep_stale_jobs(&jobs, config.stale_job_threshold).await {
        Ok(0) => {}
        Ok(swept) => info!("Swept {} stale jobs", swept),
        Err(e) => error!("Stale-job sweep failed: {}", e),
    }

    let gate = ReanalysisGate::new(store.clone(), &config);
    if let Err(e) = gate.check(&portfolio_id).await {
        error!("Reanalysis denied: {}", e);
        std::process::exit(1);
    }

    let job = AnalysisJob::new(portfolio_id, creator_id);
    if let Err(e) = store.create(&job).await {
        error!("Failed to create job: {}", e);
        std::process::exit(1);
    }

    match JobOrchestrator::new(ctx).run_portfolio_job(&job.id).await {
        Ok(()) => info!(job_id = %job.id, "Job completed"),
        Err(e) => {
            error!(job_id = %job.id, "Job failed: {}", e);
            std::process::exit(1);
        }
    }
}
