//! Portfolio synthesis.
//!
//! The final stage of a job: synthesize over all currently successful
//! project analyses, grounded in the creator's profile. Unlike media and
//! project failures, a portfolio synthesis failure fails the whole job;
//! the portfolio analysis is the job's deliverable.

use tracing::{debug, error, info};

use folio_models::{AnalysisStatus, ContentType, Portfolio};

use crate::error::EngineResult;
use crate::prompt;

use super::{embed_text, AnalyzerContext, Outcome};

/// Synthesize and persist one portfolio's analysis.
pub async fn analyze_portfolio(
    ctx: &AnalyzerContext,
    portfolio: &Portfolio,
) -> EngineResult<Outcome> {
    if portfolio.analysis_status == AnalysisStatus::Success || portfolio.is_analyzed() {
        debug!(portfolio_id = %portfolio.id, "Portfolio already analyzed, skipping");
        return Ok(Outcome::SkippedDone);
    }

    let child_analyses: Vec<String> = ctx
        .projects
        .list_successful_for_portfolio(&portfolio.id)
        .await?
        .into_iter()
        .filter_map(|p| p.ai_analysis)
        .collect();
    if child_analyses.is_empty() {
        debug!(
            portfolio_id = %portfolio.id,
            "No successful project analyses yet, leaving untouched"
        );
        return Ok(Outcome::SkippedNothing);
    }

    ctx.portfolios
        .update_status(&portfolio.id, AnalysisStatus::Processing, None)
        .await?;

    match run(ctx, portfolio, &child_analyses).await {
        Ok(()) => {
            info!(
                portfolio_id = %portfolio.id,
                children = child_analyses.len(),
                "Portfolio synthesis complete"
            );
            Ok(Outcome::Analyzed)
        }
        Err(e) => {
            if let Err(write_err) = ctx
                .portfolios
                .update_status(&portfolio.id, AnalysisStatus::Failed, Some(e.to_string()))
                .await
            {
                error!(
                    portfolio_id = %portfolio.id,
                    error = %write_err,
                    "Failed to record portfolio failure"
                );
            }
            Err(e)
        }
    }
}

async fn run(
    ctx: &AnalyzerContext,
    portfolio: &Portfolio,
    child_analyses: &[String],
) -> EngineResult<()> {
    let creator = ctx.portfolios.creator_context(&portfolio.creator_id).await?;
    let _permit = ctx.limiter.acquire(ContentType::PortfolioText).await?;

    let input = prompt::portfolio_prompt(&creator, child_analyses);
    let text = ctx.provider.analyze_text(input).await?;
    let embedding = embed_text(ctx, &portfolio.id, &text).await?;

    ctx.portfolios
        .update_analysis(&portfolio.id, text, embedding)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use folio_gemini::MockAnalysisProvider;
    use folio_media::{MediaFetcher, MockExternalDownloader};
    use folio_models::{CreatorContext, Project, EMBEDDING_DIM};
    use folio_store::MemoryStore;

    use crate::config::EngineConfig;
    use crate::rate_limit::RateLimiter;

    fn context(store: Arc<MemoryStore>, provider: MockAnalysisProvider) -> AnalyzerContext {
        let config = EngineConfig::default();
        let fetcher = MediaFetcher::new(
            Arc::new(MockExternalDownloader::new()),
            std::env::temp_dir().join("folio-portfolio-tests"),
            Duration::from_secs(5),
        )
        .unwrap();
        AnalyzerContext {
            jobs: store.clone(),
            images: store.clone(),
            videos: store.clone(),
            projects: store.clone(),
            portfolios: store,
            provider: Arc::new(provider),
            limiter: Arc::new(RateLimiter::new(&config)),
            fetcher: Arc::new(fetcher),
            config,
        }
    }

    async fn seed(store: &MemoryStore) -> Portfolio {
        let portfolio = Portfolio::new("portfolio-1", "creator-1", "My Work");
        store.insert_portfolio(portfolio.clone()).await;
        store
            .insert_creator(
                "creator-1",
                CreatorContext {
                    username: "ada".into(),
                    primary_role: "Motion Designer".into(),
                    bio: "Broadcast work".into(),
                },
            )
            .await;

        let mut project = Project::new("project-1", "Brand Reel", "portfolio-1");
        project.analysis_status = AnalysisStatus::Success;
        project.ai_analysis = Some("a branding project".into());
        project.embedding = Some(vec![0.0; EMBEDDING_DIM]);
        store.insert_project(project).await;

        portfolio
    }

    #[tokio::test]
    async fn test_synthesizes_with_creator_context() {
        let store = Arc::new(MemoryStore::new());
        let portfolio = seed(&store).await;

        let mut provider = MockAnalysisProvider::new();
        provider
            .expect_analyze_text()
            .withf(|input| input.contains("ada") && input.contains("a branding project"))
            .times(1)
            .returning(|_| Ok("a strong motion design portfolio".to_string()));
        provider
            .expect_embed()
            .times(1)
            .returning(|_| Ok(vec![0.5; EMBEDDING_DIM]));

        let ctx = context(store.clone(), provider);
        let outcome = analyze_portfolio(&ctx, &portfolio).await.unwrap();
        assert_eq!(outcome, Outcome::Analyzed);

        let stored = store.portfolio(&portfolio.id).await.unwrap();
        assert_eq!(stored.analysis_status, AnalysisStatus::Success);
        assert!(stored.is_analyzed());
    }

    #[tokio::test]
    async fn test_no_successful_projects_leaves_portfolio_untouched() {
        let store = Arc::new(MemoryStore::new());
        let portfolio = Portfolio::new("portfolio-1", "creator-1", "My Work");
        store.insert_portfolio(portfolio.clone()).await;

        let ctx = context(store.clone(), MockAnalysisProvider::new());
        let outcome = analyze_portfolio(&ctx, &portfolio).await.unwrap();
        assert_eq!(outcome, Outcome::SkippedNothing);

        let stored = store.portfolio(&portfolio.id).await.unwrap();
        assert_eq!(stored.analysis_status, AnalysisStatus::Pending);
    }

    #[tokio::test]
    async fn test_provider_failure_marks_portfolio_failed() {
        let store = Arc::new(MemoryStore::new());
        let portfolio = seed(&store).await;

        let mut provider = MockAnalysisProvider::new();
        provider
            .expect_analyze_text()
            .times(1)
            .returning(|_| Err(folio_gemini::ProviderError::EmptyAnalysis));

        let ctx = context(store.clone(), provider);
        analyze_portfolio(&ctx, &portfolio).await.unwrap_err();

        let stored = store.portfolio(&portfolio.id).await.unwrap();
        assert_eq!(stored.analysis_status, AnalysisStatus::Failed);
        assert!(stored.analysis_error.is_some());
    }
}
