//! Project synthesis.
//!
//! A project's analysis is synthesized from its currently successful child
//! media analyses, including results from prior job runs. With no
//! successful children the project is left untouched; having nothing to
//! synthesize yet is not a failure.

use tracing::{debug, error, info};

use folio_models::{AnalysisStatus, ContentType, Project};

use crate::error::EngineResult;
use crate::prompt;

use super::{embed_text, AnalyzerContext, Outcome};

/// Synthesize and persist one project's analysis.
pub async fn analyze_project(ctx: &AnalyzerContext, project: &Project) -> EngineResult<Outcome> {
    if project.analysis_status == AnalysisStatus::Success || project.is_analyzed() {
        debug!(project_id = %project.id, "Project already analyzed, skipping");
        return Ok(Outcome::SkippedDone);
    }

    let child_analyses = successful_media_analyses(ctx, &project.id).await?;
    if child_analyses.is_empty() {
        debug!(project_id = %project.id, "No successful media analyses yet, leaving untouched");
        return Ok(Outcome::SkippedNothing);
    }

    ctx.projects
        .update_status(&project.id, AnalysisStatus::Processing, None)
        .await?;

    match run(ctx, project, &child_analyses).await {
        Ok(()) => {
            info!(
                project_id = %project.id,
                children = child_analyses.len(),
                "Project synthesis complete"
            );
            Ok(Outcome::Analyzed)
        }
        Err(e) => {
            if let Err(write_err) = ctx
                .projects
                .update_status(&project.id, AnalysisStatus::Failed, Some(e.to_string()))
                .await
            {
                error!(
                    project_id = %project.id,
                    error = %write_err,
                    "Failed to record project failure"
                );
            }
            Err(e)
        }
    }
}

async fn run(
    ctx: &AnalyzerContext,
    project: &Project,
    child_analyses: &[String],
) -> EngineResult<()> {
    let _permit = ctx.limiter.acquire(ContentType::ProjectText).await?;

    let input = prompt::project_prompt(&project.title, &project.description, child_analyses);
    let text = ctx.provider.analyze_text(input).await?;
    let embedding = embed_text(ctx, &project.id, &text).await?;

    ctx.projects
        .update_analysis(&project.id, text, embedding)
        .await?;
    Ok(())
}

/// Analysis texts of all currently successful media under a project.
async fn successful_media_analyses(
    ctx: &AnalyzerContext,
    project_id: &str,
) -> EngineResult<Vec<String>> {
    let mut analyses = Vec::new();
    for image in ctx.images.list_successful_for_project(project_id).await? {
        if let Some(text) = image.ai_analysis {
            analyses.push(text);
        }
    }
    for video in ctx.videos.list_successful_for_project(project_id).await? {
        if let Some(text) = video.ai_analysis {
            analyses.push(text);
        }
    }
    Ok(analyses)
}
