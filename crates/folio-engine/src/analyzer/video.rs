//! Video analysis.
//!
//! Videos are downloaded to a scratch file first (platform videos go
//! through yt-dlp, storage-hosted ones are streamed). The scratch file is
//! removed on every exit path; the provider decides between inlining and
//! its file API based on size.

use tracing::{debug, error, info};

use folio_media::resolve_video_source;
use folio_models::{AnalysisStatus, ContentType, VideoAsset};

use crate::error::EngineResult;
use crate::prompt;

use super::{embed_text, AnalyzerContext, Outcome};

/// Analyze one video, persisting text + embedding on success.
pub async fn analyze_video(ctx: &AnalyzerContext, video: &VideoAsset) -> EngineResult<Outcome> {
    if video.analysis_status == AnalysisStatus::Success || video.is_analyzed() {
        debug!(video_id = %video.id, "Video already analyzed, skipping");
        return Ok(Outcome::SkippedDone);
    }

    ctx.videos
        .update_status(&video.id, AnalysisStatus::Processing, None)
        .await?;

    match run(ctx, video).await {
        Ok(()) => {
            info!(video_id = %video.id, "Video analysis complete");
            Ok(Outcome::Analyzed)
        }
        Err(e) => {
            if let Err(write_err) = ctx
                .videos
                .update_status(&video.id, AnalysisStatus::Failed, Some(e.to_string()))
                .await
            {
                error!(video_id = %video.id, error = %write_err, "Failed to record video failure");
            }
            Err(e)
        }
    }
}

async fn run(ctx: &AnalyzerContext, video: &VideoAsset) -> EngineResult<()> {
    let source = resolve_video_source(video)?;
    let _permit = ctx.limiter.acquire(ContentType::Video).await?;

    let scratch = ctx.fetcher.download_to_scratch(&source).await?;
    let result = analyze_file(ctx, &scratch).await;
    scratch.cleanup().await;

    let (text, embedding) = result?;
    ctx.videos
        .update_analysis(&video.id, text, embedding)
        .await?;
    Ok(())
}

async fn analyze_file(
    ctx: &AnalyzerContext,
    scratch: &folio_media::ScratchFile,
) -> EngineResult<(String, Vec<f32>)> {
    let text = ctx
        .provider
        .analyze_video(scratch.path(), prompt::video_prompt())
        .await?;
    let embedding = embed_text(ctx, &scratch.path().display().to_string(), &text).await?;
    Ok((text, embedding))
}
