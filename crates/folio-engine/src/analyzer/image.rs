//! Image analysis.

use tracing::{debug, error, info};

use folio_media::resolve_image_url;
use folio_models::{AnalysisStatus, ContentType, ImageAsset};

use crate::error::EngineResult;
use crate::prompt;

use super::{embed_text, AnalyzerContext, Outcome};

/// Analyze one image, persisting text + embedding on success.
pub async fn analyze_image(ctx: &AnalyzerContext, image: &ImageAsset) -> EngineResult<Outcome> {
    if image.analysis_status == AnalysisStatus::Success || image.is_analyzed() {
        debug!(image_id = %image.id, "Image already analyzed, skipping");
        return Ok(Outcome::SkippedDone);
    }

    ctx.images
        .update_status(&image.id, AnalysisStatus::Processing, None)
        .await?;

    match run(ctx, image).await {
        Ok(()) => {
            info!(image_id = %image.id, "Image analysis complete");
            Ok(Outcome::Analyzed)
        }
        Err(e) => {
            if let Err(write_err) = ctx
                .images
                .update_status(&image.id, AnalysisStatus::Failed, Some(e.to_string()))
                .await
            {
                error!(image_id = %image.id, error = %write_err, "Failed to record image failure");
            }
            Err(e)
        }
    }
}

async fn run(ctx: &AnalyzerContext, image: &ImageAsset) -> EngineResult<()> {
    let url = resolve_image_url(image)?;
    let _permit = ctx.limiter.acquire(ContentType::Image).await?;

    let (bytes, mime) = ctx.fetcher.fetch_bytes(&url).await?;
    let text = ctx
        .provider
        .analyze_image(bytes, mime, prompt::image_prompt())
        .await?;
    let embedding = embed_text(ctx, image.id.as_str(), &text).await?;

    ctx.images
        .update_analysis(&image.id, text, embedding)
        .await?;
    Ok(())
}
