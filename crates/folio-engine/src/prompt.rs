//! Prompt construction for the analysis provider.
//!
//! Prompts are deliberately plain: describe the asset, or synthesize over
//! child analyses joined with a visible separator. Synthesis prompts never
//! re-derive from raw media.

use folio_models::CreatorContext;

/// Separator between child analyses in synthesis prompts.
pub const ANALYSIS_SEPARATOR: &str = "\n\n---\n\n";

/// Prompt sent alongside image bytes.
pub fn image_prompt() -> String {
    "Analyze this portfolio image. Describe the subject, medium, style, \
     composition, and notable techniques. Write a dense, factual analysis \
     suitable for search indexing."
        .to_string()
}

/// Prompt sent alongside an uploaded or inlined video.
pub fn video_prompt() -> String {
    "Analyze this portfolio video. Describe the content, pacing, editing \
     style, visual techniques, and production quality. Write a dense, \
     factual analysis suitable for search indexing."
        .to_string()
}

/// Synthesis prompt over a project's successful media analyses.
pub fn project_prompt(title: &str, description: &str, child_analyses: &[String]) -> String {
    let mut prompt = format!(
        "Synthesize a single cohesive analysis of the project \"{title}\" \
         from the media analyses below. Summarize themes, skills, and style. \
         Do not invent details absent from the analyses.\n"
    );
    if !description.is_empty() {
        prompt.push_str(&format!("\nProject description: {description}\n"));
    }
    prompt.push_str("\nMedia analyses:");
    prompt.push_str(ANALYSIS_SEPARATOR);
    prompt.push_str(&child_analyses.join(ANALYSIS_SEPARATOR));
    prompt
}

/// Synthesis prompt over a portfolio's successful project analyses,
/// grounded in the creator's profile.
pub fn portfolio_prompt(creator: &CreatorContext, child_analyses: &[String]) -> String {
    let mut prompt = format!(
        "Synthesize a single cohesive analysis of the creator's portfolio \
         from the project analyses below. Characterize their overall body of \
         work, strengths, and style.\n\nCreator: {}",
        creator.username
    );
    if !creator.primary_role.is_empty() {
        prompt.push_str(&format!("\nPrimary role: {}", creator.primary_role));
    }
    if !creator.bio.is_empty() {
        prompt.push_str(&format!("\nBio: {}", creator.bio));
    }
    prompt.push_str("\n\nProject analyses:");
    prompt.push_str(ANALYSIS_SEPARATOR);
    prompt.push_str(&child_analyses.join(ANALYSIS_SEPARATOR));
    prompt
}
