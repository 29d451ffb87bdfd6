//! Builds the outbound audit request and binds the model's answer to the typed report.

use std::sync::Arc;

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::llm::AnalysisClient;
use crate::radar::VisualError;
use crate::report::{parse_report, SchemaViolation, SeoReportData};

/// Shown for every transport or schema failure; the two are only told apart in logs.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Failed to analyze the website. Please check the URL or try again later.";
const INVALID_URL_MESSAGE: &str = "Please enter a valid website URL.";

const SYSTEM_INSTRUCTION: &str = "\
You are a senior technical SEO consultant. Review the website at the given URL and produce a \
thorough, actionable audit in the exact JSON shape declared by the response schema.

Cover five pillars:
1. On-Page SEO: title tag, meta description, heading hierarchy (H1-H6), content quality and \
relevance, keyword usage, image SEO including alt text.
2. Technical SEO: mobile friendliness, URL structure and canonicals, structured data (schema \
markup), HTTPS redirects, robots.txt.
3. Performance: Core Web Vitals (LCP, INP, CLS), overall site speed, asset optimization \
(image compression, CSS/JS minification), browser caching policy.
4. Backlinks: live link data is unavailable, so estimate backlink profile strength and domain \
authority from the site's niche, brand recognition and content.
5. Social Presence: links to major social platforms and Open Graph tags for sharing.

For every factor give an integer score from 0 to 100, an analysis of its current state and why \
it matters, and one concrete recommendation. Include corrected code for technical items such \
as structured data.

Then give an overall integer score from 0 to 100 and the five most impactful recommendations, \
each with a priority of High, Medium or Low and the category it belongs to, ordered by impact.

Do not fetch or browse the live site. Base the audit on existing knowledge and simulate what \
a crawl with standard SEO tooling would have found. Respond with JSON only.";

/// URL problems caught before the model is contacted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("no URL was provided")]
    Empty,
    #[error("`{input}` is not a valid URL: {reason}")]
    Invalid { input: String, reason: String },
    #[error("unsupported URL scheme `{scheme}` (expected http or https)")]
    UnsupportedScheme { scheme: String },
}

/// Failures of a single analysis submission.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("analysis request failed: {0:#}")]
    Transport(anyhow::Error),
    #[error("analysis response failed validation: {0}")]
    Schema(#[from] SchemaViolation),
    #[error("validated report could not be visualised: {0}")]
    Visual(#[from] VisualError),
    #[error("an analysis is already in progress")]
    Busy,
}

impl AnalysisError {
    /// Text for the end user. Transport and schema failures share one message.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Input(_) => INVALID_URL_MESSAGE,
            Self::Busy => "An analysis is already running.",
            Self::Transport(_) | Self::Schema(_) | Self::Visual(_) => GENERIC_FAILURE_MESSAGE,
        }
    }
}

/// Check that `input` is an absolute http(s) URL with a host.
pub fn validate_url(input: &str) -> Result<Url, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    let url = Url::parse(trimmed).map_err(|err| InputError::Invalid {
        input: trimmed.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InputError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(InputError::Invalid {
            input: trimmed.to_string(),
            reason: "missing host".into(),
        });
    }
    Ok(url)
}

/// Everything a provider needs to ask for one audit. Each provider attaches the
/// response schema in its own dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub url: String,
    pub system_instruction: String,
    pub prompt: String,
}

impl AnalysisRequest {
    pub fn for_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            prompt: format!("Perform a complete SEO audit of the website at this URL: {url}"),
        }
    }
}

/// Runs one analysis against a client: build, send, validate.
#[derive(Clone)]
pub struct Analyzer {
    client: Arc<dyn AnalysisClient>,
}

impl Analyzer {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn analyze(&self, url: &str) -> Result<SeoReportData, AnalysisError> {
        let url = validate_url(url)?;
        let request = AnalysisRequest::for_url(url.as_str());
        info!(url = %request.url, "starting analysis");
        debug!(
            prompt_chars = request.prompt.len() + request.system_instruction.len(),
            "analysis request built"
        );

        let raw = self.client.generate(&request).await.map_err(|err| {
            warn!(error = %format!("{err:#}"), "analysis transport failed");
            AnalysisError::Transport(err)
        })?;

        let report = parse_report(&raw).map_err(|violation| {
            warn!(%violation, "analysis response rejected");
            AnalysisError::Schema(violation)
        })?;
        info!(overall_score = report.overall_score, "analysis complete");
        Ok(report)
    }
}
