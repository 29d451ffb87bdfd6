use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{AnalysisClient, LlmSettings};
use crate::analysis::AnalysisRequest;

/// Answers every request with the contents of a saved response file.
#[derive(Debug, Clone)]
pub struct FixtureClient {
    path: PathBuf,
}

impl FixtureClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let path = settings.fixture_path.clone().with_context(|| {
            format!(
                "fixture provider requires {} to be set",
                LlmSettings::FIXTURE_ENV
            )
        })?;
        Ok(Self { path })
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AnalysisClient for FixtureClient {
    async fn generate(&self, request: &AnalysisRequest) -> Result<String> {
        debug!(path = %self.path.display(), url = %request.url, "replaying fixture response");
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read fixture {}", self.path.display()))
    }
}
