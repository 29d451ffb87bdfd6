use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Backend that answers analysis requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    /// Replays a saved response from disk.
    Fixture,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Fixture => "fixture",
        }
    }

    fn needs_api_key(self) -> bool {
        !matches!(self, Self::Fixture)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "fixture" => Ok(Self::Fixture),
            other => bail!("unsupported provider `{other}` (expected gemini, openai or fixture)"),
        }
    }
}

/// Environment-driven configuration for the analysis backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Request timeout. `None` means the call may wait indefinitely.
    pub timeout_secs: Option<u64>,
    pub fixture_path: Option<PathBuf>,
    /// Log raw response payloads at debug level.
    pub debug_payloads: bool,
}

impl LlmSettings {
    pub const PROVIDER_ENV: &'static str = "SEO_AUDIT_PROVIDER";
    pub const API_KEY_ENV: &'static str = "SEO_AUDIT_API_KEY";
    pub const ENDPOINT_ENV: &'static str = "SEO_AUDIT_ENDPOINT";
    pub const MODEL_ENV: &'static str = "SEO_AUDIT_MODEL";
    pub const TIMEOUT_ENV: &'static str = "SEO_AUDIT_TIMEOUT_SECS";
    pub const FIXTURE_ENV: &'static str = "SEO_AUDIT_FIXTURE";
    pub const DEBUG_ENV: &'static str = "SEO_AUDIT_DEBUG";

    /// Load settings from environment variables.
    ///
    /// * `SEO_AUDIT_PROVIDER`: `gemini` (default), `openai` or `fixture`.
    /// * `SEO_AUDIT_API_KEY`: API key, required by the network providers.
    /// * `SEO_AUDIT_FIXTURE`: response file, required by the fixture provider.
    pub fn from_env() -> Result<Self> {
        Self::from_map(std::env::vars().collect())
    }

    /// Layer `overrides` on top of `defaults` and load the result. Both maps are keyed
    /// by the environment variable names.
    pub fn from_sources(
        defaults: HashMap<String, String>,
        overrides: HashMap<String, String>,
    ) -> Result<Self> {
        let mut vars = defaults;
        vars.extend(overrides);
        Self::from_map(vars)
    }

    pub fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        let non_empty = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match non_empty(Self::PROVIDER_ENV) {
            Some(value) => value
                .parse::<ProviderKind>()
                .with_context(|| format!("invalid {}", Self::PROVIDER_ENV))?,
            None => ProviderKind::Gemini,
        };
        let api_key = match non_empty(Self::API_KEY_ENV) {
            Some(key) => key,
            None if provider.needs_api_key() => bail!(
                "environment variable {} must be set for the {} provider",
                Self::API_KEY_ENV,
                provider
            ),
            None => String::new(),
        };
        let fixture_path = non_empty(Self::FIXTURE_ENV).map(PathBuf::from);
        if provider == ProviderKind::Fixture && fixture_path.is_none() {
            bail!(
                "environment variable {} must point at a saved response for the fixture provider",
                Self::FIXTURE_ENV
            );
        }
        let timeout_secs = vars
            .get(Self::TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0);
        let debug_payloads = non_empty(Self::DEBUG_ENV)
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(false);

        Ok(Self {
            provider,
            api_key,
            endpoint: non_empty(Self::ENDPOINT_ENV),
            model: non_empty(Self::MODEL_ENV),
            timeout_secs,
            fixture_path,
            debug_payloads,
        })
    }
}
