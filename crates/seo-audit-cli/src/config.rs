use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, File};
use seo_audit_core::LlmSettings;
use serde::Deserialize;

/// Optional settings file passed with `--config`.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub llm: LlmSection,
    pub export: ExportSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSection {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Humantime string such as `"45s"` or `"2m"`.
    pub timeout: Option<String>,
    pub timeout_secs: Option<u64>,
    pub fixture: Option<PathBuf>,
    pub debug: Option<bool>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportSection {
    pub out_dir: Option<PathBuf>,
    pub base_name: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        Config::builder()
            .add_source(File::from(path))
            .build()
            .and_then(Config::try_deserialize::<FileConfig>)
            .with_context(|| format!("failed to load config from {}", path.display()))
    }
}

impl LlmSection {
    /// Express the section as environment-style pairs so it can sit underneath the
    /// real environment.
    pub fn to_env_map(&self) -> Result<HashMap<String, String>> {
        let mut vars = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                vars.insert(key.to_string(), value);
            }
        };
        put(LlmSettings::PROVIDER_ENV, self.provider.clone());
        put(LlmSettings::API_KEY_ENV, self.api_key.clone());
        put(LlmSettings::ENDPOINT_ENV, self.endpoint.clone());
        put(LlmSettings::MODEL_ENV, self.model.clone());
        put(
            LlmSettings::FIXTURE_ENV,
            self.fixture.as_ref().map(|p| p.display().to_string()),
        );
        put(LlmSettings::DEBUG_ENV, self.debug.map(|d| d.to_string()));

        let timeout = match &self.timeout {
            Some(raw) => {
                let duration = humantime::parse_duration(raw)
                    .with_context(|| format!("invalid llm.timeout `{raw}`"))?;
                // Partial seconds round up so a short timeout never turns into none.
                Some(duration.as_secs() + u64::from(duration.subsec_nanos() > 0))
            }
            None => self.timeout_secs,
        };
        put(LlmSettings::TIMEOUT_ENV, timeout.map(|secs| secs.to_string()));
        Ok(vars)
    }
}

/// Build provider settings: config file first, environment on top.
pub fn resolve_settings(file: &FileConfig) -> Result<LlmSettings> {
    let defaults = file.llm.to_env_map()?;
    LlmSettings::from_sources(defaults, std::env::vars().collect())
}
