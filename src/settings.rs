use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::wire::DEFAULT_ENDPOINT_PATH;

pub const ENV_PREFIX: &str = "HURAI_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Http,
    Placeholder,
}

/// Client settings. The credential is deliberately absent: it is never
/// written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub base_url: String,
    pub endpoint_path: String,
    pub provider: ProviderKind,
    pub timeout_secs: u64,
    pub preview_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            provider: ProviderKind::Http,
            timeout_secs: 60,
            preview_dir: None,
        }
    }
}

/// `HURAI_*` environment variables layered over the settings file.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    base_url: Option<String>,
    endpoint_path: Option<String>,
    provider: Option<ProviderKind>,
    timeout_secs: Option<u64>,
    preview_dir: Option<PathBuf>,
}

impl AppSettings {
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint_path.trim_start_matches('/')
        )
    }

    pub fn preview_dir(&self) -> PathBuf {
        self.preview_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("hurai-previews"))
    }

    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(std::env::vars())
    }

    pub fn with_env_from<I>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("failed reading HURAI_* environment overrides")?;

        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        if let Some(endpoint_path) = overrides.endpoint_path {
            self.endpoint_path = endpoint_path;
        }
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if overrides.preview_dir.is_some() {
            self.preview_dir = overrides.preview_dir;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn endpoint_url_joins_without_double_slash() {
        let settings = AppSettings {
            base_url: "https://hurai.example/".into(),
            ..AppSettings::default()
        };
        assert_eq!(
            settings.endpoint_url(),
            "https://hurai.example/api/py/generate-caption"
        );
    }

    #[test]
    fn env_overrides_replace_only_given_fields() {
        let settings = AppSettings::default()
            .with_env_from(vars(&[
                ("HURAI_BASE_URL", "https://hurai.example"),
                ("HURAI_PROVIDER", "placeholder"),
                ("UNRELATED", "x"),
            ]))
            .expect("overrides");

        assert_eq!(settings.base_url, "https://hurai.example");
        assert_eq!(settings.provider, ProviderKind::Placeholder);
        assert_eq!(settings.timeout_secs, 60);
        assert_eq!(settings.endpoint_path, "/api/py/generate-caption");
    }

    #[test]
    fn bad_env_value_is_reported() {
        let err = AppSettings::default()
            .with_env_from(vars(&[("HURAI_TIMEOUT_SECS", "soon")]))
            .expect_err("must fail");
        assert!(err.to_string().contains("HURAI_"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"timeout_secs": 5}"#).expect("parse");
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.base_url, "http://localhost:3000");
    }
}
