use std::fs;
use std::path::{Path, PathBuf};

use crate::library::DEFAULT_STORAGE_KEY;

pub const API_KEY_ENV: &str = "QUIZMASTER_API_KEY";

/// Settings for the quiz generation service.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of the `models/{model}:generateContent` API.
    pub endpoint: String,
    pub model: String,
    pub question_count: usize,
    pub option_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            question_count: 5,
            option_count: 4,
            api_key: None,
        }
    }
}

impl GeneratorConfig {
    pub fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    /// Key the quiz collection is stored under.
    pub storage_key: String,
    /// Directory used by the file backend.
    pub data_dir: PathBuf,
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir: PathBuf::from(".quizmaster"),
            generator: GeneratorConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Fills in the generator API key from [`API_KEY_ENV`] unless the file already set one.
    pub fn with_api_key_from_env(mut self) -> Self {
        if self.generator.api_key.is_none() {
            self.generator.api_key = std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, Config::default());
        assert_eq!(config.storage_key, "quizmaster_quizzes");
        assert_eq!(config.generator.question_count, 5);
    }

    #[test]
    fn partial_generator_section_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            data_dir = "/tmp/quizzes"

            [generator]
            model = "gemini-2.0-flash"
            question_count = 10
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.data_dir, PathBuf::from("/tmp/quizzes"));
        assert_eq!(config.generator.model, "gemini-2.0-flash");
        assert_eq!(config.generator.question_count, 10);
        assert_eq!(config.generator.option_count, 4);
        assert_eq!(
            config.generator.request_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let root = tempfile::tempdir().expect("temporary directory should be created");
        let error = Config::load(root.path().join("missing.toml")).expect_err("file is absent");

        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reads_file() {
        let root = tempfile::tempdir().expect("temporary directory should be created");
        let path = root.path().join("quizmaster.toml");
        fs::write(&path, "storage_key = \"custom\"\n").expect("config should be written");

        let config = Config::load(&path).expect("config should load");
        assert_eq!(config.storage_key, "custom");
    }
}
