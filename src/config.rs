use thiserror::Error;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "knowledge_base";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

/// Immutable application configuration, built once at startup and passed by
/// reference to every component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub qdrant_url: String,
    pub qdrant_collection: String,
    pub gemini_model: String,
    pub embedding_model: String,
    pub max_output_tokens: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let google_api_key = lookup("GOOGLE_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;

        let max_output_tokens = match lookup("MAX_OUTPUT_TOKENS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::Invalid("MAX_OUTPUT_TOKENS", raw))?,
            None => DEFAULT_MAX_OUTPUT_TOKENS,
        };

        Ok(Self {
            google_api_key,
            qdrant_url: lookup("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_collection: lookup("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            gemini_model: lookup("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            embedding_model: lookup("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            max_output_tokens,
        })
    }
}

/// Initializes the tracing subscriber. `LOG_LEVEL=debug` enables debug-level
/// output, everything else stays at info.
pub fn init_tracing() {
    let level = match std::env::var("LOG_LEVEL").as_deref() {
        Ok("debug") => "debug",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let vars = env(&[("GOOGLE_API_KEY", "test-key")]);
        let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(config.google_api_key, "test-key");
        assert_eq!(config.qdrant_url, DEFAULT_QDRANT_URL);
        assert_eq!(config.qdrant_collection, "knowledge_base");
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.embedding_model, "text-embedding-004");
        assert_eq!(config.max_output_tokens, 2048);
    }

    #[test]
    fn test_missing_api_key() {
        let vars = env(&[("QDRANT_URL", "http://qdrant:6334")]);
        let err = Config::from_lookup(|name| vars.get(name).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GOOGLE_API_KEY")));
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let vars = env(&[("GOOGLE_API_KEY", "   ")]);
        let err = Config::from_lookup(|name| vars.get(name).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GOOGLE_API_KEY")));
    }

    #[test]
    fn test_overrides() {
        let vars = env(&[
            ("GOOGLE_API_KEY", "k"),
            ("QDRANT_URL", "http://remote:6334"),
            ("QDRANT_COLLECTION_NAME", "docs"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("MAX_OUTPUT_TOKENS", "512"),
        ]);
        let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
        assert_eq!(config.qdrant_url, "http://remote:6334");
        assert_eq!(config.qdrant_collection, "docs");
        assert_eq!(config.gemini_model, "gemini-1.5-pro");
        assert_eq!(config.max_output_tokens, 512);
    }

    #[test]
    fn test_invalid_max_tokens() {
        let vars = env(&[("GOOGLE_API_KEY", "k"), ("MAX_OUTPUT_TOKENS", "lots")]);
        let err = Config::from_lookup(|name| vars.get(name).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MAX_OUTPUT_TOKENS", _)));
    }
}
