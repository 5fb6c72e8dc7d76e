// src/config.rs
use crate::errors::StudioError;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub max_image_dimension: u32,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_image_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> Result<Self, StudioError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StudioError> {
        let defaults = Self::default();

        let api_url = lookup("STUDIO_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(StudioError::Config(format!(
                "STUDIO_API_URL must be an http(s) URL, got {}",
                api_url
            )));
        }

        let request_timeout = match lookup("STUDIO_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("STUDIO_REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        let max_image_dimension = match lookup("STUDIO_MAX_IMAGE_DIMENSION") {
            Some(raw) => parse_number("STUDIO_MAX_IMAGE_DIMENSION", &raw)?,
            None => defaults.max_image_dimension,
        };

        Ok(Self {
            api_url,
            request_timeout,
            max_image_dimension,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, StudioError> {
    raw.trim()
        .parse()
        .map_err(|_| StudioError::Config(format!("{} must be a number, got {:?}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = StudioConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StudioConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = StudioConfig::from_lookup(lookup(&[
            ("STUDIO_API_URL", "https://studio.example.com/"),
            ("STUDIO_REQUEST_TIMEOUT_SECS", "15"),
            ("STUDIO_MAX_IMAGE_DIMENSION", "2048"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://studio.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.max_image_dimension, 2048);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(StudioConfig::from_lookup(lookup(&[("STUDIO_API_URL", "ftp://x")])).is_err());
        assert!(
            StudioConfig::from_lookup(lookup(&[("STUDIO_REQUEST_TIMEOUT_SECS", "soon")])).is_err()
        );
    }
}
