use std::{path::PathBuf, str::FromStr};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-exp-image-generation";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_LATITUDE: f64 = -33.8688;
pub const DEFAULT_LONGITUDE: f64 = 18.4793;
pub const DEFAULT_MAX_STEPS: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set. Get a key at https://aistudio.google.com/apikey")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, usually read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct StylistConfig {
    pub api_key: String,
    /// Model driving the conversation.
    pub model: String,
    /// Image-capable model used for composites.
    pub image_model: String,
    /// Root of catalog, photos, weekly log and generated images.
    pub data_dir: PathBuf,
    pub latitude: f64,
    pub longitude: f64,
    pub max_steps: usize,
}

impl StylistConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("GOOGLE_API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;

        Ok(Self {
            api_key,
            model: get("STYLIST_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            image_model: get("STYLIST_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            data_dir: get("STYLIST_DATA_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
            latitude: parse(get("STYLIST_LATITUDE"), "STYLIST_LATITUDE", DEFAULT_LATITUDE)?,
            longitude: parse(get("STYLIST_LONGITUDE"), "STYLIST_LONGITUDE", DEFAULT_LONGITUDE)?,
            max_steps: parse(get("STYLIST_MAX_STEPS"), "STYLIST_MAX_STEPS", DEFAULT_MAX_STEPS)?,
        })
    }
}

fn parse<T: FromStr>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = StylistConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.max_steps, 8);
        assert!((config.latitude - DEFAULT_LATITUDE).abs() < f64::EPSILON);
    }

    #[test]
    fn google_key_wins_and_overrides_parse() {
        let config = StylistConfig::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "g"),
            ("GEMINI_API_KEY", "m"),
            ("STYLIST_MAX_STEPS", "3"),
            ("STYLIST_DATA_DIR", "/srv/wardrobe"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "g");
        assert_eq!(config.max_steps, 3);
        assert_eq!(config.data_dir, PathBuf::from("/srv/wardrobe"));
    }

    #[test]
    fn missing_key_and_bad_numbers_are_errors() {
        assert_eq!(
            StylistConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")])),
            Err(ConfigError::Missing("GOOGLE_API_KEY"))
        );
        assert_eq!(
            StylistConfig::from_lookup(lookup(&[
                ("GOOGLE_API_KEY", "g"),
                ("STYLIST_LATITUDE", "north")
            ])),
            Err(ConfigError::Invalid {
                name: "STYLIST_LATITUDE",
                value: "north".to_string()
            })
        );
    }
}
