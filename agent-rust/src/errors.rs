use crate::{config::ConfigError, weather::WeatherError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Language model error: {0}")]
    LanguageModel(#[from] stylist_sdk::LanguageModelError),
    #[error("Weather error: {0}")]
    Weather(#[from] WeatherError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Invariant: {0}")]
    Invariant(String),
}
