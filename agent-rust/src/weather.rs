use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1";
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m,precipitation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Foggy,
    Rainy,
    Snowy,
    Stormy,
    Variable,
}

impl WeatherCondition {
    /// Map a WMO weather interpretation code onto the closed vocabulary.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Clear,
            1..=3 => Self::PartlyCloudy,
            45..=48 => Self::Foggy,
            51..=67 | 80..=82 => Self::Rainy,
            71..=77 => Self::Snowy,
            95.. => Self::Stormy,
            _ => Self::Variable,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::PartlyCloudy => "partly_cloudy",
            Self::Foggy => "foggy",
            Self::Rainy => "rainy",
            Self::Snowy => "snowy",
            Self::Stormy => "stormy",
            Self::Variable => "variable",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current conditions at the user's location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub condition: WeatherCondition,
    pub humidity_pct: f64,
    pub wind_speed_kph: f64,
    pub precipitation_mm: f64,
}

impl WeatherSnapshot {
    /// One-line description embedded in the system directive.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Current weather: {}°C, {}. Humidity: {}%, wind: {} km/h.",
            self.temperature_c, self.condition, self.humidity_pct, self.wind_speed_kph
        );
        if self.precipitation_mm > 0.0 {
            summary.push_str(&format!(
                " Precipitation: {} mm. Suggest rain-appropriate clothing.",
                self.precipitation_mm
            ));
        }
        summary
    }
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Weather API error: {0}")]
    StatusCode(reqwest::StatusCode),
    #[error("Malformed weather response: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, WeatherError>;
}

/// Open-Meteo forecast client. No API key required.
pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl OpenMeteoClient {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: OPEN_METEO_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    weather_code: i64,
    wind_speed_10m: f64,
    precipitation: f64,
}

impl From<CurrentConditions> for WeatherSnapshot {
    fn from(current: CurrentConditions) -> Self {
        Self {
            temperature_c: current.temperature_2m,
            condition: WeatherCondition::from_code(current.weather_code),
            humidity_pct: current.relative_humidity_2m,
            wind_speed_kph: current.wind_speed_10m,
            precipitation_mm: current.precipitation,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!("{}/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeatherError::StatusCode(response.status()));
        }

        let body = response.bytes().await?;
        let forecast: ForecastResponse = serde_json::from_slice(&body)?;
        Ok(forecast.current.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_conditions() {
        let cases = [
            (0, WeatherCondition::Clear),
            (2, WeatherCondition::PartlyCloudy),
            (45, WeatherCondition::Foggy),
            (61, WeatherCondition::Rainy),
            (75, WeatherCondition::Snowy),
            (81, WeatherCondition::Rainy),
            (96, WeatherCondition::Stormy),
            (10, WeatherCondition::Variable),
            (85, WeatherCondition::Variable),
        ];
        for (code, expected) in cases {
            assert_eq!(WeatherCondition::from_code(code), expected, "code {code}");
        }
    }

    #[test]
    fn summary_mentions_rain_only_when_precipitating() {
        let mut snapshot = WeatherSnapshot {
            temperature_c: 15.0,
            condition: WeatherCondition::Rainy,
            humidity_pct: 80.0,
            wind_speed_kph: 12.5,
            precipitation_mm: 1.2,
        };
        assert_eq!(
            snapshot.summary(),
            "Current weather: 15°C, rainy. Humidity: 80%, wind: 12.5 km/h. \
             Precipitation: 1.2 mm. Suggest rain-appropriate clothing."
        );

        snapshot.precipitation_mm = 0.0;
        assert!(!snapshot.summary().contains("Precipitation"));
    }

    #[test]
    fn forecast_payload_converts_to_snapshot() {
        let payload = r#"{"current":{"time":"2024-01-02T10:00","temperature_2m":21.4,
            "relative_humidity_2m":55,"weather_code":3,"wind_speed_10m":9.1,"precipitation":0.0}}"#;
        let forecast: ForecastResponse = serde_json::from_str(payload).unwrap();
        let snapshot = WeatherSnapshot::from(forecast.current);
        assert_eq!(snapshot.condition, WeatherCondition::PartlyCloudy);
        assert!((snapshot.temperature_c - 21.4).abs() < f64::EPSILON);
    }
}
