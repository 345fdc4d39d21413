#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use stylist_agent::{
    catalog::{Category, ClothingItem, Occasion, PersonPhoto},
    memory::Clock,
    storage::{image_locator, MemoryStorage, Storage, StorageError, PERSON_PHOTOS_FILE},
    weather::{WeatherCondition, WeatherError, WeatherProvider, WeatherSnapshot},
};
use stylist_sdk::{ModelResponse, Part};

/// Base64 payload the mock image model returns.
pub const GENERATED_IMAGE_B64: &str = "aGVsbG8gd29ybGQ=";

pub fn item(id: &str, name: &str, category: Category, occasions: &[Occasion]) -> ClothingItem {
    ClothingItem {
        id: id.to_string(),
        name: name.to_string(),
        category,
        primary_color: "blue".to_string(),
        colors: vec!["blue".to_string(), "white".to_string()],
        occasions: occasions.to_vec(),
        style: vec!["classic".to_string()],
        tags: None,
        image_url: image_locator(&format!("{}/{id}.jpg", category.as_str())),
        created_at: DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap(),
    }
}

pub fn sample_catalog() -> Vec<ClothingItem> {
    use Category::*;
    use Occasion::*;
    vec![
        item("top_tee", "White tee", Top, &[Casual]),
        item("top_shirt", "Oxford shirt", Top, &[Business, Formal]),
        item("top_hoodie", "Grey hoodie", Top, &[Casual, Athletic]),
        item("top_polo", "Navy polo", Top, &[Casual]),
        item("bottom_jeans", "Blue jeans", Bottom, &[Casual]),
        item("bottom_chinos", "Beige chinos", Bottom, &[Casual, Business]),
        item("shoes_sneakers", "White sneakers", Shoes, &[Casual]),
        item("socks_ankle", "Ankle socks", Socks, &[Casual, Athletic]),
        item("acc_cap", "Baseball cap", Accessory, &[Casual]),
        item("dress_black", "Black dress", Dress, &[Evening, Party]),
    ]
}

/// Storage holding a photo for every catalog item and a registered person
/// photo.
pub fn seeded_storage(catalog: &[ClothingItem]) -> Arc<MemoryStorage> {
    let storage = MemoryStorage::new();
    for item in catalog {
        if let Some(path) = stylist_agent::storage::path_from_locator(&item.image_url) {
            storage.insert(&path, format!("photo of {}", item.id).into_bytes());
        }
    }
    storage.insert("me/front.png", b"person".to_vec());
    let photos = vec![PersonPhoto {
        id: "me_front".to_string(),
        path: "me/front.png".to_string(),
        image_url: image_locator("me/front.png"),
    }];
    storage.insert(
        PERSON_PHOTOS_FILE,
        serde_json::to_vec(&photos).unwrap(),
    );
    Arc::new(storage)
}

pub fn rainy_weather() -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_c: 15.0,
        condition: WeatherCondition::Rainy,
        humidity_pct: 82.0,
        wind_speed_kph: 14.0,
        precipitation_mm: 0.6,
    }
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn fixed_clock(day: &str) -> Clock {
    let day = date(day);
    Arc::new(move || day)
}

pub fn image_response() -> ModelResponse {
    ModelResponse {
        content: vec![
            Part::text("Here you are"),
            Part::image(GENERATED_IMAGE_B64, "image/png"),
        ],
        ..Default::default()
    }
}

pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![Part::text(text)],
        ..Default::default()
    }
}

pub fn tool_call_response(name: &str, args: serde_json::Value) -> ModelResponse {
    ModelResponse {
        content: vec![Part::tool_call(format!("call_{name}"), name, args)],
        ..Default::default()
    }
}

/// Weather provider returning a fixed snapshot, or failing when none is set.
pub struct StubWeather {
    snapshot: Option<WeatherSnapshot>,
    calls: AtomicUsize,
}

impl StubWeather {
    pub fn new(snapshot: WeatherSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Some(snapshot),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            snapshot: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for StubWeather {
    async fn current(&self, _latitude: f64, _longitude: f64) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.snapshot
            .ok_or(WeatherError::StatusCode(reqwest::StatusCode::SERVICE_UNAVAILABLE))
    }
}

/// Storage that serves reads from an inner store and refuses every write.
pub struct ReadOnlyStorage(pub Arc<MemoryStorage>);

#[async_trait]
impl Storage for ReadOnlyStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.0.read(path).await
    }

    async fn write(&self, path: &str, _data: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Io {
            path: path.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        self.0.list(dir).await
    }
}
