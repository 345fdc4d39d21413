use crate::storage::{Storage, StorageError, CATALOG_FILE, PERSON_PHOTOS_FILE};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Top,
    Bottom,
    Dress,
    Outerwear,
    Shoes,
    Accessory,
    Socks,
    Bag,
}

impl Category {
    pub const ALL: [Self; 8] = [
        Self::Top,
        Self::Bottom,
        Self::Dress,
        Self::Outerwear,
        Self::Shoes,
        Self::Accessory,
        Self::Socks,
        Self::Bag,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Dress => "dress",
            Self::Outerwear => "outerwear",
            Self::Shoes => "shoes",
            Self::Accessory => "accessory",
            Self::Socks => "socks",
            Self::Bag => "bag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    Casual,
    Formal,
    Business,
    Athletic,
    Party,
    Beach,
    Evening,
}

impl Occasion {
    pub const ALL: [Self; 7] = [
        Self::Casual,
        Self::Formal,
        Self::Business,
        Self::Athletic,
        Self::Party,
        Self::Beach,
        Self::Evening,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Formal => "formal",
            Self::Business => "business",
            Self::Athletic => "athletic",
            Self::Party => "party",
            Self::Beach => "beach",
            Self::Evening => "evening",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl FromStr for Occasion {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Occasion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cataloged garment. The JSON shape matches `catalog.json` as written by
/// the indexing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingItem {
    /// Stable id derived from the image's storage path.
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(rename = "color")]
    pub primary_color: String,
    /// Primary color first.
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(
        rename = "occasion",
        default,
        deserialize_with = "deserialize_known_occasions"
    )]
    pub occasions: Vec<Occasion>,
    #[serde(default)]
    pub style: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

fn deserialize_known_occasions<'de, D>(deserializer: D) -> Result<Vec<Occasion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    let mut occasions = Vec::with_capacity(raw.len());
    for occasion in raw.iter().filter_map(|o| o.parse::<Occasion>().ok()) {
        if !occasions.contains(&occasion) {
            occasions.push(occasion);
        }
    }
    Ok(occasions)
}

/// A registered photo of the user, used as the base for composites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPhoto {
    pub id: String,
    pub path: String,
    pub image_url: String,
}

/// Derive the catalog id for an image from its path relative to the data
/// directory, e.g. `baggy jeans/Blue Pair.jpg` -> `baggy_jeans_Blue_Pair`.
#[must_use]
pub fn item_id_from_path(relative_path: &str) -> String {
    let replaced: String = relative_path
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_whitespace() { '_' } else { c })
        .collect();
    let without_extension = match replaced.rfind('.') {
        Some(idx) if idx + 1 < replaced.len() => &replaced[..idx],
        _ => replaced.as_str(),
    };
    without_extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Load the wardrobe snapshot. Absent or malformed catalogs read as empty.
pub async fn load_catalog(storage: &dyn Storage) -> Vec<ClothingItem> {
    load_json_list(storage, CATALOG_FILE).await
}

/// Load registered person photos. Absent or malformed files read as empty.
pub async fn load_person_photos(storage: &dyn Storage) -> Vec<PersonPhoto> {
    load_json_list(storage, PERSON_PHOTOS_FILE).await
}

async fn load_json_list<T: DeserializeOwned>(storage: &dyn Storage, path: &str) -> Vec<T> {
    let bytes = match storage.read(path).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => return Vec::new(),
        Err(error) => {
            tracing::warn!(%path, %error, "failed to read file, treating as empty");
            return Vec::new();
        }
    };
    let records: Vec<Value> = match serde_json::from_slice(&bytes) {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!(%path, %error, "malformed file, treating as empty");
            return Vec::new();
        }
    };

    // A record that does not fit is skipped; the rest still load.
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(error) => {
                tracing::warn!(%path, index, %error, "skipping malformed record");
                None
            }
        })
        .collect()
}
