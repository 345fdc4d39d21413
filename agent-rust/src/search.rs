use crate::catalog::{Category, ClothingItem, Occasion};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Filters for [`search`]. Blank filters are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Free text matched against name, colors, occasions, style and tags.
    pub query: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub occasion: Option<String>,
    #[serde(deserialize_with = "deserialize_limit")]
    pub limit: Option<usize>,
}

impl SearchParams {
    #[must_use]
    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category.as_str().to_string()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_occasion(mut self, occasion: Occasion) -> Self {
        self.occasion = Some(occasion.as_str().to_string());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// Accepts integers, floats and numeric strings. Anything else means default.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn deserialize_limit<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let limit = match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(limit.and_then(|l| usize::try_from(l).ok()))
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Filter the catalog. Filters compose with AND, results keep catalog order
/// and are truncated to the limit afterwards.
#[must_use]
pub fn search(catalog: &[ClothingItem], params: &SearchParams) -> Vec<ClothingItem> {
    let query = non_blank(params.query.as_ref());
    let color = non_blank(params.color.as_ref());
    let category = non_blank(params.category.as_ref());
    let occasion = non_blank(params.occasion.as_ref());
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    catalog
        .iter()
        .filter(|item| query.as_deref().is_none_or(|q| matches_query(item, q)))
        .filter(|item| color.as_deref().is_none_or(|c| matches_color(item, c)))
        .filter(|item| {
            category
                .as_deref()
                .is_none_or(|c| item.category.as_str() == c)
        })
        .filter(|item| {
            occasion
                .as_deref()
                .is_none_or(|o| item.occasions.iter().any(|occ| occ.as_str().contains(o)))
        })
        .take(limit)
        .cloned()
        .collect()
}

fn matches_query(item: &ClothingItem, query: &str) -> bool {
    contains(&item.name, query)
        || matches_color(item, query)
        || item.occasions.iter().any(|o| o.as_str().contains(query))
        || item.style.iter().any(|s| contains(s, query))
        || item
            .tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| contains(t, query)))
}

fn matches_color(item: &ClothingItem, color: &str) -> bool {
    contains(&item.primary_color, color) || item.colors.iter().any(|c| contains(c, color))
}
