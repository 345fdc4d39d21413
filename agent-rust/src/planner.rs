use crate::{
    catalog::{Category, ClothingItem},
    memory::WeeklyLogEntry,
    search::{search, SearchParams},
    weather::{WeatherCondition, WeatherSnapshot},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_OCCASION: &str = "casual";

const COLD_BELOW_C: f64 = 18.0;
const HOT_ABOVE_C: f64 = 28.0;

/// Candidates considered per slot, and how many of them end up in the plan.
struct Slot {
    category: Category,
    limit: usize,
    pick: usize,
}

const TOPS: Slot = Slot { category: Category::Top, limit: 5, pick: 2 };
const BOTTOMS: Slot = Slot { category: Category::Bottom, limit: 5, pick: 1 };
const SHOES: Slot = Slot { category: Category::Shoes, limit: 3, pick: 1 };
const SOCKS: Slot = Slot { category: Category::Socks, limit: 2, pick: 1 };
const ACCESSORIES: Slot = Slot { category: Category::Accessory, limit: 3, pick: 1 };

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanOptions {
    pub occasion: Option<String>,
    /// Extra context from the user, echoed into the reason.
    pub weather_context: Option<String>,
    pub exclude_worn_this_week: Option<bool>,
}

/// A proposed outfit. Slots the wardrobe cannot fill are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitPlan {
    pub tops: Vec<ClothingItem>,
    pub bottoms: Vec<ClothingItem>,
    #[serde(default)]
    pub shoes: Vec<ClothingItem>,
    #[serde(default)]
    pub socks: Vec<ClothingItem>,
    #[serde(default)]
    pub accessories: Vec<ClothingItem>,
    #[serde(default)]
    pub reason: String,
}

impl OutfitPlan {
    /// Every item in slot order.
    pub fn items(&self) -> impl Iterator<Item = &ClothingItem> {
        self.tops
            .iter()
            .chain(&self.bottoms)
            .chain(&self.shoes)
            .chain(&self.socks)
            .chain(&self.accessories)
    }

    #[must_use]
    pub fn item_ids(&self) -> Vec<String> {
        self.items().map(|item| item.id.clone()).collect()
    }

    /// Names of the garments a person would describe as "wearing": accessories
    /// are left out.
    #[must_use]
    pub fn item_names(&self) -> Vec<String> {
        self.tops
            .iter()
            .chain(&self.bottoms)
            .chain(&self.shoes)
            .chain(&self.socks)
            .map(|item| item.name.clone())
            .filter(|name| !name.is_empty())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items().next().is_none()
    }
}

/// Compose an outfit from the catalog. Deterministic for identical inputs.
///
/// Weather buckets only shape the reason text; they do not filter items.
#[must_use]
pub fn plan(
    catalog: &[ClothingItem],
    weather: &WeatherSnapshot,
    weekly_log: &[WeeklyLogEntry],
    options: &PlanOptions,
) -> OutfitPlan {
    let occasion = options
        .occasion
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or(DEFAULT_OCCASION);

    let worn: HashSet<&str> = if options.exclude_worn_this_week.unwrap_or(false) {
        weekly_log
            .iter()
            .flat_map(|entry| entry.worn_item_ids.iter().map(String::as_str))
            .collect()
    } else {
        HashSet::new()
    };

    let fill = |slot: &Slot| -> Vec<ClothingItem> {
        let params = SearchParams {
            category: Some(slot.category.as_str().to_string()),
            occasion: Some(occasion.to_string()),
            limit: Some(usize::MAX),
            ..Default::default()
        };
        search(catalog, &params)
            .into_iter()
            .filter(|item| !worn.contains(item.id.as_str()))
            .take(slot.limit)
            .take(slot.pick)
            .collect()
    };

    OutfitPlan {
        tops: fill(&TOPS),
        bottoms: fill(&BOTTOMS),
        shoes: fill(&SHOES),
        socks: fill(&SOCKS),
        accessories: fill(&ACCESSORIES),
        reason: reason(weather, occasion, options.weather_context.as_deref()),
    }
}

fn reason(weather: &WeatherSnapshot, occasion: &str, context: Option<&str>) -> String {
    let mut reason = format!(
        "Weather: {}°C, {}. Occasion: {occasion}.",
        weather.temperature_c, weather.condition
    );
    if weather.temperature_c < COLD_BELOW_C {
        reason.push_str(" It's cool, so layers help.");
    } else if weather.temperature_c > HOT_ABOVE_C {
        reason.push_str(" It's hot, so keep it light.");
    }
    if weather.precipitation_mm > 0.0 || weather.condition == WeatherCondition::Rainy {
        reason.push_str(" Expect rain.");
    }
    if let Some(context) = context
        .map(|c| c.trim().trim_end_matches('.'))
        .filter(|c| !c.is_empty())
    {
        reason.push_str(&format!(" Note: {context}."));
    }
    reason
}
