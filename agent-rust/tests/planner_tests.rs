mod common;

use common::{date, item, rainy_weather, sample_catalog};
use stylist_agent::{
    catalog::{Category, Occasion},
    memory::WeeklyLogEntry,
    planner::{plan, PlanOptions},
    weather::{WeatherCondition, WeatherSnapshot},
};

fn ids(items: &[stylist_agent::ClothingItem]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

#[test]
fn plans_single_top_and_bottom_with_weather_reason() {
    let catalog = vec![
        item("tee", "Tee", Category::Top, &[Occasion::Casual]),
        item("jeans", "Jeans", Category::Bottom, &[Occasion::Casual]),
    ];
    let outfit = plan(
        &catalog,
        &rainy_weather(),
        &[],
        &PlanOptions {
            occasion: Some("casual".to_string()),
            ..Default::default()
        },
    );

    assert_eq!(ids(&outfit.tops), vec!["tee"]);
    assert_eq!(ids(&outfit.bottoms), vec!["jeans"]);
    assert!(outfit.shoes.is_empty());
    assert!(outfit.socks.is_empty());
    assert!(outfit.accessories.is_empty());
    assert!(outfit.reason.contains("15"));
    assert!(outfit.reason.contains("rainy"));
    assert!(outfit.reason.contains("casual"));
}

#[test]
fn picks_first_candidates_per_slot_in_catalog_order() {
    let outfit = plan(&sample_catalog(), &rainy_weather(), &[], &PlanOptions::default());

    assert_eq!(ids(&outfit.tops), vec!["top_tee", "top_hoodie"]);
    assert_eq!(ids(&outfit.bottoms), vec!["bottom_jeans"]);
    assert_eq!(ids(&outfit.shoes), vec!["shoes_sneakers"]);
    assert_eq!(ids(&outfit.socks), vec!["socks_ankle"]);
    assert_eq!(ids(&outfit.accessories), vec!["acc_cap"]);
    assert!(outfit.reason.starts_with("Weather: 15°C, rainy. Occasion: casual."));
}

#[test]
fn occasion_filters_every_slot() {
    let outfit = plan(
        &sample_catalog(),
        &rainy_weather(),
        &[],
        &PlanOptions {
            occasion: Some("business".to_string()),
            ..Default::default()
        },
    );
    assert_eq!(ids(&outfit.tops), vec!["top_shirt"]);
    assert_eq!(ids(&outfit.bottoms), vec!["bottom_chinos"]);
    assert!(outfit.shoes.is_empty());
    assert!(outfit.socks.is_empty());
}

#[test]
fn excludes_items_worn_this_week_only_when_asked() {
    let log = vec![WeeklyLogEntry {
        date: date("2024-01-02"),
        worn_item_ids: vec!["top_tee".to_string(), "bottom_jeans".to_string()],
    }];

    let kept = plan(&sample_catalog(), &rainy_weather(), &log, &PlanOptions::default());
    assert_eq!(ids(&kept.tops), vec!["top_tee", "top_hoodie"]);

    let excluded = plan(
        &sample_catalog(),
        &rainy_weather(),
        &log,
        &PlanOptions {
            exclude_worn_this_week: Some(true),
            ..Default::default()
        },
    );
    assert_eq!(ids(&excluded.tops), vec!["top_hoodie", "top_polo"]);
    assert_eq!(ids(&excluded.bottoms), vec!["bottom_chinos"]);
}

#[test]
fn identical_inputs_give_identical_plans() {
    let options = PlanOptions {
        occasion: Some("casual".to_string()),
        weather_context: Some("windy later".to_string()),
        exclude_worn_this_week: Some(true),
    };
    let first = plan(&sample_catalog(), &rainy_weather(), &[], &options);
    let second = plan(&sample_catalog(), &rainy_weather(), &[], &options);
    assert_eq!(first, second);
    assert!(first.reason.contains("windy later"));
}

#[test]
fn reason_notes_heat_and_empty_wardrobe_is_not_an_error() {
    let hot = WeatherSnapshot {
        temperature_c: 31.5,
        condition: WeatherCondition::Clear,
        humidity_pct: 40.0,
        wind_speed_kph: 5.0,
        precipitation_mm: 0.0,
    };
    let outfit = plan(&[], &hot, &[], &PlanOptions::default());
    assert!(outfit.is_empty());
    assert!(outfit.reason.contains("31.5°C, clear"));
    assert!(outfit.reason.contains("hot"));
    assert!(!outfit.reason.contains("rain"));
}
