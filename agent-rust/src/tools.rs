use crate::{
    catalog::ClothingItem,
    composer::ComposeResult,
    planner::{OutfitPlan, PlanOptions},
    search::SearchParams,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use stylist_sdk::Tool;

pub const SEARCH_CLOTHES: &str = "search_clothes";
pub const PLAN_OUTFIT: &str = "plan_outfit";
pub const GENERATE_OUTFIT_IMAGE: &str = "generate_outfit_image";

/// A tool invocation requested by the model, decoded from name and arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    SearchClothes(SearchParams),
    PlanOutfit(PlanOptions),
    GenerateOutfitImage(ComposeArgs),
    Unknown(String),
}

impl ToolCall {
    /// Decode a call. Missing or `null` arguments are treated as `{}`; an
    /// unknown name is not an error, but arguments that do not fit a known
    /// tool are.
    pub fn parse(name: &str, args: Value) -> Result<Self, serde_json::Error> {
        let args = if args.is_null() { json!({}) } else { args };
        Ok(match name {
            SEARCH_CLOTHES => Self::SearchClothes(serde_json::from_value(args)?),
            PLAN_OUTFIT => Self::PlanOutfit(serde_json::from_value(args)?),
            GENERATE_OUTFIT_IMAGE => Self::GenerateOutfitImage(serde_json::from_value(args)?),
            other => Self::Unknown(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComposeArgs {
    pub base_photo_url: Option<String>,
    pub outfit: Option<OutfitSelection>,
}

/// Items as the model echoes them back: full objects or bare ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutfitSelection {
    pub tops: Vec<ItemRef>,
    pub bottoms: Vec<ItemRef>,
    pub shoes: Vec<ItemRef>,
    pub socks: Vec<ItemRef>,
    pub accessories: Vec<ItemRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ItemRef {
    Id(String),
    Object {
        #[serde(default)]
        id: Option<String>,
    },
}

impl ItemRef {
    fn id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            Self::Object { id } => id.as_deref(),
        }
    }
}

impl OutfitSelection {
    /// Look every reference up in the catalog by id. References that do not
    /// resolve are dropped.
    #[must_use]
    pub fn resolve(&self, catalog: &[ClothingItem]) -> OutfitPlan {
        let lookup = |refs: &[ItemRef]| -> Vec<ClothingItem> {
            refs.iter()
                .filter_map(ItemRef::id)
                .filter_map(|id| catalog.iter().find(|item| item.id == id))
                .cloned()
                .collect()
        };
        OutfitPlan {
            tops: lookup(&self.tops),
            bottoms: lookup(&self.bottoms),
            shoes: lookup(&self.shoes),
            socks: lookup(&self.socks),
            accessories: lookup(&self.accessories),
            reason: String::new(),
        }
    }
}

/// Function response payload sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolCallResult {
    Items(Vec<ClothingItem>),
    Plan(OutfitPlan),
    Image(ComposeResult),
    Error { error: String },
}

impl ToolCallResult {
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }
}

/// The fixed tool set offered to the model on every call.
#[must_use]
pub fn declarations() -> Vec<Tool> {
    let item_list = json!({ "type": "array", "items": { "type": "object" } });
    vec![
        Tool {
            name: SEARCH_CLOTHES.to_string(),
            description: "Search the wardrobe catalog by free text, color, category or \
                          occasion. Use it to find specific clothes or browse the wardrobe."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free text matched against name, colors, style and tags"
                    },
                    "color": {
                        "type": "string",
                        "description": "Color filter, e.g. blue, black, white"
                    },
                    "category": {
                        "type": "string",
                        "description": "One of top, bottom, dress, outerwear, shoes, accessory, socks, bag"
                    },
                    "occasion": {
                        "type": "string",
                        "description": "One of casual, formal, business, athletic, party, beach, evening"
                    },
                    "limit": {
                        "type": "number",
                        "description": "Maximum number of results (default 10)"
                    }
                }
            }),
        },
        Tool {
            name: PLAN_OUTFIT.to_string(),
            description: "Plan an outfit from the wardrobe for the current weather and an \
                          occasion. Can skip items already worn this week."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "occasion": {
                        "type": "string",
                        "description": "Occasion such as casual, formal, business or athletic (default casual)"
                    },
                    "weatherContext": {
                        "type": "string",
                        "description": "Extra weather context from the user"
                    },
                    "excludeWornThisWeek": {
                        "type": "boolean",
                        "description": "Skip items worn this week (default false)"
                    }
                }
            }),
        },
        Tool {
            name: GENERATE_OUTFIT_IMAGE.to_string(),
            description: "Render a photo of the user wearing an outfit. Call it right after \
                          plan_outfit with the planned items."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "basePhotoUrl": {
                        "type": "string",
                        "description": "Locator of the user's base photo. Defaults to the registered photo"
                    },
                    "outfit": {
                        "type": "object",
                        "description": "Outfit from plan_outfit or search_clothes",
                        "properties": {
                            "tops": item_list,
                            "bottoms": item_list,
                            "shoes": item_list,
                            "socks": item_list,
                            "accessories": item_list
                        }
                    }
                }
            }),
        },
    ]
}
