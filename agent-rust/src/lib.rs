pub mod catalog;
pub mod composer;
pub mod config;
mod errors;
pub mod events;
pub mod memory;
mod orchestrator;
pub mod planner;
pub mod run;
pub mod search;
pub mod storage;
pub mod tools;
pub mod weather;

pub use catalog::{ClothingItem, PersonPhoto};
pub use composer::{ComposeResult, ImageComposer};
pub use config::{ConfigError, StylistConfig};
pub use errors::AgentError;
pub use events::{CallbackListener, RunEvent, RunListener, RunStream};
pub use memory::{WeeklyLogEntry, WeeklyMemory};
pub use orchestrator::{
    Orchestrator, OrchestratorParams, EMPTY_CATALOG_REPLY, MAX_STEPS_REPLY, NO_RESPONSE_REPLY,
};
pub use planner::{OutfitPlan, PlanOptions};
pub use search::SearchParams;
pub use weather::{WeatherCondition, WeatherProvider, WeatherSnapshot};
