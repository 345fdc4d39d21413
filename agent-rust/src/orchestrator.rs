use crate::{
    catalog::ClothingItem,
    composer::{ComposeResult, ImageComposer},
    config::{StylistConfig, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_MAX_STEPS},
    events::{RunEvent, RunListener, RunStream},
    memory::{Clock, WeeklyLogEntry, WeeklyMemory},
    planner::{self, OutfitPlan},
    run::{RunContext, Step, Transcript},
    search,
    storage::{LocalStorage, Storage},
    tools::{self, ComposeArgs, ToolCall, ToolCallResult},
    weather::{OpenMeteoClient, WeatherProvider, WeatherSnapshot},
    AgentError,
};
use std::sync::Arc;
use stylist_sdk::{
    google::{GoogleModel, GoogleModelOptions},
    LanguageModel, LanguageModelInput, ToolCallPart,
};
use tracing::info_span;
use tracing_futures::Instrument;

pub const EMPTY_CATALOG_REPLY: &str = "Your wardrobe catalog is empty. Click **Index Wardrobe** \
     in the header to scan and index your clothes from the data/ folder, then ask again.";
pub const MAX_STEPS_REPLY: &str = "I reached the maximum number of steps. Please try again.";
pub const NO_RESPONSE_REPLY: &str = "I couldn't generate a response. Try indexing your wardrobe \
     first (Index Wardrobe button), and ensure you have photos in data/me/.";

const DEFAULT_IMAGE_NOTE: &str =
    "generation failed - run Index Wardrobe to index data/me/ photos";
const IMAGE_ALREADY_GENERATED: &str = "An image for this outfit was already generated.";

/// Drives the tool-calling conversation for one user message at a time.
/// Runs share nothing but the weekly log in storage.
pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    composer: ImageComposer,
    weather: Arc<dyn WeatherProvider>,
    memory: WeeklyMemory,
    storage: Arc<dyn Storage>,
    latitude: f64,
    longitude: f64,
    max_steps: usize,
}

/// Parameters required to create an orchestrator.
/// # Default Values
/// - `image_model`: the conversation model
/// - `weather`: `OpenMeteoClient`
/// - `clock`: local calendar day
/// - `latitude` / `longitude`: -33.8688 / 18.4793
/// - `max_steps`: 8
pub struct OrchestratorParams {
    /// Model that decides which tools to call.
    pub model: Arc<dyn LanguageModel>,
    /// Image-capable model used for composites.
    pub image_model: Option<Arc<dyn LanguageModel>>,
    pub storage: Arc<dyn Storage>,
    pub weather: Option<Arc<dyn WeatherProvider>>,
    pub clock: Option<Clock>,
    pub latitude: f64,
    pub longitude: f64,
    /// Max number of model calls per run.
    pub max_steps: usize,
}

impl OrchestratorParams {
    pub fn new(model: Arc<dyn LanguageModel>, storage: Arc<dyn Storage>) -> Self {
        Self {
            model,
            image_model: None,
            storage,
            weather: None,
            clock: None,
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the model used for image composition
    #[must_use]
    pub fn image_model(mut self, image_model: Arc<dyn LanguageModel>) -> Self {
        self.image_model = Some(image_model);
        self
    }

    /// Set the weather provider
    #[must_use]
    pub fn weather(mut self, weather: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(weather);
        self
    }

    /// Set the clock that decides "today" for the weekly log
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the coordinates used for weather
    #[must_use]
    pub fn location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    /// Set the max steps
    #[must_use]
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn build(self) -> Orchestrator {
        Orchestrator::new(self)
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(params: OrchestratorParams) -> Self {
        let OrchestratorParams {
            model,
            image_model,
            storage,
            weather,
            clock,
            latitude,
            longitude,
            max_steps,
        } = params;

        let image_model = image_model.unwrap_or_else(|| model.clone());
        let memory = match clock {
            Some(clock) => WeeklyMemory::with_clock(storage.clone(), clock),
            None => WeeklyMemory::new(storage.clone()),
        };

        Self {
            model,
            composer: ImageComposer::new(image_model, storage.clone()),
            weather: weather.unwrap_or_else(|| Arc::new(OpenMeteoClient::default())),
            memory,
            storage,
            latitude,
            longitude,
            max_steps,
        }
    }

    pub fn builder(model: Arc<dyn LanguageModel>, storage: Arc<dyn Storage>) -> OrchestratorParams {
        OrchestratorParams::new(model, storage)
    }

    /// Gemini models for conversation and images, local files under the data
    /// directory, Open-Meteo weather.
    #[must_use]
    pub fn from_config(config: &StylistConfig) -> Self {
        let options = GoogleModelOptions {
            api_key: config.api_key.clone(),
            ..Default::default()
        };
        let model: Arc<dyn LanguageModel> =
            Arc::new(GoogleModel::new(config.model.clone(), options.clone()));
        let image_model: Arc<dyn LanguageModel> =
            Arc::new(GoogleModel::new(config.image_model.clone(), options));

        Self::builder(model, Arc::new(LocalStorage::new(config.data_dir.clone())))
            .image_model(image_model)
            .location(config.latitude, config.longitude)
            .max_steps(config.max_steps)
            .build()
    }

    /// [`Orchestrator::from_config`] over [`StylistConfig::from_env`].
    pub fn from_env() -> Result<Self, AgentError> {
        let config = StylistConfig::from_env()?;
        Ok(Self::from_config(&config))
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    #[must_use]
    pub fn memory(&self) -> &WeeklyMemory {
        &self.memory
    }

    #[must_use]
    pub fn composer(&self) -> &ImageComposer {
        &self.composer
    }

    /// Answer one user message. Every outcome other than an empty message is
    /// reply text, including model and weather failures.
    pub async fn run(
        &self,
        message: &str,
        catalog: &[ClothingItem],
        listener: &dyn RunListener,
    ) -> Result<String, AgentError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let span = info_span!(
            "stylist.run",
            model_id = %self.model.model_id(),
            catalog_items = catalog.len(),
        );

        async move {
            listener.on_log("Processing your request...");

            if catalog.is_empty() {
                return Ok(EMPTY_CATALOG_REPLY.to_string());
            }

            if let Err(error) = self.memory.reset_if_new_week().await {
                tracing::warn!(%error, "failed to reset weekly log");
            }
            let weekly_log = self.memory.get().await;

            let weather = match self.weather.current(self.latitude, self.longitude).await {
                Ok(weather) => weather,
                Err(error) => {
                    tracing::warn!(%error, "weather fetch failed");
                    return Ok(fatal_reply(&AgentError::from(error)));
                }
            };

            let system_prompt = system_prompt(&weather, &weekly_log);
            let mut ctx = RunContext::new(
                Transcript::new(message),
                self.max_steps,
                self.memory.today(),
                weekly_log,
            );

            let mut step = Step::AwaitingModel;
            let reply = loop {
                step = match step {
                    Step::AwaitingModel => {
                        if ctx.begin_iteration() {
                            let input = LanguageModelInput {
                                system_prompt: Some(system_prompt.clone()),
                                messages: ctx.transcript.messages().to_vec(),
                                tools: Some(tools::declarations()),
                                ..Default::default()
                            };
                            match self.model.generate(input).await {
                                Ok(response) => Step::Deciding(response),
                                Err(error) => {
                                    tracing::warn!(%error, "model call failed");
                                    Step::Done(fatal_reply(&AgentError::from(error)))
                                }
                            }
                        } else {
                            tracing::warn!(max_steps = ctx.max_steps, "step ceiling reached");
                            Step::Done(MAX_STEPS_REPLY.to_string())
                        }
                    }
                    Step::Deciding(response) => Step::decide(&response),
                    Step::Dispatch(call) => {
                        let span = info_span!(
                            "stylist.tool",
                            tool = %call.tool_name,
                            iteration = ctx.iterations,
                        );
                        let result = self
                            .dispatch(&call, catalog, &weather, &mut ctx, listener)
                            .instrument(span)
                            .await;
                        ctx.transcript.push_exchange(call, &result);
                        Step::AwaitingModel
                    }
                    Step::Finalizing(text) => {
                        Step::Done(self.finalize(text, &mut ctx, listener).await)
                    }
                    Step::Done(reply) => break reply,
                };
            };

            tracing::info!(iterations = ctx.iterations, "run finished");
            Ok(reply)
        }
        .instrument(span)
        .await
    }

    /// Run in a background task, reporting progress and the outcome as
    /// [`RunEvent`]s.
    pub fn run_stream(self: Arc<Self>, message: String, catalog: Vec<ClothingItem>) -> RunStream {
        let (listener, stream) = RunStream::channel();
        let listener = Arc::new(listener);

        tokio::spawn(async move {
            let run_listener = listener.clone();
            let handle = tokio::spawn(async move {
                self.run(&message, &catalog, run_listener.as_ref()).await
            });
            let event = match handle.await {
                Ok(Ok(reply)) => RunEvent::Done { reply },
                Ok(Err(error)) => RunEvent::Error {
                    error: error.to_string(),
                },
                Err(error) => RunEvent::Error {
                    error: AgentError::Invariant(format!("run task failed: {error}")).to_string(),
                },
            };
            listener.send(event);
        });

        stream
    }

    async fn dispatch(
        &self,
        call: &ToolCallPart,
        catalog: &[ClothingItem],
        weather: &WeatherSnapshot,
        ctx: &mut RunContext,
        listener: &dyn RunListener,
    ) -> ToolCallResult {
        listener.on_log(&format!("Calling tool: {}...", call.tool_name));

        let tool_call = match ToolCall::parse(&call.tool_name, call.args.clone()) {
            Ok(tool_call) => tool_call,
            Err(error) => {
                tracing::warn!(%error, "malformed tool arguments");
                return ToolCallResult::error(format!(
                    "Invalid arguments for {}: {error}",
                    call.tool_name
                ));
            }
        };

        match tool_call {
            ToolCall::SearchClothes(params) => {
                ToolCallResult::Items(search::search(catalog, &params))
            }
            ToolCall::PlanOutfit(options) => {
                let plan = planner::plan(catalog, weather, &ctx.weekly_log, &options);
                self.commit(&plan, ctx).await;
                ctx.last_plan = Some(plan.clone());
                ToolCallResult::Plan(plan)
            }
            ToolCall::GenerateOutfitImage(args) => {
                ToolCallResult::Image(self.compose_requested(args, catalog, ctx, listener).await)
            }
            ToolCall::Unknown(name) => ToolCallResult::error(format!("Unknown tool: {name}")),
        }
    }

    /// Record a plan's items as worn today. Failures are logged and dropped.
    async fn commit(&self, plan: &OutfitPlan, ctx: &mut RunContext) {
        let ids = plan.item_ids();
        if ids.is_empty() {
            return;
        }
        ctx.record_worn(&ids);
        if let Err(error) = self.memory.append(ctx.today, &ids).await {
            tracing::warn!(%error, "failed to record worn items");
        }
    }

    async fn compose_requested(
        &self,
        args: ComposeArgs,
        catalog: &[ClothingItem],
        ctx: &mut RunContext,
        listener: &dyn RunListener,
    ) -> ComposeResult {
        if let Some(locator) = &ctx.image_locator {
            return ComposeResult {
                locator: locator.clone(),
                success: true,
                message: Some(IMAGE_ALREADY_GENERATED.to_string()),
            };
        }

        let mut outfit = args
            .outfit
            .map(|selection| selection.resolve(catalog))
            .unwrap_or_default();
        if outfit.tops.is_empty() {
            if let Some(plan) = &ctx.last_plan {
                outfit = plan.clone();
            }
        }

        listener.on_log("Generating outfit image...");
        let result = self
            .composer
            .compose(&outfit, args.base_photo_url.as_deref())
            .await;
        record_image(&result, ctx, listener);
        result
    }

    async fn finalize(&self, text: String, ctx: &mut RunContext, listener: &dyn RunListener) -> String {
        if !ctx.image_generated() && listener.receives_images() {
            if let Some(plan) = ctx.last_plan.clone() {
                listener.on_log("Generating outfit image...");
                let result = self.composer.compose(&plan, None).await;
                record_image(&result, ctx, listener);
            }
        }

        if !text.is_empty() {
            if let Some(error) = ctx.last_image_error.as_deref().filter(|_| !ctx.image_generated()) {
                listener.on_log(&format!("Image generation failed: {error}"));
            }
            return text;
        }

        let Some(plan) = &ctx.last_plan else {
            return NO_RESPONSE_REPLY.to_string();
        };
        let names = plan.item_names();
        let mut reply = format!("I suggest wearing: {}. {}", names.join(", "), plan.reason);
        if !names.is_empty() && !ctx.image_generated() {
            let note = ctx.last_image_error.as_deref().unwrap_or(DEFAULT_IMAGE_NOTE);
            reply.push_str(&format!("\n\n(Image: {note})"));
        }
        reply.trim().to_string()
    }
}

fn record_image(result: &ComposeResult, ctx: &mut RunContext, listener: &dyn RunListener) {
    if result.success && !result.locator.is_empty() {
        ctx.image_locator = Some(result.locator.clone());
        ctx.last_image_error = None;
        listener.on_image(&result.locator);
    } else {
        let message = result
            .message
            .clone()
            .unwrap_or_else(|| "Image generation failed".to_string());
        tracing::warn!(%message, "image composition failed");
        ctx.last_image_error = Some(message);
    }
}

fn system_prompt(weather: &WeatherSnapshot, weekly_log: &[WeeklyLogEntry]) -> String {
    let worn = weekly_log
        .iter()
        .map(|entry| format!("{}: {}", entry.date, entry.worn_item_ids.join(", ")))
        .collect::<Vec<_>>();
    let worn = if worn.is_empty() {
        "nothing yet".to_string()
    } else {
        worn.join("; ")
    };

    format!(
        "You are a personal fashion assistant. You help the user pick outfits from their wardrobe.
{}
Items worn this week: {worn}.
When suggesting outfits, consider the weather and avoid repeating recently worn items.
You have access to: search_clothes, plan_outfit, generate_outfit_image.

IMPORTANT: When the user asks what to wear, or when you suggest an outfit, you MUST:
1. Call plan_outfit to get the outfit suggestion.
2. Then IMMEDIATELY call generate_outfit_image with that outfit. Do not skip this step.
The user wants to SEE themselves wearing the outfit.",
        weather.summary()
    )
}

/// User-facing text for failures that end a run.
fn fatal_reply(error: &AgentError) -> String {
    match error {
        AgentError::LanguageModel(inner) => {
            format!("Something went wrong: {inner}. Check your GOOGLE_API_KEY and try again.")
        }
        AgentError::Weather(inner) => {
            format!("I couldn't get the current weather ({inner}). Please try again in a moment.")
        }
        other => format!("Something went wrong: {other}."),
    }
}
