use std::{collections::VecDeque, sync::Mutex};

use crate::{
    errors::{LanguageModelError, LanguageModelResult},
    language_model::LanguageModel,
    LanguageModelInput, ModelResponse,
};

/// Result for a mocked `generate` call.
/// It can either be a full response or an error to return.
pub enum MockGenerateResult {
    Response(ModelResponse),
    Error(LanguageModelError),
}

impl MockGenerateResult {
    /// Construct a result that yields the provided response.
    pub fn response(response: ModelResponse) -> Self {
        Self::Response(response)
    }

    /// Construct a result that yields the provided error.
    pub fn error(error: LanguageModelError) -> Self {
        Self::Error(error)
    }
}

impl From<ModelResponse> for MockGenerateResult {
    fn from(response: ModelResponse) -> Self {
        Self::response(response)
    }
}

impl From<LanguageModelError> for MockGenerateResult {
    fn from(error: LanguageModelError) -> Self {
        Self::error(error)
    }
}

#[derive(Default)]
struct MockLanguageModelState {
    mocked_generate_results: VecDeque<MockGenerateResult>,
    tracked_generate_inputs: Vec<LanguageModelInput>,
}

/// A mock language model for testing that tracks inputs and yields predefined
/// outputs.
pub struct MockLanguageModel {
    provider: &'static str,
    model_id: String,
    state: Mutex<MockLanguageModelState>,
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self {
            provider: "mock",
            model_id: "mock-model".to_string(),
            state: Mutex::new(MockLanguageModelState::default()),
        }
    }
}

impl MockLanguageModel {
    /// Construct a new mock language model instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the model identifier returned by the mock.
    pub fn set_model_id<S: Into<String>>(&mut self, model_id: S) {
        self.model_id = model_id.into();
    }

    /// Enqueue one or more mocked generate results.
    pub fn enqueue_generate_results<I>(&self, results: I) -> &Self
    where
        I: IntoIterator<Item = MockGenerateResult>,
    {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.mocked_generate_results.extend(results);
        drop(state);
        self
    }

    /// Convenience to enqueue a single mocked generate result.
    pub fn enqueue_generate<R>(&self, result: R) -> &Self
    where
        R: Into<MockGenerateResult>,
    {
        self.enqueue_generate_results(std::iter::once(result.into()))
    }

    /// Retrieve the tracked generate inputs accumulated so far.
    pub fn tracked_generate_inputs(&self) -> Vec<LanguageModelInput> {
        let state = self.state.lock().expect("mock state poisoned");
        state.tracked_generate_inputs.clone()
    }

    /// Number of `generate` calls received so far.
    pub fn generate_calls(&self) -> usize {
        let state = self.state.lock().expect("mock state poisoned");
        state.tracked_generate_inputs.len()
    }

    /// Clear both tracked inputs and enqueued results.
    pub fn restore(&self) {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.mocked_generate_results.clear();
        state.tracked_generate_inputs.clear();
    }
}

#[async_trait::async_trait]
impl LanguageModel for MockLanguageModel {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.tracked_generate_inputs.push(input);

        let result = state.mocked_generate_results.pop_front().ok_or_else(|| {
            LanguageModelError::Invariant(
                self.provider,
                "no mocked generate results available".into(),
            )
        })?;

        match result {
            MockGenerateResult::Response(response) => Ok(response),
            MockGenerateResult::Error(error) => Err(error),
        }
    }
}
