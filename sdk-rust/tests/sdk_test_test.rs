use serde_json::json;
use stylist_sdk::{
    sdk_test::{MockGenerateResult, MockLanguageModel},
    LanguageModel, LanguageModelError, LanguageModelInput, Message, ModelResponse, Part,
};

fn user_input(text: &str) -> LanguageModelInput {
    LanguageModelInput {
        messages: vec![Message::user(vec![Part::text(text)])],
        ..LanguageModelInput::default()
    }
}

#[tokio::test]
async fn mock_language_model_tracks_generate_inputs_and_returns_results() {
    let model = MockLanguageModel::new();

    let response1 = ModelResponse {
        content: vec![Part::text("Hello, world!")],
        ..ModelResponse::default()
    };
    let response3 = ModelResponse {
        content: vec![Part::text("Goodbye, world!")],
        ..ModelResponse::default()
    };

    model
        .enqueue_generate(response1.clone())
        .enqueue_generate(MockGenerateResult::error(LanguageModelError::InvalidInput(
            "generate error".to_string(),
        )))
        .enqueue_generate(response3.clone());

    let input1 = user_input("Hi");
    let res1 = model
        .generate(input1.clone())
        .await
        .expect("first generate should succeed");
    assert_eq!(res1, response1);
    assert_eq!(model.tracked_generate_inputs(), vec![input1]);

    let err = model
        .generate(user_input("Error"))
        .await
        .expect_err("second generate should fail");
    assert!(matches!(err, LanguageModelError::InvalidInput(msg) if msg == "generate error"));

    let res3 = model
        .generate(user_input("Bye"))
        .await
        .expect("third generate should succeed");
    assert_eq!(res3, response3);
    assert_eq!(model.generate_calls(), 3);

    model.restore();
    assert!(model.tracked_generate_inputs().is_empty());
}

#[tokio::test]
async fn mock_language_model_errors_when_queue_is_empty() {
    let model = MockLanguageModel::new();
    let err = model
        .generate(user_input("Hi"))
        .await
        .expect_err("no results were enqueued");
    assert!(matches!(err, LanguageModelError::Invariant("mock", _)));
}

#[test]
fn model_response_helpers_extract_text_and_tool_calls() {
    let response = ModelResponse {
        content: vec![
            Part::text("  First "),
            Part::tool_call("c1", "search_clothes", json!({"color": "blue"})),
            Part::text(""),
            Part::tool_call("c2", "plan_outfit", json!({})),
            Part::text("second"),
        ],
        ..ModelResponse::default()
    };

    assert_eq!(response.text(), "First second");
    let calls = response.tool_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].tool_name, "search_clothes");
    assert!(response.first_image().is_none());
}
