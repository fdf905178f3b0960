//! Integration tests for the chat session against the builtin tool set
//!
//! The LLM provider is scripted and the device bridge is mocked, but the
//! tool registry, schema validation, and session loop are the real thing.
//! These tests pin down the conversation contract:
//! - Tool results travel back to the model in a "Tool results:" message
//! - Device commands reach the bridge exactly once per requested toggle
//! - Invalid tool arguments never reach the bridge

use archi::bridge::{DeviceBridge, DeviceId};
use archi::config::LlmSettings;
use archi::llm::{CompletionResponse, LlmProvider};
use archi::sensor_log::SensorReading;
use archi::session::ChatSession;
use archi::testing::{text_response, tool_call_response, MockDeviceBridge, MockLlmProvider};
use archi::tools::ToolRegistry;
use serde_json::json;
use std::sync::Arc;

fn harness(
    responses: Vec<CompletionResponse>,
) -> (ChatSession, Arc<MockLlmProvider>, Arc<MockDeviceBridge>) {
    let bridge = Arc::new(MockDeviceBridge::new());
    let registry = ToolRegistry::with_builtins(
        Arc::clone(&bridge) as Arc<dyn DeviceBridge>,
        "tvly-test-key",
    )
    .expect("builtin registry");

    let provider = Arc::new(MockLlmProvider::new(responses));
    let session = ChatSession::new(
        Arc::clone(&provider) as Arc<dyn LlmProvider>,
        Arc::new(registry),
        &LlmSettings::default(),
    );
    (session, provider, bridge)
}

#[tokio::test]
async fn test_temperature_question_round_trip() {
    let (mut session, provider, bridge) = harness(vec![
        tool_call_response("get_current_temperature", json!({})),
        text_response("It is 21.5 °C inside."),
    ]);
    bridge.set_reading(Some(SensorReading::now(21.5)));

    let answer = session.run_turn("how warm is it inside?").await.unwrap();
    assert_eq!(answer, "It is 21.5 °C inside.");

    let requests = provider.received_requests();
    assert_eq!(requests.len(), 2);

    let feedback = &requests[1].messages.last().unwrap().content;
    assert!(feedback.starts_with("Tool results:"));
    assert!(feedback.contains("Tool get_current_temperature returned:"));
    assert!(feedback.contains("21.5"));
}

#[tokio::test]
async fn test_temperature_question_without_reading() {
    let (mut session, provider, _bridge) = harness(vec![
        tool_call_response("get_current_temperature", json!({})),
        text_response("I have no reading yet."),
    ]);

    let answer = session.run_turn("how warm is it?").await.unwrap();
    assert_eq!(answer, "I have no reading yet.");

    let requests = provider.received_requests();
    let feedback = &requests[1].messages.last().unwrap().content;
    assert!(feedback.contains("No temperature reading has been received yet"));
}

#[tokio::test]
async fn test_toggle_twice_commands_bridge_twice() {
    let (mut session, provider, bridge) = harness(vec![
        tool_call_response("toggle_device1", json!({"state": true})),
        text_response("Device 1 is on."),
        tool_call_response("toggle_device1", json!({"state": false})),
        text_response("Device 1 is off."),
    ]);

    session.run_turn("turn on device 1").await.unwrap();
    session.run_turn("now turn it off").await.unwrap();

    assert_eq!(
        bridge.device_commands(),
        vec![(DeviceId::Device1, true), (DeviceId::Device1, false)],
        "each toggle must reach the bridge exactly once"
    );

    let requests = provider.received_requests();
    assert!(requests[1]
        .messages
        .last()
        .unwrap()
        .content
        .contains("Device 1 is turned on"));
    assert!(requests[3]
        .messages
        .last()
        .unwrap()
        .content
        .contains("Device 1 is turned off"));
}

#[tokio::test]
async fn test_display_character_flows_to_bridge() {
    let (mut session, _provider, bridge) = harness(vec![
        tool_call_response("set_character", json!({"character": "A"})),
        text_response("Done, the display shows A."),
    ]);

    let answer = session.run_turn("show an A on the display").await.unwrap();
    assert_eq!(answer, "Done, the display shows A.");
    assert_eq!(bridge.displayed_characters(), vec!['A']);
}

#[tokio::test]
async fn test_invalid_tool_arguments_never_reach_the_bridge() {
    let (mut session, provider, bridge) = harness(vec![
        tool_call_response("toggle_device1", json!({"state": "yes"})),
        text_response("Sorry, I mangled that."),
    ]);

    session.run_turn("turn on device 1").await.unwrap();

    assert!(
        bridge.device_commands().is_empty(),
        "a command with a bad schema must not be published"
    );

    let requests = provider.received_requests();
    let feedback = &requests[1].messages.last().unwrap().content;
    assert!(feedback.contains("Tool toggle_device1 failed"));
    assert!(feedback.contains("Please fix your mistakes"));
}

#[tokio::test]
async fn test_publish_failure_is_reported_to_model() {
    let (mut session, provider, bridge) = harness(vec![
        tool_call_response("toggle_device1", json!({"state": true})),
        text_response("The device did not respond."),
    ]);
    bridge.set_publish_failure(true);

    let answer = session.run_turn("turn on device 1").await.unwrap();
    assert_eq!(answer, "The device did not respond.");
    assert!(bridge.device_commands().is_empty());

    let requests = provider.received_requests();
    let feedback = &requests[1].messages.last().unwrap().content;
    assert!(feedback.contains("Tool toggle_device1 failed"));
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let (mut first, _p1, _b1) = harness(vec![text_response("Noted.")]);
    let (second, _p2, _b2) = harness(vec![text_response("unused")]);

    assert_ne!(first.id(), second.id());

    first.run_turn("remember the couch is blue").await.unwrap();

    assert_eq!(first.history().len(), 3);
    assert_eq!(
        second.history().len(),
        1,
        "a turn in one session must not leak into another"
    );
}

#[tokio::test]
async fn test_failed_turn_keeps_user_message() {
    let (mut session, _provider, _bridge) = {
        let bridge = Arc::new(MockDeviceBridge::new());
        let registry = ToolRegistry::with_builtins(
            Arc::clone(&bridge) as Arc<dyn DeviceBridge>,
            "tvly-test-key",
        )
        .unwrap();
        let provider = Arc::new(MockLlmProvider::with_failure());
        let session = ChatSession::new(
            Arc::clone(&provider) as Arc<dyn LlmProvider>,
            Arc::new(registry),
            &LlmSettings::default(),
        );
        (session, provider, bridge)
    };

    let result = session.run_turn("hello?").await;
    assert!(result.is_err());

    // The user message stays in history, so a later retry has context.
    assert_eq!(session.history().len(), 2);
    assert!(session.history()[1].content.contains("hello?"));
}
