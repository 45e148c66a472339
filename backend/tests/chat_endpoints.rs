//! Endpoint tests for chat streaming, transcripts, and titles.

#[expect(
    dead_code,
    reason = "Shared harness has helpers used only by other suites."
)]
#[path = "support/mod.rs"]
mod support;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use backend::domain::TITLE_MODEL;
use backend::domain::ports::{CompletionError, StreamEvent};
use rstest::rstest;
use serde_json::{Value, json};

use support::{StreamScript, harness, init_app, login};

fn turn_request(chat_id: &str, text: &str) -> Value {
    json!({
        "id": chat_id,
        "messages": [{ "role": "user", "content": text }],
        "model": "openai/gpt-4o",
        "credential": "sk-test",
    })
}

/// Split an SSE body into its decoded `data:` payloads.
fn sse_events(body: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(body)
        .split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(|payload| serde_json::from_str(payload).expect("frame is JSON"))
        .collect()
}

#[rstest]
fn first_turn_streams_and_persists_both_messages() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        fixture.backend.push_stream(StreamScript::Events(vec![
            Ok(StreamEvent::TextDelta("Hel".to_owned())),
            Ok(StreamEvent::TextDelta("lo".to_owned())),
            Ok(StreamEvent::Usage {
                prompt_tokens: 9,
                completion_tokens: 2,
            }),
            Ok(StreamEvent::Done),
        ]));
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chat-messages")
                .cookie(cookie.clone())
                .set_json(turn_request("weekend-plans", "Hello there"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|value| value.to_str().ok()),
            Some("text/event-stream")
        );

        let events = sse_events(&test::read_body(response).await);
        let types: Vec<&str> = events
            .iter()
            .map(|event| event["type"].as_str().expect("typed frame"))
            .collect();
        assert_eq!(types, vec!["text-delta", "text-delta", "usage", "done"]);
        assert!(
            events.last().expect("done frame")["messageId"].is_string(),
            "a clean finish persists the assistant message"
        );

        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/chats/weekend-plans")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let transcript: Value = test::read_body_json(response).await;
        let messages = transcript["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "Hello");

        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/chats/recent")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let listing: Value = test::read_body_json(response).await;
        assert_eq!(listing["pagination"]["total"], 1);
        assert_eq!(listing["data"][0]["id"], "weekend-plans");
        assert_eq!(listing["data"][0]["title"], "");
    });
}

#[rstest]
fn transcripts_are_scoped_to_their_owner() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        fixture.backend.push_stream(StreamScript::Events(vec![
            Ok(StreamEvent::TextDelta("hi".to_owned())),
            Ok(StreamEvent::Done),
        ]));
        let app = init_app(fixture.state.clone()).await;
        let owner = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chat-messages")
                .cookie(owner.clone())
                .set_json(turn_request("private-chat", "hello"))
                .to_request(),
        )
        .await;
        test::read_body(response).await;

        let stranger = login(&app).await;
        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/chats/private-chat")
                .cookie(stranger.clone())
                .to_request(),
        )
        .await;
        // Reads never reveal whether a foreign chat exists.
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = test::call_service(
            &app,
            TestRequest::delete()
                .uri("/api/v1/chats/private-chat")
                .cookie(stranger)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = test::call_service(
            &app,
            TestRequest::delete()
                .uri("/api/v1/chats/private-chat")
                .cookie(owner.clone())
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/chats/private-chat")
                .cookie(owner)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    });
}

#[rstest]
fn mid_stream_failures_travel_in_band_and_skip_persistence() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        fixture.backend.push_stream(StreamScript::Events(vec![
            Ok(StreamEvent::TextDelta("Hi".to_owned())),
            Err(CompletionError::transport("connection reset")),
        ]));
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chat-messages")
                .cookie(cookie.clone())
                .set_json(turn_request("flaky-chat", "hello"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let events = sse_events(&test::read_body(response).await);
        assert_eq!(
            events.last().expect("final frame")["type"],
            "error",
            "failures after the stream starts arrive as error frames"
        );

        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/chats/flaky-chat")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let transcript: Value = test::read_body_json(response).await;
        assert_eq!(
            transcript["messages"].as_array().expect("messages").len(),
            1,
            "only the user message is persisted after a failed stream"
        );
    });
}

#[rstest]
fn rejected_credentials_fail_before_the_stream_starts() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        fixture
            .backend
            .push_stream(StreamScript::Fail(CompletionError::BadCredential));
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chat-messages")
                .cookie(cookie)
                .set_json(turn_request("some-chat", "hello"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    });
}

#[rstest]
#[case(json!({
    "id": "c1", "messages": [{ "role": "user", "content": "hi" }],
    "model": "  ", "credential": "sk",
}))]
#[case(json!({
    "id": "c1", "messages": [], "model": "openai/gpt-4o", "credential": "sk",
}))]
#[case(json!({
    "id": "c1", "messages": [{ "role": "assistant", "content": "hi" }],
    "model": "openai/gpt-4o", "credential": "sk",
}))]
fn malformed_turns_are_rejected(#[case] payload: Value) {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chat-messages")
                .cookie(cookie)
                .set_json(payload)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    });
}

#[rstest]
fn title_generation_uses_the_title_model_and_persists() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        fixture.backend.push_stream(StreamScript::Events(vec![
            Ok(StreamEvent::TextDelta("sure".to_owned())),
            Ok(StreamEvent::Done),
        ]));
        fixture
            .backend
            .push_completion(Ok("\"Weekend in Rome\"".to_owned()));
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chat-messages")
                .cookie(cookie.clone())
                .set_json(turn_request("rome-trip", "Plan a weekend in Rome"))
                .to_request(),
        )
        .await;
        test::read_body(response).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chats/rome-trip/title")
                .cookie(cookie.clone())
                .set_json(json!({ "credential": "sk-test" }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["title"], "Weekend in Rome");

        let title_request = fixture
            .backend
            .requests()
            .into_iter()
            .next_back()
            .expect("title request recorded");
        assert_eq!(title_request.model, TITLE_MODEL);

        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/chats/recent")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let listing: Value = test::read_body_json(response).await;
        assert_eq!(listing["data"][0]["title"], "Weekend in Rome");
    });
}

#[rstest]
fn title_generation_swallows_upstream_failures() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        fixture.backend.push_stream(StreamScript::Events(vec![
            Ok(StreamEvent::TextDelta("ok".to_owned())),
            Ok(StreamEvent::Done),
        ]));
        fixture
            .backend
            .push_completion(Err(CompletionError::transport("upstream down")));
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chat-messages")
                .cookie(cookie.clone())
                .set_json(turn_request("quiet-chat", "hello"))
                .to_request(),
        )
        .await;
        test::read_body(response).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/chats/quiet-chat/title")
                .cookie(cookie)
                .set_json(json!({ "credential": "sk-test" }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert!(body["title"].is_null(), "title generation is best effort");
    });
}
