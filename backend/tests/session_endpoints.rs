//! Endpoint tests for guest sessions and the model catalogue.

#[expect(
    dead_code,
    reason = "Shared harness has helpers used only by other suites."
)]
#[path = "support/mod.rs"]
mod support;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use rstest::rstest;
use serde_json::{Value, json};

use support::{harness, init_app, login};

#[rstest]
fn creating_a_session_mints_a_guest_user() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/session")
                .set_json(json!({}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let has_session_cookie = response
            .response()
            .cookies()
            .any(|cookie| cookie.name() == "session");
        assert!(has_session_cookie, "a session cookie is issued on login");

        let body: Value = test::read_body_json(response).await;
        assert!(body["userId"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(body["displayName"], "Guest");
    });
}

#[rstest]
fn display_names_are_honoured_and_validated() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/session")
                .set_json(json!({ "displayName": "Ada" }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["displayName"], "Ada");

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/session")
                .set_json(json!({ "displayName": "   " }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    });
}

#[rstest]
fn each_login_is_a_distinct_identity() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;

        let mut minted = Vec::new();
        for _ in 0..2 {
            let response = test::call_service(
                &app,
                TestRequest::post()
                    .uri("/api/v1/session")
                    .set_json(json!({}))
                    .to_request(),
            )
            .await;
            let body: Value = test::read_body_json(response).await;
            minted.push(body["userId"].as_str().expect("user id").to_owned());
        }
        minted.dedup();
        assert_eq!(minted.len(), 2, "guest sessions never share identity");
    });
}

#[rstest]
fn deleting_the_session_returns_no_content() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::delete()
                .uri("/api/v1/session")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    });
}

#[rstest]
fn the_model_catalogue_is_public() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;

        let response = test::call_service(
            &app,
            TestRequest::get().uri("/api/v1/models").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        let entries = body.as_array().expect("model list");
        assert!(!entries.is_empty());

        let gpt4o = entries
            .iter()
            .find(|entry| entry["id"] == "openai/gpt-4o")
            .expect("catalogued model");
        assert_eq!(gpt4o["company"], "OpenAI");
        let supports = gpt4o["supports"].as_array().expect("capabilities");
        assert!(supports.contains(&json!("image")));
        assert!(supports.contains(&json!("document")));
    });
}

#[rstest]
fn chat_listing_requires_a_session() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;

        let response = test::call_service(
            &app,
            TestRequest::get().uri("/api/v1/chats/recent").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    });
}
