//! Endpoint tests for the upload gateway.

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

use support::{Harness, harness, init_app, login};

const MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

fn upload_request(file_name: &str, file_size: u64, file_type: &str) -> Value {
    json!({ "fileName": file_name, "fileSize": file_size, "fileType": file_type })
}

/// Walk the grant/PUT/confirm round trip and return the minted key.
async fn granted_and_confirmed_key<S, B>(
    app: &S,
    fixture: &Harness,
    cookie: &actix_web::cookie::Cookie<'static>,
    name: &str,
    content_type: &str,
    size: u64,
) -> String
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let response = test::call_service(
        app,
        TestRequest::post()
            .uri("/api/v1/uploads")
            .cookie(cookie.clone())
            .set_json(upload_request(name, size, content_type))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    let key = body["key"].as_str().expect("key").to_owned();
    assert!(key.starts_with("f/"), "keys are opaque f/<uuid> strings");
    assert!(body["url"].as_str().expect("url").contains(&key));

    fixture.store.put_object(&key, size);

    let response = test::call_service(
        app,
        TestRequest::post()
            .uri("/api/v1/uploads/confirm")
            .cookie(cookie.clone())
            .set_json(json!({
                "key": key,
                "size": size,
                "name": name,
                "type": content_type,
            }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["success"], true);
    key
}

#[rstest]
fn grant_and_confirm_persist_a_record() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let key =
            granted_and_confirmed_key(&app, &fixture, &cookie, "photo.png", "image/png", 2048)
                .await;

        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/uploads")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["data"][0]["key"], key);
        assert_eq!(body["data"][0]["name"], "photo.png");
        assert_eq!(body["data"][0]["size"], 2048);
    });
}

#[rstest]
#[case(upload_request("huge.pdf", MAX_FILE_SIZE_BYTES + 1, "application/pdf"))]
#[case(upload_request("clip.mp4", 1024, "video/mp4"))]
#[case(upload_request("  ", 1024, "image/png"))]
fn policy_violations_are_rejected_at_grant_time(#[case] payload: Value) {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/uploads")
                .cookie(cookie)
                .set_json(payload)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["code"], "invalid_request");
    });
}

#[rstest]
fn confirm_without_an_uploaded_object_is_rejected() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/uploads/confirm")
                .cookie(cookie)
                .set_json(json!({
                    "key": format!("f/{}", uuid::Uuid::new_v4()),
                    "size": 10,
                    "name": "ghost.png",
                    "type": "image/png",
                }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    });
}

#[rstest]
fn confirm_rejects_a_size_mismatch() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/uploads")
                .cookie(cookie.clone())
                .set_json(upload_request("doc.pdf", 1000, "application/pdf"))
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(response).await;
        let key = body["key"].as_str().expect("key").to_owned();

        // The object that actually landed is larger than declared.
        fixture.store.put_object(&key, 4000);

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/uploads/confirm")
                .cookie(cookie)
                .set_json(json!({
                    "key": key,
                    "size": 1000,
                    "name": "doc.pdf",
                    "type": "application/pdf",
                }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    });
}

#[rstest]
fn resolve_returns_presigned_get_for_own_files_only() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let owner = login(&app).await;
        let key =
            granted_and_confirmed_key(&app, &fixture, &owner, "pic.webp", "image/webp", 512).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/uploads/resolve")
                .cookie(owner)
                .set_json(json!({ "key": key }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert!(body["url"].as_str().expect("url").contains(&key));
        assert!(body["expiresAt"].is_string());

        // A different user sees not-found, never forbidden.
        let stranger = login(&app).await;
        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/uploads/resolve")
                .cookie(stranger)
                .set_json(json!({ "key": key }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    });
}

#[rstest]
fn delete_removes_the_object_and_the_record() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;
        let key =
            granted_and_confirmed_key(&app, &fixture, &cookie, "note.txt", "text/plain", 64).await;

        let response = test::call_service(
            &app,
            TestRequest::delete()
                .uri(&format!("/api/v1/uploads/{key}"))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(fixture.store.deleted_keys(), vec![key.clone()]);

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/uploads/resolve")
                .cookie(cookie)
                .set_json(json!({ "key": key }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    });
}

#[rstest]
fn listing_filters_by_kind_and_sorts_by_size() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;
        let cookie = login(&app).await;
        granted_and_confirmed_key(&app, &fixture, &cookie, "small.png", "image/png", 100).await;
        granted_and_confirmed_key(&app, &fixture, &cookie, "big.png", "image/png", 900).await;
        granted_and_confirmed_key(&app, &fixture, &cookie, "paper.pdf", "application/pdf", 500)
            .await;

        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/uploads?kind=image&sort=size")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["data"][0]["name"], "big.png");
        assert_eq!(body["data"][1]["name"], "small.png");

        let response = test::call_service(
            &app,
            TestRequest::get()
                .uri("/api/v1/uploads?sort=oldest")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    });
}

#[rstest]
fn upload_endpoints_require_a_session() {
    actix_rt::System::new().block_on(async {
        let fixture = harness();
        let app = init_app(fixture.state.clone()).await;

        let response = test::call_service(
            &app,
            TestRequest::post()
                .uri("/api/v1/uploads")
                .set_json(upload_request("photo.png", 10, "image/png"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    });
}
