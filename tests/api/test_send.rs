use newsletter_dispatch::domain::NewsletterStatus;
use serde_json::json;
use serde_json::Value;
use uuid::Uuid;
use wiremock::matchers::any;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::spawn_app;

fn stored_content() -> Value { json!([{"type": "text", "content": "Stored copy"}]) }

#[tokio::test]
async fn requires_login() {
    let app = spawn_app().await;
    let id = app.add_draft(stored_content());

    let resp = app
        .post_test_send(id, &json!({"testEmail": "me@example.com"}))
        .await;

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn rejects_invalid_test_addresses() {
    let app = spawn_app().await;
    let id = app.add_draft(stored_content());
    app.login().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    for (body, case) in [
        (json!({}), "missing"),
        (json!({"testEmail": ""}), "empty"),
        (json!({"testEmail": "me-at-example"}), "no @ or dot"),
        (json!({"testEmail": "me@example"}), "no dot"),
    ] {
        let resp = app.post_test_send(id, &body).await;
        assert_eq!(resp.status().as_u16(), 400, "{case}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["message"], "A valid test email address is required", "{case}");
    }
}

#[tokio::test]
async fn falls_back_to_the_stored_newsletter() {
    let app = spawn_app().await;
    let id = app.add_draft(stored_content());
    app.login().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .and(body_partial_json(json!({
            "to": "me@example.com",
            "subject": "[TEST] This week at Acme",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "preview-42"})))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let resp = app
        .post_test_send(id, &json!({"testEmail": "me@example.com"}))
        .await;
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["messageId"], "preview-42");
    assert!(body["message"].as_str().unwrap().contains("me@example.com"));

    let sent = app.sent_emails().await;
    let html = sent[0]["html"].as_str().unwrap();
    assert!(html.contains("Stored copy"));
    assert!(html.contains("Test email"));
    assert!(html.contains("Five things you missed"));
}

#[tokio::test]
async fn unsaved_elements_take_precedence() {
    let app = spawn_app().await;
    let id = app.add_draft(stored_content());
    app.login().await;

    Mock::given(path("/email"))
        .and(body_partial_json(json!({"subject": "[TEST] Draft subject"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let resp = app
        .post_test_send(
            id,
            &json!({
                "testEmail": "me@example.com",
                "subject": "Draft subject",
                "previewText": "Unsaved preview",
                "elements": [{"type": "heading", "content": "Unsaved heading"}],
            }),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 200);

    let sent = app.sent_emails().await;
    let html = sent[0]["html"].as_str().unwrap();
    assert!(html.contains("Unsaved heading"));
    assert!(html.contains("Unsaved preview"));
    assert!(!html.contains("Stored copy"));
}

#[tokio::test]
async fn does_not_publish_or_record_anything() {
    let app = spawn_app().await;
    let id = app.add_draft(stored_content());
    app.add_recipients(&["a@example.com", "b@example.com"]);
    app.login().await;

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let resp = app
        .post_test_send(id, &json!({"testEmail": "me@example.com"}))
        .await;
    assert_eq!(resp.status().as_u16(), 200);

    let newsletter = app.store.newsletter_snapshot(id).unwrap();
    assert_eq!(newsletter.status, NewsletterStatus::Draft);
    assert!(newsletter.last_send_attempt_at.is_none());
    assert!(app.store.campaigns().is_empty());
}

#[tokio::test]
async fn empty_or_malformed_content_is_rejected() {
    let app = spawn_app().await;
    let id = app.add_draft(json!([]));
    app.login().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let resp = app
        .post_test_send(id, &json!({"testEmail": "me@example.com"}))
        .await;
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .post_test_send(
            id,
            &json!({"testEmail": "me@example.com", "elements": {"type": "text"}}),
        )
        .await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn foreign_newsletters_are_not_found() {
    let app = spawn_app().await;
    let foreign = app.add_newsletter(Uuid::new_v4(), stored_content(), NewsletterStatus::Draft);
    app.login().await;

    let resp = app
        .post_test_send(foreign, &json!({"testEmail": "me@example.com"}))
        .await;

    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn transport_failures_get_a_structured_message() {
    let app = spawn_app().await;
    let id = app.add_draft(stored_content());
    app.login().await;

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let resp = app
        .post_test_send(id, &json!({"testEmail": "me@example.com"}))
        .await;
    assert_eq!(resp.status().as_u16(), 500);

    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("credentials"));
}
