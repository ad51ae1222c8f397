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
use crate::helpers::BASE_URL;

fn content() -> Value {
    json!([
        {"type": "heading", "content": "Hello subscribers"},
        {"type": "text", "content": "Here is what happened this week."},
        {"type": "button", "url": "https://acme.example.com/blog", "content": "Read more"},
    ])
}

#[tokio::test]
async fn requires_login() {
    let app = spawn_app().await;
    let id = app.add_draft(content());
    app.add_recipients(&["a@example.com"]);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let resp = app.post_send(id).await;

    assert_eq!(resp.status().as_u16(), 401);
    let newsletter = app.store.newsletter_snapshot(id).unwrap();
    assert_eq!(newsletter.status, NewsletterStatus::Draft);
}

#[tokio::test]
async fn unknown_and_foreign_newsletters_look_the_same() {
    let app = spawn_app().await;
    let foreign = app.add_newsletter(Uuid::new_v4(), content(), NewsletterStatus::Draft);
    app.login().await;

    let unknown = app.post_send(Uuid::new_v4()).await;
    let unknown_status = unknown.status().as_u16();
    let unknown_body: Value = unknown.json().await.unwrap();

    let foreign_resp = app.post_send(foreign).await;
    let foreign_status = foreign_resp.status().as_u16();
    let foreign_body: Value = foreign_resp.json().await.unwrap();

    assert_eq!(unknown_status, 404);
    assert_eq!(foreign_status, 404);
    assert_eq!(unknown_body, foreign_body);
    assert_eq!(
        app.store.newsletter_snapshot(foreign).unwrap().status,
        NewsletterStatus::Draft
    );
}

#[tokio::test]
async fn sends_to_every_active_recipient() {
    let app = spawn_app().await;
    let id = app.add_draft(content());
    app.add_recipients(&["a@example.com", "b@example.com", "c@example.com"]);
    app.login().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"MessageID": "m-1"})))
        .expect(3)
        .mount(&app.email_server)
        .await;

    let resp = app.post_send(id).await;
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["totalSubscribers"], 3);
    assert_eq!(body["sentCount"], 3);
    assert_eq!(body["failedCount"], 0);
    assert!(body["message"].is_string());

    let campaigns = app.store.campaigns();
    assert_eq!(campaigns.len(), 1);
    assert_eq!(body["campaignId"], campaigns[0].id.to_string());

    let newsletter = app.store.newsletter_snapshot(id).unwrap();
    assert_eq!(newsletter.status, NewsletterStatus::Published);
    assert!(newsletter.published_at.is_some());
}

#[tokio::test]
async fn every_email_carries_unsubscribe_headers_and_a_text_part() {
    let app = spawn_app().await;
    let id = app.add_draft(content());
    app.add_recipients(&["a@example.com"]);
    app.login().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.post_send(id).await;

    let sent = app.sent_emails().await;
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert_eq!(email["to"], "a@example.com");
    assert_eq!(email["from"], "newsletter@example.com");
    assert_eq!(email["subject"], "This week at Acme");
    assert_eq!(
        email["headers"]["List-Unsubscribe"],
        format!("<{BASE_URL}/unsubscribe>")
    );
    assert_eq!(
        email["headers"]["List-Unsubscribe-Post"],
        "List-Unsubscribe=One-Click"
    );

    let html = email["html"].as_str().unwrap();
    assert!(html.contains("<h2"));
    assert!(html.contains(&format!("{BASE_URL}/unsubscribe")));
    // live sends have no test banner
    assert!(!html.contains("Test email"));
    let text = email["text"].as_str().unwrap();
    assert!(text.contains("Hello subscribers"));
}

#[tokio::test]
async fn partial_failures_are_reported_not_fatal() {
    let app = spawn_app().await;
    let id = app.add_draft(json!([
        {"type": "heading", "content": "Hi"},
        {"type": "button", "url": "ftp://bad", "content": "Go"},
    ]));
    app.add_recipients(&["a@x.com", "b@x.com"]);
    app.login().await;

    Mock::given(path("/email"))
        .and(body_partial_json(json!({"to": "b@x.com"})))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;
    Mock::given(path("/email"))
        .and(body_partial_json(json!({"to": "a@x.com"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let resp = app.post_send(id).await;
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["totalSubscribers"], 2);
    assert_eq!(body["sentCount"], 1);
    assert_eq!(body["failedCount"], 1);

    let campaigns = app.store.campaigns();
    assert_eq!(campaigns.len(), 1);
    let stats = app.store.campaign_stats(campaigns[0].id).unwrap();
    assert_eq!((stats.sent, stats.delivered), (1, 1));

    for email in app.sent_emails().await {
        assert!(!email["html"].as_str().unwrap().contains(r#"href="ftp"#));
    }
}

#[tokio::test]
async fn no_active_recipients_is_a_success_without_a_campaign() {
    let app = spawn_app().await;
    let id = app.add_draft(content());
    app.login().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let resp = app.post_send(id).await;
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["totalSubscribers"], 0);
    assert_eq!(body["sentCount"], 0);
    assert_eq!(body["failedCount"], 0);
    assert!(body["campaignId"].is_null());

    assert!(app.store.campaigns().is_empty());
    let newsletter = app.store.newsletter_snapshot(id).unwrap();
    assert!(newsletter.last_send_attempt_at.is_some());
    assert_eq!(newsletter.status, NewsletterStatus::Published);
}

#[tokio::test]
async fn rejected_credentials_abort_before_any_send() {
    let app = spawn_app().await;
    let id = app.add_draft(content());
    app.add_recipients(&["a@example.com", "b@example.com"]);
    app.login().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&app.email_server)
        .await;
    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let resp = app.post_send(id).await;
    assert_eq!(resp.status().as_u16(), 500);

    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("credentials"));
    assert!(app.store.campaigns().is_empty());
}

#[tokio::test]
async fn sending_twice_records_two_campaigns_and_one_publish() {
    let app = spawn_app().await;
    let id = app.add_draft(content());
    app.add_recipients(&["a@example.com"]);
    app.login().await;

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    assert_eq!(app.post_send(id).await.status().as_u16(), 200);
    let first = app.store.newsletter_snapshot(id).unwrap().published_at;
    assert_eq!(app.post_send(id).await.status().as_u16(), 200);
    let second = app.store.newsletter_snapshot(id).unwrap().published_at;

    assert_eq!(first, second);
    assert_eq!(app.store.campaigns().len(), 2);
}
