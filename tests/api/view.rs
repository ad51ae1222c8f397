use newsletter_dispatch::domain::NewsletterStatus;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::spawn_app;

#[tokio::test]
async fn drafts_are_not_viewable() {
    let app = spawn_app().await;
    let id = app.add_draft(json!([{"type": "text", "content": "secret"}]));

    assert_eq!(app.get_view(id).await.status().as_u16(), 404);
    assert_eq!(app.get_view(Uuid::new_v4()).await.status().as_u16(), 404);
}

#[tokio::test]
async fn published_newsletters_are_public() {
    let app = spawn_app().await;
    let id = app.add_newsletter(
        Uuid::new_v4(),
        json!([{"type": "heading", "content": "Hello world"}]),
        NewsletterStatus::Published,
    );

    // no login needed
    let resp = app.get_view(id).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp
        .headers()
        .get("Content-Type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = resp.text().await.unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Hello world"));
}

#[tokio::test]
async fn sending_refreshes_the_cached_view() {
    let app = spawn_app().await;
    let id = app.add_newsletter(
        app.owner_id,
        json!([{"type": "text", "content": "first edition"}]),
        NewsletterStatus::Published,
    );
    let first = app.get_view(id).await.text().await.unwrap();
    assert!(first.contains("first edition"));

    // edited out of band: the cached copy is still served
    let mut newsletter = app.store.newsletter_snapshot(id).unwrap();
    newsletter.content = json!([{"type": "text", "content": "second edition"}]);
    app.store.insert_newsletter(newsletter);
    let cached = app.get_view(id).await.text().await.unwrap();
    assert!(cached.contains("first edition"));

    // a dispatch invalidates it
    app.add_recipients(&["a@example.com"]);
    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;
    app.login().await;
    assert_eq!(app.post_send(id).await.status().as_u16(), 200);

    let fresh = app.get_view(id).await.text().await.unwrap();
    assert!(fresh.contains("second edition"));
}
