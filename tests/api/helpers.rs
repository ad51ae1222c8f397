use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::web;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use chrono::Utc;
use newsletter_dispatch::compiler::Compiler;
use newsletter_dispatch::domain::EmailAddress;
use newsletter_dispatch::domain::Newsletter;
use newsletter_dispatch::domain::NewsletterStatus;
use newsletter_dispatch::domain::Recipient;
use newsletter_dispatch::domain::RecipientStatus;
use newsletter_dispatch::email_client::EmailClient;
use newsletter_dispatch::session_state::TypedSession;
use newsletter_dispatch::startup::AppState;
use newsletter_dispatch::store::InMemoryStore;
use newsletter_dispatch::telemetry::get_subscriber;
use newsletter_dispatch::telemetry::init_subscriber;
use newsletter_dispatch::utils::error_500;
use once_cell::sync::Lazy;
use secrecy::Secret;
use serde_json::Value;
use uuid::Uuid;
use wiremock::MockServer;

pub const BASE_URL: &str = "https://news.example.com";

/// Init the tracing subscriber once for the whole test binary.
///
/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    // the two sinks are different types, hence two arms
    let init = match std::env::var("TEST_LOG") {
        Ok(_) => init_subscriber(get_subscriber("test", "debug", std::io::stdout)),
        Err(_) => init_subscriber(get_subscriber("test", "debug", std::io::sink)),
    };
    init.expect("failed to init tracing subscriber");
});

pub struct TestApp {
    pub addr: String,
    pub store: InMemoryStore,
    /// Stands in for the email API
    pub email_server: MockServer,
    /// Keeps the session cookie between requests
    pub api_client: reqwest::Client,
    pub owner_id: Uuid,
}

impl TestApp {
    /// Log in as `self.owner_id`
    pub async fn login(&self) { self.login_as(self.owner_id).await }

    pub async fn login_as(
        &self,
        owner_id: Uuid,
    ) {
        let resp = self
            .api_client
            .post(format!("{}/test/login/{owner_id}", self.addr))
            .send()
            .await
            .expect("execute request");
        assert_eq!(resp.status().as_u16(), 200);
    }

    pub async fn post_send(
        &self,
        newsletter_id: Uuid,
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/admin/newsletters/{newsletter_id}/send", self.addr))
            .send()
            .await
            .expect("execute request")
    }

    pub async fn post_test_send(
        &self,
        newsletter_id: Uuid,
        body: &Value,
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/admin/newsletters/{newsletter_id}/test", self.addr))
            .json(body)
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_view(
        &self,
        newsletter_id: Uuid,
    ) -> reqwest::Response {
        self.api_client
            .get(format!("{}/newsletters/{newsletter_id}/view", self.addr))
            .send()
            .await
            .expect("execute request")
    }

    /// Store a draft owned by `self.owner_id`
    pub fn add_draft(
        &self,
        content: Value,
    ) -> Uuid {
        self.add_newsletter(self.owner_id, content, NewsletterStatus::Draft)
    }

    pub fn add_newsletter(
        &self,
        owner_id: Uuid,
        content: Value,
        status: NewsletterStatus,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_newsletter(Newsletter {
            id,
            owner_id,
            name: "Weekly digest".to_string(),
            subject: "This week at Acme".to_string(),
            preview_text: Some("Five things you missed".to_string()),
            content,
            published_at: match status {
                NewsletterStatus::Draft => None,
                _ => Some(Utc::now()),
            },
            status,
            last_send_attempt_at: None,
        });
        id
    }

    /// Active recipients of `self.owner_id`
    pub fn add_recipients(
        &self,
        emails: &[&str],
    ) {
        for email in emails {
            self.store.insert_recipient(
                self.owner_id,
                Recipient {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    status: RecipientStatus::Active,
                },
            );
        }
    }

    /// Bodies of every request the email API received on `/email`
    pub async fn sent_emails(&self) -> Vec<Value> {
        self.email_server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == "/email")
            .map(|r| serde_json::from_slice(&r.body).expect("email body is json"))
            .collect()
    }
}

/// Stand-in for the login flow, which lives outside this crate
async fn log_in_as(
    owner_id: web::Path<Uuid>,
    session: TypedSession,
) -> Result<HttpResponse, actix_web::Error> {
    session.renew();
    session
        .insert_owner_id(owner_id.into_inner())
        .map_err(error_500)?;
    Ok(HttpResponse::Ok().finish())
}

/// Serve the app on a random port, backed by an in-memory store, cookie
/// sessions and a mock email API.
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;
    let store = InMemoryStore::new();

    let email_client = EmailClient::new(
        &email_server.uri(),
        EmailAddress::parse("newsletter@example.com".to_string()).unwrap(),
        Secret::new("my-secret-token".to_string()),
        Duration::from_millis(500),
        Duration::from_millis(500),
    )
    .unwrap();

    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(email_client),
        Compiler::new(BASE_URL),
        Duration::from_secs(300),
    );

    let secret_key = Key::generate();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = HttpServer::new(move || {
        App::new()
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    // plain http
                    .cookie_secure(false)
                    .build(),
            )
            .configure(|cfg| state.register(cfg))
            .route("/test/login/{owner_id}", web::post().to(log_in_as))
    })
    .listen(listener)
    .unwrap()
    .run();
    tokio::spawn(server);

    let api_client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();

    TestApp {
        addr: format!("http://127.0.0.1:{port}"),
        store,
        email_server,
        api_client,
        owner_id: Uuid::new_v4(),
    }
}
