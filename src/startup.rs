use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_session::storage::RedisSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::dev::Server;
use actix_web::web;
use actix_web::web::Data;
use actix_web::App;
use actix_web::HttpServer;
use actix_web_lab::middleware::from_fn;
use secrecy::ExposeSecret;
use secrecy::Secret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::authentication::reject_anonymous_users;
use crate::cache::WebViewCache;
use crate::compiler::Compiler;
use crate::configuration::DatabaseSettings;
use crate::configuration::Settings;
use crate::email_client::MailTransport;
use crate::routes::health_check;
use crate::routes::send_newsletter;
use crate::routes::send_test_email;
use crate::routes::view_newsletter;
use crate::store::PgStore;
use crate::store::Store;

/// Wrapper for actix's `Server` with access to the bound port
pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;
        // port 0 asks the OS for a random one
        let port = listener.local_addr()?.port();

        let pool = get_connection_pool(&cfg.database);
        let state = AppState::new(
            Arc::new(PgStore::new(pool)),
            Arc::new(cfg.email_client.client()?),
            Compiler::new(cfg.application.base_url),
            cfg.web_view.ttl(),
        );

        let server = run(
            listener,
            state,
            cfg.application.hmac_secret,
            cfg.redis_uri,
        )
        .await?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Consumes `self`; this should be the final call (or passed to
    /// `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

/// Lazy: nothing connects until the first query
pub fn get_connection_pool(db_cfg: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_lazy_with(db_cfg.connection())
}

/// Everything handlers extract with `web::Data`. Cloning is cheap; every
/// field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    store: Data<dyn Store>,
    transport: Data<dyn MailTransport>,
    compiler: Data<Compiler>,
    web_views: Data<WebViewCache>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        transport: Arc<dyn MailTransport>,
        compiler: Compiler,
        web_view_ttl: Duration,
    ) -> Self {
        Self {
            store: Data::from(store),
            transport: Data::from(transport),
            compiler: Data::new(compiler),
            web_views: Data::new(WebViewCache::new(web_view_ttl)),
        }
    }

    /// Declares all endpoints and their shared state. Session middleware is
    /// left to the caller, since the store differs between production and
    /// tests.
    pub fn register(
        &self,
        cfg: &mut web::ServiceConfig,
    ) {
        cfg.route("/health_check", web::get().to(health_check))
            .route("/newsletters/{id}/view", web::get().to(view_newsletter))
            .service(
                web::scope("/admin")
                    .wrap(from_fn(reject_anonymous_users))
                    .route("/newsletters/{id}/send", web::post().to(send_newsletter))
                    .route("/newsletters/{id}/test", web::post().to(send_test_email)),
            )
            .app_data(self.store.clone())
            .app_data(self.transport.clone())
            .app_data(self.compiler.clone())
            .app_data(self.web_views.clone());
    }
}

/// Serve on an already bound listener, with Redis-backed sessions.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    hmac_secret: Secret<String>,
    redis_uri: Secret<String>,
) -> Result<Server, anyhow::Error> {
    let secret_key = Key::from(hmac_secret.expose_secret().as_bytes());
    let redis_store = RedisSessionStore::new(redis_uri.expose_secret()).await?;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(SessionMiddleware::new(
                redis_store.clone(),
                secret_key.clone(),
            ))
            .configure(|cfg| state.register(cfg))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
