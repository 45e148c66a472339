//! Server construction: migrations, adapter wiring, and middleware.

mod config;

pub use config::{AppConfig, ConfigError};

use std::sync::Arc;
use std::time::Duration;

use actix_session::{
    SessionMiddleware, config::CookieContentSecurity, storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::{
    ChatService, GuestUserService, InferenceService, TitleService, UploadService,
};
use crate::inbound::http::error::json_error_handler;
use crate::inbound::http::health::{HealthState, liveness, readiness};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::configure_api;
use crate::middleware::Trace;
use crate::outbound::inference::{
    CompletionRouter, GeminiBackend, HttpDocumentFetcher, OpenRouterBackend,
};
use crate::outbound::persistence::{
    DbPool, DieselAttachmentRepository, DieselChatRepository, DieselUserRepository, PoolConfig,
};
use crate::outbound::storage::S3ObjectStore;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DOCUMENT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Apply pending migrations on a blocking thread.
///
/// # Errors
/// Returns [`std::io::Error`] when the connection or a migration fails.
async fn run_migrations(database_url: String) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url)
            .map_err(|error| std::io::Error::other(format!("migration connection: {error}")))?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|error| std::io::Error::other(format!("migrations: {error}")))?;
        info!(count = applied.len(), "migrations applied");
        Ok(())
    })
    .await
    .map_err(|error| std::io::Error::other(format!("migration task: {error}")))?
}

async fn build_object_store(config: &AppConfig) -> Arc<S3ObjectStore> {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(endpoint) = config.s3_endpoint.as_ref() {
        loader = loader.endpoint_url(endpoint.as_str());
    }
    let sdk_config = loader.load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
    // Path-style addressing for MinIO-style endpoints.
    if config.s3_endpoint.is_some() {
        builder = builder.force_path_style(true);
    }
    let client = aws_sdk_s3::Client::from_conf(builder.build());
    Arc::new(S3ObjectStore::new(client, config.bucket.clone()))
}

async fn build_http_state(pool: DbPool, config: &AppConfig) -> std::io::Result<HttpState> {
    let chat_repo = Arc::new(DieselChatRepository::new(pool.clone()));
    let attachment_repo = Arc::new(DieselAttachmentRepository::new(pool.clone()));
    let user_repo = Arc::new(DieselUserRepository::new(pool));
    let store = build_object_store(config).await;

    let openrouter = OpenRouterBackend::new(UPSTREAM_CONNECT_TIMEOUT)
        .map_err(|error| std::io::Error::other(error.to_string()))?;
    let gemini = if config.gemini_direct {
        Some(
            GeminiBackend::new(UPSTREAM_CONNECT_TIMEOUT)
                .map_err(|error| std::io::Error::other(error.to_string()))?,
        )
    } else {
        None
    };
    let backend = Arc::new(CompletionRouter::new(openrouter, gemini));
    let fetcher = Arc::new(
        HttpDocumentFetcher::new(DOCUMENT_FETCH_TIMEOUT)
            .map_err(|error| std::io::Error::other(error.to_string()))?,
    );

    Ok(HttpState {
        users: Arc::new(GuestUserService::new(user_repo)),
        chats: Arc::new(ChatService::new(Arc::clone(&chat_repo))),
        titles: Arc::new(TitleService::new(
            Arc::clone(&chat_repo),
            Arc::clone(&backend),
        )),
        uploads: Arc::new(UploadService::new(
            attachment_repo,
            store,
            config.cdn_base_url.clone(),
        )),
        inference: Arc::new(InferenceService::new(chat_repo, backend, fetcher)),
    })
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(SameSite::Lax)
        .build();

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .wrap(session)
        .wrap(Trace)
        .configure(configure_api)
        .service(readiness)
        .service(liveness);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Run migrations, wire every adapter, and start the HTTP server.
///
/// # Errors
/// Propagates [`std::io::Error`] when migrations, adapter construction, or
/// socket binding fail.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    config: AppConfig,
) -> std::io::Result<Server> {
    run_migrations(config.database_url.clone()).await?;
    let pool = DbPool::connect(&PoolConfig::new(&config.database_url))
        .await
        .map_err(|error| std::io::Error::other(error.to_string()))?;
    let http_state = web::Data::new(build_http_state(pool, &config).await?);

    let server_health_state = health_state.clone();
    let key = config.session_key.clone();
    let cookie_secure = config.cookie_secure;
    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
        })
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
