use std::{any::Any, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    add_extension::AddExtensionLayer,
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    config::Config,
    error::{PageError, ServerError},
    handlers::{api, login, main, user},
    sessions::SessionStore,
    utils::mail::Mailer,
};

/// Everything a request handler may need.
pub struct State {
    pub db: DatabaseConnection,
    pub sessions: SessionStore,
    pub mailer: Mailer,
    pub config: Config,
}

impl State {
    /// Attempt to create a new State instance, creating missing tables.
    pub async fn try_new(config: Config) -> Result<State> {
        let mut options = ConnectOptions::new(config.database_url.clone());
        options
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);
        let db = Database::connect(options).await?;
        entity::schema::create_schema(&db).await?;
        info!("connected to database");

        let sessions = SessionStore::connect(config.redis_url.as_deref()).await?;
        let mailer = Mailer::from_config(&config)?;

        Ok(State {
            db,
            sessions,
            mailer,
            config,
        })
    }
}

async fn not_found_page() -> PageError {
    PageError(ServerError::NotFound)
}

fn panic_error(panic: Box<dyn Any + Send + 'static>) -> ServerError {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown cause");
    ServerError::Other(anyhow::format_err!("request handler panicked: {}", detail))
}

fn api_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    panic_error(panic).into_response()
}

fn page_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    PageError(panic_error(panic)).into_response()
}

/// Build the application router around `state`.
pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let api_routes = Router::new()
        .route("/login", post(api::get_token))
        .route("/tokens/", post(api::get_token))
        .route("/user", get(api::get_user))
        .route("/weeks/", get(api::get_weeks))
        .route(
            "/weeks/current",
            get(api::get_current_week)
                .put(api::update_current_week)
                .post(api::update_current_week),
        )
        .route(
            "/weeks/:year/:week",
            get(api::get_week)
                .put(api::update_week)
                .post(api::update_week),
        )
        .route("/users/:id", get(api::get_user_by_id))
        .route("/users/:id/weeks/", get(api::get_user_weeks))
        .route("/users/:id/weeks/:year/:week", get(api::get_user_week))
        .fallback(api::not_found)
        .layer(CatchPanicLayer::custom(api_panic))
        .layer(cors);

    Router::new()
        .route("/", get(main::index))
        .route("/edit", get(main::edit_current))
        .route("/edit/:year/:week", get(main::edit).post(main::save))
        .route("/history", get(main::history))
        .route("/login", get(login::login_page).post(login::login))
        .route("/logout", get(login::logout))
        .route("/register", get(user::register_page).post(user::register))
        .route("/confirm", get(user::resend_confirmation))
        .route("/confirm/:token", get(user::confirm))
        .route("/unconfirmed", get(user::unconfirmed))
        .route(
            "/request_reset",
            get(user::request_reset_page).post(user::request_reset),
        )
        .route("/reset/:token", get(user::reset_page).post(user::reset))
        .route("/settings", get(user::settings_page).post(user::settings))
        .nest("/api", api_routes)
        .fallback(not_found_page)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(page_panic))
                .layer(AddExtensionLayer::new(state)),
        )
}

/// Run the server.
pub async fn run(config: Config) -> Result<()> {
    let address = config.addr.clone();
    let state = Arc::new(State::try_new(config).await?);

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
