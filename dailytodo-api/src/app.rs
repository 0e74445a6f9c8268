//! Application state and router builder
//!
//! Defines the shared application state and builds the Axum router with all
//! routes and middleware.
//!
//! # Example
//!
//! ```no_run
//! use dailytodo_api::{app::{build_router, AppState}, config::Config};
//! use dailytodo_shared::clock::SystemClock;
//! use dailytodo_shared::store::Storage;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let storage = Storage::connect(&config.storage).await?;
//! let state = AppState::new(storage, Arc::new(SystemClock), config);
//! let app = build_router(state);
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use dailytodo_shared::clock::Clock;
use dailytodo_shared::quota::QuotaEnforcer;
use dailytodo_shared::store::Storage;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// User directory and task store
    pub storage: Storage,

    /// Quota admission controller; owns the per-user locks
    pub enforcer: QuotaEnforcer,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(storage: Storage, clock: Arc<dyn Clock>, config: Config) -> Self {
        let enforcer = QuotaEnforcer::new(&storage, clock, config.calendar);
        Self {
            storage,
            enforcer,
            config: Arc::new(config),
        }
    }

    /// Current time from the configured clock
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.enforcer.clock().now()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// └── /users
///     ├── GET    /                           # List users
///     ├── POST   /                           # Create user
///     ├── GET    /:user_id                   # Get user
///     ├── PUT    /:user_id                   # Update user
///     ├── DELETE /:user_id                   # Delete user and their tasks
///     ├── GET    /:user_id/quota             # Today's usage
///     ├── POST   /:user_id/tasks             # Create task (quota-checked)
///     ├── GET    /:user_id/tasks             # List tasks
///     ├── DELETE /:user_id/tasks             # Delete all tasks
///     ├── GET    /:user_id/tasks/:task_id    # Get task
///     ├── PUT    /:user_id/tasks/:task_id    # Update task text
///     └── DELETE /:user_id/tasks/:task_id    # Delete task
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let user_routes = Router::new()
        .route(
            "/",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/:user_id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/:user_id/quota", get(routes::quota::get_usage))
        .route(
            "/:user_id/tasks",
            get(routes::tasks::list_tasks)
                .post(routes::tasks::create_task)
                .delete(routes::tasks::delete_all_tasks),
        )
        .route(
            "/:user_id/tasks/:task_id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        );

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/users", user_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
