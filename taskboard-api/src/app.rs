/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::auth::middleware::{resolve_request_user, AuthContext};
use taskboard_shared::reorder::ReorderCoordinator;
use taskboard_shared::store::{postgres::PgBoardStore, BoardStore};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Transactional task moves and deletions
    pub reorder: ReorderCoordinator,
}

impl AppState {
    /// Creates application state backed by PostgreSQL
    pub fn new(db: PgPool, config: Config) -> Self {
        let store = PgBoardStore::new(db.clone(), config.reorder.lock_timeout());
        Self::with_store(db, Arc::new(store), config)
    }

    /// Creates application state with a custom board store
    pub fn with_store(db: PgPool, store: Arc<dyn BoardStore>, config: Config) -> Self {
        let reorder = ReorderCoordinator::new(store).with_max_attempts(config.reorder.max_attempts);
        Self {
            db,
            config: Arc::new(config),
            reorder,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                       # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register        # public
///     │   ├── POST /login           # public
///     │   ├── POST /refresh         # public
///     │   └── GET  /me              # authenticated
///     ├── /boards/                  # authenticated
///     │   ├── GET    /
///     │   ├── POST   /
///     │   ├── POST   /seed
///     │   ├── GET    /:id
///     │   ├── DELETE /:id
///     │   ├── POST   /:id/columns
///     │   └── POST   /:id/labels
///     └── /tasks/                   # authenticated
///         ├── POST   /
///         ├── POST   /reorder
///         └── DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let session_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let board_routes = Router::new()
        .route(
            "/",
            get(routes::boards::list_boards).post(routes::boards::create_board),
        )
        .route("/seed", post(routes::boards::seed_board))
        .route(
            "/:id",
            get(routes::boards::get_board).delete(routes::boards::delete_board),
        )
        .route("/:id/columns", post(routes::columns::create_column))
        .route("/:id/labels", post(routes::labels::create_label))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/reorder", post(routes::tasks::reorder_tasks))
        .route("/:id", delete(routes::tasks::delete_task))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_routes))
        .nest("/boards", board_routes)
        .nest("/tasks", task_routes);

    let cors = if state.config.allows_any_origin() {
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
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Resolves the bearer token to a user and injects an [`AuthContext`] into
/// request extensions. Requests without a valid access token get `401`.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = resolve_request_user(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(AuthContext::new(user_id));

    Ok(next.run(req).await)
}
