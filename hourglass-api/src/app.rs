/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use hourglass_api::{app::{build_router, AppState}, config::Config};
/// use hourglass_shared::db::pool::create_pool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.pool_config()).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use hourglass_shared::{
    auth::{
        actor::Actor,
        jwt::{TokenSigner, TokenType},
    },
    models::user::User,
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, warn, Level};

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    pub signer: Arc<TokenSigner>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let signer = config.token_signer();
        Self {
            db,
            config: Arc::new(config),
            signer: Arc::new(signer),
        }
    }
}

/// Builds the complete router
///
/// ```text
/// /api
/// ├── GET  /health
/// ├── /auth        POST /register, /login, /refresh   GET /me
/// ├── /users       GET / · GET|PUT|DELETE /:id · GET /:id/timesheets · GET /:id/stats
/// ├── /projects    GET|POST / · GET|PUT|DELETE /:id
/// ├── /tasks       GET|POST / · GET|PUT|DELETE /:id
/// ├── /timesheets  GET|POST / · GET /summary · GET|PUT|DELETE /:id · PUT /:id/status
/// └── /reports     GET /daily, /weekly, /monthly
/// ```
///
/// Everything except health, register, login and refresh requires a bearer
/// access token. Unmatched paths fall through to `STATIC_DIR` when set.
pub fn build_router(state: AppState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/users", get(routes::users::list_users))
        .route(
            "/users/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/users/:id/timesheets", get(routes::users::user_timesheets))
        .route("/users/:id/stats", get(routes::users::user_stats))
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/timesheets",
            get(routes::timesheets::list_timesheets).post(routes::timesheets::create_timesheet),
        )
        .route("/timesheets/summary", get(routes::timesheets::summary))
        .route(
            "/timesheets/:id",
            get(routes::timesheets::get_timesheet)
                .put(routes::timesheets::update_timesheet)
                .delete(routes::timesheets::delete_timesheet),
        )
        .route("/timesheets/:id/status", put(routes::timesheets::update_status))
        .route("/reports/daily", get(routes::reports::daily))
        .route("/reports/weekly", get(routes::reports::weekly))
        .route("/reports/monthly", get(routes::reports::monthly))
        .layer(auth_layer);

    let mut router = Router::new().nest("/api", public_routes.merge(protected_routes));

    if let Some(dir) = &state.config.api.static_dir {
        debug!(dir = %dir.display(), "Serving static files");
        let index = dir.join("index.html");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
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
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Validates the bearer access token and inserts the current [`Actor`]
///
/// The user row is reloaded on every request so deactivation and role
/// changes apply immediately.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = state.signer.verify(token, TokenType::Access)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    if !user.is_active {
        warn!(user_id = %user.id, "Rejected token for inactive user");
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    req.extensions_mut().insert(Actor::from_user(&user));
    Ok(next.run(req).await)
}
