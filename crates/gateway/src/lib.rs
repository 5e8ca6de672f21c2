//! PressForge API Gateway
//!
//! JSON API in front of the content store:
//! - Public article, category and search endpoints
//! - Generation endpoints (rate limited)
//! - Admin endpoints guarded by the shared admin secret

pub mod handlers;
pub mod middleware;

use axum::{
    extract::{FromRef, Request},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    routing::{get, post, put},
    Router,
};
use pressforge_common::{
    auth::{AdminSecret, ADMIN_HEADER},
    config::AppConfig,
    db::{DbPool, Repository},
    pipeline::{ContentGenerator, ImageResolver},
    Providers,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub repo: Repository,
    pub generator: ContentGenerator,
    pub images: ImageResolver,
    pub admin: AdminSecret,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DbPool, providers: &Providers) -> Self {
        let repo = Repository::new(db.clone());

        Self {
            generator: ContentGenerator::new(providers.llm.clone(), repo.clone()),
            images: ImageResolver::new(
                providers.images.clone(),
                providers.storage.clone(),
                repo.clone(),
            ),
            admin: AdminSecret::new(config.admin.secret_key.as_deref()),
            config,
            db,
            repo,
        }
    }
}

impl FromRef<AppState> for AdminSecret {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Generation endpoints, optionally rate limited
    let mut generation_routes = Router::new()
        .route("/generate-content", post(handlers::generation::generate_content))
        .route("/generate-image", post(handlers::generation::generate_image));

    if config.rate_limit.enabled {
        let per_second = config.rate_limit.requests_per_second;
        let limiter =
            middleware::rate_limit::create_rate_limiter(per_second, config.rate_limit.burst);
        generation_routes = generation_routes.layer(axum::middleware::from_fn(
            move |req: Request, next: Next| {
                middleware::rate_limit::rate_limit_middleware(req, next, limiter.clone(), per_second)
            },
        ));
    }

    let admin_routes = Router::new()
        .route("/articles", get(handlers::admin::list_articles))
        .route(
            "/article/{id}",
            get(handlers::admin::get_article).delete(handlers::admin::delete_article),
        )
        .route("/article/{id}/edit", put(handlers::admin::edit_article))
        .route("/article/{id}/toggle", post(handlers::admin::toggle_publish))
        .route(
            "/article/{id}/regenerate-image",
            post(handlers::admin::regenerate_image),
        );

    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/get-article/{slug}", get(handlers::articles::get_article))
        .route("/articles", get(handlers::articles::list_articles))
        .route("/articles/category/{slug}", get(handlers::categories::category_articles))
        .route("/categories", get(handlers::categories::list_categories))
        .route("/search", get(handlers::articles::search))
        .merge(generation_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// CORS restricted to the configured origins
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ADMIN_HEADER),
        ])
}
