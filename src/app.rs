// Router and shared state

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::database::EntityStore;
use crate::handlers::{protected, public};
use crate::middleware::resolve_principal;
use crate::observer::MutationPipeline;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub pipeline: Arc<MutationPipeline>,
}

impl AppState {
    /// State over `store` with the default observer set
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let pipeline = MutationPipeline::with_default_observers(store.clone());
        Self {
            store,
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let config = config::config();

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .route("/api/auth/whoami", get(protected::whoami))
        .route("/api/mutations/:name", post(protected::mutate))
        .route("/api/data/:table", get(protected::table_get))
        .route("/api/data/:table/:id", get(protected::record_get))
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.security.cors_origins))
                .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
                .layer(middleware::from_fn_with_state(state.clone(), resolve_principal)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
