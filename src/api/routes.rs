use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::pool::WorkerFactory;
use crate::tts::{Synthesizer, TtsService};

pub struct AppState<F: WorkerFactory> {
    pub tts: TtsService<F>,
}

pub fn create_router<F>(state: Arc<AppState<F>>) -> Router
where
    F: WorkerFactory,
    F::Worker: Synthesizer,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/synthesize", post(handlers::synthesize::<F>))
        .route("/voices", get(handlers::list_voices::<F>))
        .route("/health", get(handlers::health::<F>));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
