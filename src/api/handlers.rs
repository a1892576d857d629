use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{validation, HealthResponse, SynthesizeRequest, VoicesResponse};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::pool::{PoolState, WorkerFactory};
use crate::tts::Synthesizer;

pub async fn synthesize<F>(
    State(state): State<Arc<AppState<F>>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, AppError>
where
    F: WorkerFactory,
    F::Worker: Synthesizer,
{
    let options = validation::validate(&request, state.tts.model())?;

    let wav = state.tts.speak(&request.text, options).await?;
    tracing::info!("Returning {} bytes of WAV audio", wav.len());

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/wav")], wav).into_response())
}

pub async fn list_voices<F>(State(state): State<Arc<AppState<F>>>) -> Json<VoicesResponse>
where
    F: WorkerFactory,
    F::Worker: Synthesizer,
{
    Json(VoicesResponse {
        model: state.tts.model().clone(),
    })
}

pub async fn health<F>(State(state): State<Arc<AppState<F>>>) -> Json<HealthResponse>
where
    F: WorkerFactory,
    F::Worker: Synthesizer,
{
    let pool = state.tts.status();
    let status = if pool.state == PoolState::Serving && pool.total_created > 0 {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pool,
    })
}
