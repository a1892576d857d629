pub mod handlers;
pub mod routes;
pub mod validation;

use serde::{Deserialize, Serialize};

use crate::pool::PoolStatus;
use crate::tts::ModelInfo;

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub speed: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub model: ModelInfo,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pool: PoolStatus,
}
