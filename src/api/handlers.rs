//! API request handlers

use std::sync::Arc;
use tracing::{info, warn};

use super::models::{ExtractPromptsResponse, GenerateScriptResponse, HealthResponse};
use crate::error::{Result, ServiceError};
use crate::extraction::SceneExtractor;
use crate::script::{ScriptRequest, ScriptRequestor};

/// Handle health check requests
pub fn health_check(requestor: &ScriptRequestor) -> HealthResponse {
    HealthResponse {
        ok: true,
        service: "scene-script-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        template: requestor.template().version().to_string(),
        response_mode: requestor.response_mode().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Handle script generation requests
pub async fn generate_script(
    requestor: &ScriptRequestor,
    request: &ScriptRequest,
) -> Result<GenerateScriptResponse> {
    let script = requestor.request_script(request).await?;
    info!("✅ Generated script for {}", request.brand.trim());
    Ok(script.into())
}

/// Handle scene prompt extraction requests.
///
/// Extraction runs on the blocking pool; a panic there is reported as an
/// internal extraction error instead of tearing down the connection.
pub async fn extract_scene_prompts(
    extractor: Arc<SceneExtractor>,
    text: String,
) -> Result<ExtractPromptsResponse> {
    let prompts = tokio::task::spawn_blocking(move || extractor.extract(&text))
        .await
        .map_err(|e| ServiceError::ExtractionInternal(e.to_string()))?;

    if prompts.is_empty() {
        warn!("⚠️ No scene prompts found in submitted script");
        return Err(ServiceError::NoPromptsFound);
    }

    info!("🖼️ Extracted {} scene prompts", prompts.len());
    Ok(ExtractPromptsResponse { prompts })
}
