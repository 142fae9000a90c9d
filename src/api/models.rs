//! API data models

use serde::{Deserialize, Serialize};

use crate::extraction::ScenePrompt;
use crate::script::{GeneratedScript, StructuredScene};

/// Response for `POST /generate-script`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateScriptResponse {
    /// Full script as plain text
    pub result: String,
    /// Scene objects, present in structured mode only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<StructuredScene>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storyboard_text: Option<String>,
}

impl From<GeneratedScript> for GenerateScriptResponse {
    fn from(script: GeneratedScript) -> Self {
        match script {
            GeneratedScript::Text(result) => Self {
                result,
                scenes: None,
                storyboard_text: None,
            },
            GeneratedScript::Structured(structured) => Self {
                result: structured.to_script_text(),
                storyboard_text: Some(structured.storyboard_text.clone())
                    .filter(|text| !text.trim().is_empty()),
                scenes: Some(structured.scenes),
            },
        }
    }
}

/// Request for `POST /extract-scene-prompts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractPromptsRequest {
    pub text: String,
}

/// Response for `POST /extract-scene-prompts`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractPromptsResponse {
    pub prompts: Vec<ScenePrompt>,
}

/// Health check payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub template: String,
    pub response_mode: String,
    pub timestamp: String,
}

/// Error body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}
