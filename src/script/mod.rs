//! Script generation
//!
//! Turns campaign parameters into instruction text, makes one call to the
//! generation backend and hands back the script, either as raw text or as
//! schema-validated scenes.

pub mod structured;
pub mod templates;

pub use structured::{StructuredScene, StructuredScript};
pub use templates::{PromptTemplate, TemplateVersion};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ScriptConfig;
use crate::error::{Result, ServiceError};
use crate::llm::{ChatMessage, LLM};

/// Tone used when the request does not name one
pub const DEFAULT_TONE: &str = "自然、溫暖、貼近日常口語";

fn default_scene_count() -> u8 {
    4
}

/// Campaign parameters for one script
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptRequest {
    /// Brand or company name
    pub brand: String,
    pub topic: String,
    pub video_type: String,
    /// Platform the video is published on
    pub platform: String,
    pub aspect_ratio: String,
    #[serde(alias = "video_techniques")]
    pub visual_style: String,
    #[serde(default = "default_scene_count")]
    pub scene_count: u8,
    #[serde(default)]
    pub tone: Option<String>,
}

impl ScriptRequest {
    /// Requested tone, or [`DEFAULT_TONE`]
    pub fn tone(&self) -> &str {
        self.tone
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TONE)
    }

    /// Check required fields and the scene count bounds
    pub fn validate(&self, scene_limits: &RangeInclusive<u8>) -> Result<()> {
        let required = [
            ("brand", &self.brand),
            ("topic", &self.topic),
            ("video_type", &self.video_type),
            ("platform", &self.platform),
            ("aspect_ratio", &self.aspect_ratio),
            ("visual_style", &self.visual_style),
        ];

        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ServiceError::InvalidRequest(format!("{} must not be empty", name)));
        }

        if !scene_limits.contains(&self.scene_count) {
            return Err(ServiceError::InvalidRequest(format!(
                "scene_count must be between {} and {}, got {}",
                scene_limits.start(),
                scene_limits.end(),
                self.scene_count
            )));
        }

        Ok(())
    }
}

/// Output contract of the generation step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Plain text; prompts are recovered with the scene extractor
    #[default]
    Text,
    /// JSON following [`structured::response_schema`]
    Structured,
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ResponseMode::Text),
            "structured" | "json" => Ok(ResponseMode::Structured),
            other => Err(format!("unknown response mode: {}", other)),
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseMode::Text => write!(f, "text"),
            ResponseMode::Structured => write!(f, "structured"),
        }
    }
}

/// A generated script
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedScript {
    Text(String),
    Structured(StructuredScript),
}

impl GeneratedScript {
    /// Full script as plain text
    pub fn script_text(&self) -> String {
        match self {
            GeneratedScript::Text(text) => text.clone(),
            GeneratedScript::Structured(script) => script.to_script_text(),
        }
    }

    pub fn structured(&self) -> Option<&StructuredScript> {
        match self {
            GeneratedScript::Text(_) => None,
            GeneratedScript::Structured(script) => Some(script),
        }
    }
}

/// Builds instructions and delegates generation to the backend
pub struct ScriptRequestor {
    llm: Arc<dyn LLM>,
    template: PromptTemplate,
    response_mode: ResponseMode,
    scene_limits: RangeInclusive<u8>,
}

impl ScriptRequestor {
    pub fn new(llm: Arc<dyn LLM>, config: &ScriptConfig) -> Self {
        Self {
            llm,
            template: PromptTemplate::new(config.template),
            response_mode: config.response_mode,
            scene_limits: config.min_scenes..=config.max_scenes,
        }
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.response_mode
    }

    /// Generate one script. No retries and no caching.
    pub async fn request_script(&self, request: &ScriptRequest) -> Result<GeneratedScript> {
        request.validate(&self.scene_limits)?;

        let messages = vec![
            ChatMessage::system(self.template.system_prompt(request.scene_count)),
            ChatMessage::user(self.template.user_prompt(request, self.response_mode)),
        ];
        let schema = match self.response_mode {
            ResponseMode::Text => None,
            ResponseMode::Structured => Some(structured::response_schema()),
        };

        info!(
            "🎬 Requesting {}-scene script for {} (template {}, {} mode)",
            request.scene_count,
            request.brand.trim(),
            self.template.version(),
            self.response_mode
        );

        let response = self.llm.chat(messages, schema.as_ref()).await.map_err(|e| {
            warn!("❌ Generation backend error: {}", e);
            ServiceError::Upstream(e)
        })?;

        if let Some(tokens) = response.tokens_used {
            debug!("Generation used {} tokens", tokens);
        }

        let content = response.content.trim();
        if content.is_empty() {
            warn!("⚠️ Generation backend returned empty content");
            return Err(ServiceError::EmptyGeneration);
        }

        match self.response_mode {
            ResponseMode::Text => Ok(GeneratedScript::Text(content.to_string())),
            ResponseMode::Structured => {
                let script = StructuredScript::from_response(content)?;
                if script.scenes.is_empty() {
                    warn!("⚠️ Structured script contained no scenes");
                    return Err(ServiceError::EmptyGeneration);
                }
                Ok(GeneratedScript::Structured(script))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ScriptRequest {
        ScriptRequest {
            brand: "晨光咖啡".to_string(),
            topic: "週末早午餐".to_string(),
            video_type: "生活風格".to_string(),
            platform: "Instagram Reels".to_string(),
            aspect_ratio: "9:16".to_string(),
            visual_style: "溫暖底片感".to_string(),
            scene_count: 4,
            tone: None,
        }
    }

    #[test]
    fn test_default_tone() {
        let mut req = request();
        assert_eq!(req.tone(), DEFAULT_TONE);

        req.tone = Some("  ".to_string());
        assert_eq!(req.tone(), DEFAULT_TONE);

        req.tone = Some("幽默".to_string());
        assert_eq!(req.tone(), "幽默");
    }

    #[test]
    fn test_validate_scene_bounds() {
        let limits = 2..=8;
        let mut req = request();
        assert!(req.validate(&limits).is_ok());

        req.scene_count = 1;
        assert!(matches!(req.validate(&limits), Err(ServiceError::InvalidRequest(_))));

        req.scene_count = 9;
        assert!(matches!(req.validate(&limits), Err(ServiceError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_required_fields() {
        let mut req = request();
        req.platform = "   ".to_string();
        let err = req.validate(&(2..=8)).unwrap_err();
        assert!(err.to_string().contains("platform"));
    }

    #[test]
    fn test_deserialize_with_alias_and_defaults() {
        let json = r#"{
            "brand": "晨光咖啡",
            "topic": "週末早午餐",
            "video_type": "生活風格",
            "platform": "TikTok",
            "aspect_ratio": "9:16",
            "video_techniques": "手持跟拍"
        }"#;
        let req: ScriptRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.visual_style, "手持跟拍");
        assert_eq!(req.scene_count, 4);
        assert_eq!(req.tone, None);
    }

    #[test]
    fn test_response_mode_parsing() {
        assert_eq!("JSON".parse::<ResponseMode>().unwrap(), ResponseMode::Structured);
        assert_eq!(ResponseMode::Text.to_string(), "text");
        assert!("xml".parse::<ResponseMode>().is_err());
    }
}
