/// Scene Script Service
///
/// Generates multi-scene short-video scripts from campaign parameters and
/// recovers per-scene image-generation prompts from script text.

pub mod config;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod script;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::ServiceError;
pub use crate::extraction::{extract_scene_prompts, SceneExtractor, ScenePrompt};
pub use crate::llm::{create_llm, LLMConfig, LLMProvider, LLM};
pub use crate::script::{GeneratedScript, ResponseMode, ScriptRequest, ScriptRequestor, TemplateVersion};
