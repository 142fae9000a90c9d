//! Schema-validated script output
//!
//! When the backend can follow a JSON schema, scenes arrive as typed objects
//! and the image prompts need no text extraction at all.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::error::{Result, ServiceError};
use crate::extraction::{normalize_prompt, ScenePrompt};
use crate::llm::ResponseSchema;

/// One scene as returned in structured mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredScene {
    pub scene_no: u32,
    /// Shot and camera description
    #[serde(default)]
    pub shot: String,
    #[serde(default)]
    pub voiceover: String,
    #[serde(default)]
    pub mood_tags: Vec<String>,
    #[serde(default)]
    pub video_type: String,
    #[serde(default)]
    pub visual_style: String,
    /// Lighting, lens, pacing and sound notes
    #[serde(default)]
    pub techniques: String,
    #[serde(default)]
    pub image_prompt: String,
}

/// Complete structured script
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredScript {
    pub scenes: Vec<StructuredScene>,
    /// Whole script as shareable plain text
    #[serde(default)]
    pub storyboard_text: String,
}

impl StructuredScript {
    /// Decode backend content, tolerating markdown code fences
    pub fn from_response(content: &str) -> Result<Self> {
        let cleaned = strip_code_fences(content);
        serde_json::from_str(cleaned).map_err(|e| ServiceError::MalformedOutput(e.to_string()))
    }

    /// Image prompts straight from the scene objects, sorted by scene number
    pub fn scene_prompts(&self) -> Vec<ScenePrompt> {
        let mut prompts: Vec<ScenePrompt> = self
            .scenes
            .iter()
            .filter_map(|scene| {
                normalize_prompt(&scene.image_prompt).map(|prompt| ScenePrompt::new(scene.scene_no, prompt))
            })
            .collect();
        prompts.sort_by_key(|p| p.scene_no);
        prompts
    }

    /// Render as plain script text in the seven-item checklist layout
    pub fn to_script_text(&self) -> String {
        let mut text = String::new();

        for scene in &self.scenes {
            // Writing into a String cannot fail
            let _ = write!(
                text,
                "Scene {}\n\
                 1) 畫面/鏡頭描述：{}\n\
                 2) 旁白：{}\n\
                 3) 情緒/氛圍標籤：{}\n\
                 4) 影片類型標籤：{}\n\
                 5) 視覺風格建議：{}\n\
                 6) 拍攝技巧：{}\n\
                 7) image_prompt：\n\
                 {}\n\n",
                scene.scene_no,
                scene.shot.trim(),
                scene.voiceover.trim(),
                scene.mood_tags.join("、"),
                scene.video_type.trim(),
                scene.visual_style.trim(),
                scene.techniques.trim(),
                normalize_prompt(&scene.image_prompt).unwrap_or_default(),
            );
        }

        text.trim_end().to_string()
    }
}

/// Schema sent to backends that support structured output
pub fn response_schema() -> ResponseSchema {
    let text = serde_json::json!({ "type": "string" });

    ResponseSchema {
        name: "short_video_script".to_string(),
        schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["scenes", "storyboard_text"],
            "properties": {
                "storyboard_text": text,
                "scenes": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": [
                            "scene_no", "shot", "voiceover", "mood_tags",
                            "video_type", "visual_style", "techniques", "image_prompt"
                        ],
                        "properties": {
                            "scene_no": { "type": "integer" },
                            "shot": text,
                            "voiceover": text,
                            "mood_tags": { "type": "array", "items": text },
                            "video_type": text,
                            "visual_style": text,
                            "techniques": text,
                            "image_prompt": text,
                        }
                    }
                }
            }
        }),
    }
}

/// Remove a surrounding ```json ... ``` block if present
fn strip_code_fences(content: &str) -> &str {
    let content = content.trim();

    if let Some(rest) = content.strip_prefix("```") {
        let body = rest.split_once('\n').map_or("", |(_, body)| body);
        return body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::extract_scene_prompts;

    fn scene(scene_no: u32, image_prompt: &str) -> StructuredScene {
        StructuredScene {
            scene_no,
            shot: "中景，緩慢推進".to_string(),
            voiceover: "早安，今天也辛苦了".to_string(),
            mood_tags: vec!["溫暖".to_string(), "療癒".to_string()],
            video_type: "生活風格".to_string(),
            visual_style: "底片感".to_string(),
            techniques: "自然光，手持".to_string(),
            image_prompt: image_prompt.to_string(),
        }
    }

    #[test]
    fn test_from_response_with_fences() {
        let content = "```json\n{\"scenes\":[{\"scene_no\":1,\"image_prompt\":\"窗邊的女性\"}],\"storyboard_text\":\"\"}\n```";
        let script = StructuredScript::from_response(content).unwrap();
        assert_eq!(script.scenes.len(), 1);
        assert_eq!(script.scenes[0].image_prompt, "窗邊的女性");
    }

    #[test]
    fn test_from_response_rejects_prose() {
        let result = StructuredScript::from_response("Scene 1\n這不是 JSON");
        assert!(matches!(result, Err(ServiceError::MalformedOutput(_))));
    }

    #[test]
    fn test_scene_prompts_are_normalized_and_sorted() {
        let script = StructuredScript {
            scenes: vec![scene(2, "「木桌上的咖啡」"), scene(1, "窗邊的女性\n柔光"), scene(3, "   ")],
            storyboard_text: String::new(),
        };
        let prompts = script.scene_prompts();
        assert_eq!(
            prompts,
            vec![
                ScenePrompt::new(1, "窗邊的女性 柔光".to_string()),
                ScenePrompt::new(2, "木桌上的咖啡".to_string()),
            ]
        );
    }

    #[test]
    fn test_rendered_text_extracts_to_same_prompts() {
        let script = StructuredScript {
            scenes: vec![scene(1, "窗邊的女性，柔光灑落"), scene(2, "木桌上的拿鐵")],
            storyboard_text: String::new(),
        };
        let text = script.to_script_text();

        assert!(text.starts_with("Scene 1\n"));
        assert_eq!(extract_scene_prompts(&text), script.scene_prompts());
    }

    #[test]
    fn test_schema_lists_required_scene_fields() {
        let schema = response_schema();
        let required = &schema.schema["properties"]["scenes"]["items"]["required"];
        assert!(required.as_array().unwrap().iter().any(|v| v == "image_prompt"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[]```"), "[]");
    }
}
