//! Scene prompt extraction
//!
//! Recovers the image-generation prompt of every "Scene N" section in a
//! generated script. The input is free-form model output, so every stage is
//! tolerant: blocks without a recognizable prompt are skipped and a script
//! without scene headers simply yields nothing.

pub mod normalize;
pub mod segment;

pub use normalize::normalize_prompt;
pub use segment::{segment_scenes, SceneBlock};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use segment::SCENE_HEADER_REGEX;

/// An "image prompt" label alone on its line.
///
/// Only indentation, markdown decoration and a checklist numeral such as
/// `7)` may precede the phrase. Content on the same line as the label does
/// not count; the prompt has to start on the following line.
static IMAGE_PROMPT_LABEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?im)^[ \t#*_>\-•]*(?:\d+[)）.][ \t]*)?[*_]*",
        r"(?:image[ _\-]?prompts?|(?:文?生[圖图]|[圖图]像|[圖图]片)提示[詞词])",
        r"[*_]*[ \t]*[:：]?[ \t]*[*_]*[ \t]*\r?\n",
    ))
    .unwrap()
});

/// A numbered checklist line such as `7) 拍攝技巧：...`
static NUMBERED_ITEM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(\d+)[)）][^\n]*\n").unwrap());

/// A line that holds only whitespace, preceded by a line break
static BLANK_LINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

/// Checklist position used as the image prompt when no label is present
pub const DEFAULT_FALLBACK_MARKER: u32 = 7;

/// Image prompt recovered for one scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePrompt {
    /// Scene number from the header
    pub scene_no: u32,
    /// Single-line, non-empty prompt text
    pub prompt: String,
}

impl ScenePrompt {
    pub fn new(scene_no: u32, prompt: String) -> Self {
        Self { scene_no, prompt }
    }
}

/// Configurable scene prompt extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneExtractor {
    fallback_marker: Option<u32>,
}

impl Default for SceneExtractor {
    fn default() -> Self {
        Self {
            fallback_marker: Some(DEFAULT_FALLBACK_MARKER),
        }
    }
}

impl SceneExtractor {
    /// Create an extractor with the default `7)` fallback
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the checklist number used by the fallback, or disable it with `None`
    pub fn with_fallback_marker(mut self, marker: Option<u32>) -> Self {
        self.fallback_marker = marker;
        self
    }

    /// Get the fallback checklist number
    pub fn fallback_marker(&self) -> Option<u32> {
        self.fallback_marker
    }

    /// Extract prompts from a complete script, sorted by scene number.
    ///
    /// Equal scene numbers keep their order of appearance.
    pub fn extract(&self, text: &str) -> Vec<ScenePrompt> {
        let mut prompts: Vec<ScenePrompt> = Vec::new();

        for block in segment_scenes(text) {
            let Some(prompt) = self.locate_prompt(block.body) else {
                debug!("No image prompt found in block {:?}", block.scene_number);
                continue;
            };

            // Unparsable headers are numbered after the prompts accepted so far
            let scene_no = block
                .scene_number
                .unwrap_or(prompts.len() as u32 + 1);
            prompts.push(ScenePrompt::new(scene_no, prompt));
        }

        prompts.sort_by_key(|p| p.scene_no);
        debug!("Extracted {} scene prompts", prompts.len());
        prompts
    }

    fn locate_prompt(&self, body: &str) -> Option<String> {
        labelled_prompt(body).or_else(|| {
            self.fallback_marker
                .and_then(|marker| numbered_item_prompt(body, marker))
        })
    }
}

/// Extract prompts with the default extractor
pub fn extract_scene_prompts(text: &str) -> Vec<ScenePrompt> {
    SceneExtractor::default().extract(text)
}

fn labelled_prompt(body: &str) -> Option<String> {
    IMAGE_PROMPT_LABEL_REGEX
        .find_iter(body)
        .find_map(|label| capture_paragraph(body, label.end() - 1))
}

fn numbered_item_prompt(body: &str, marker: u32) -> Option<String> {
    NUMBERED_ITEM_REGEX
        .captures_iter(body)
        .filter(|caps| caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) == Some(marker))
        .filter_map(|caps| caps.get(0))
        .find_map(|line| capture_paragraph(body, line.end() - 1))
}

/// Capture the paragraph that follows the line break at `newline`.
///
/// Stops at the first blank line, the next scene header or the end of the
/// block. A leading bullet is left in place for [`normalize_prompt`].
fn capture_paragraph(body: &str, newline: usize) -> Option<String> {
    let rest = &body[newline..];
    let content = &rest[1..];

    let blank_line = BLANK_LINE_REGEX.find(rest).map_or(rest.len(), |m| m.start());
    let next_header = SCENE_HEADER_REGEX
        .find(content)
        .map_or(rest.len(), |m| m.start() + 1);
    let end = blank_line.min(next_header);

    normalize_prompt(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SCENES: &str = "\
Scene 1
1) 畫面：清晨的窗邊
image_prompt:
一位女性站在窗邊，柔光灑落

Scene 2
1) 畫面：咖啡特寫
image_prompt:
一杯拿鐵放在木桌上，蒸氣緩緩升起

";

    #[test]
    fn test_labelled_prompts_per_scene() {
        let prompts = extract_scene_prompts(TWO_SCENES);
        assert_eq!(
            prompts,
            vec![
                ScenePrompt::new(1, "一位女性站在窗邊，柔光灑落".to_string()),
                ScenePrompt::new(2, "一杯拿鐵放在木桌上，蒸氣緩緩升起".to_string()),
            ]
        );
    }

    #[test]
    fn test_label_with_inline_content_is_skipped() {
        let text = "Scene 1\nimage_prompt: 一位女性站在窗邊\n\n";
        assert!(extract_scene_prompts(text).is_empty());
    }

    #[test]
    fn test_numbered_fallback() {
        let text = "Scene 2\n6) 視覺風格：暖色調\n7) 拍攝技巧：慢速推軌\n一杯咖啡在木桌上冒著熱氣\n\n旁白：早安";
        let prompts = extract_scene_prompts(text);
        assert_eq!(
            prompts,
            vec![ScenePrompt::new(2, "一杯咖啡在木桌上冒著熱氣".to_string())]
        );
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let text = "Scene 2\n7) 拍攝技巧：慢速推軌\n一杯咖啡在木桌上冒著熱氣\n";
        let extractor = SceneExtractor::new().with_fallback_marker(None);
        assert!(extractor.extract(text).is_empty());
    }

    #[test]
    fn test_fallback_ignores_other_numbers() {
        let text = "Scene 1\n17) 其他\n不是提示詞\n";
        assert!(extract_scene_prompts(text).is_empty());
    }

    #[test]
    fn test_label_takes_precedence_over_fallback() {
        let text = "Scene 1\n7) 拍攝技巧\n錯誤的內容\n\nImage Prompt：\n正確的內容\n";
        let prompts = extract_scene_prompts(text);
        assert_eq!(prompts[0].prompt, "正確的內容");
    }

    #[test]
    fn test_duplicate_scene_numbers_are_kept_in_order() {
        let text = "Scene 1\nimage prompt\n第一個\n\nScene 1\nimage prompt\n第二個\n\nScene 3\nimage prompt\n第三個\n";
        let prompts = extract_scene_prompts(text);
        let pairs: Vec<_> = prompts.iter().map(|p| (p.scene_no, p.prompt.as_str())).collect();
        assert_eq!(pairs, vec![(1, "第一個"), (1, "第二個"), (3, "第三個")]);
    }

    #[test]
    fn test_output_is_sorted_by_scene_number() {
        let text = "Scene 3\nimage-prompt\nc\n\nScene 1\nimage-prompt\na\n\nScene 2\nimage-prompt\nb\n";
        let numbers: Vec<_> = extract_scene_prompts(text).iter().map(|p| p.scene_no).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_scene_prompts("").is_empty());
    }

    #[test]
    fn test_text_without_headers() {
        let text = "image_prompt:\n一位女性站在窗邊\n";
        assert!(extract_scene_prompts(text).is_empty());
    }

    #[test]
    fn test_only_first_paragraph_is_captured() {
        let text = "Scene 1\nimage_prompt：\n第一段\n第一段續\n\n第二段\n";
        let prompts = extract_scene_prompts(text);
        assert_eq!(prompts[0].prompt, "第一段 第一段續");
    }

    #[test]
    fn test_capture_stops_at_next_scene_without_blank_line() {
        let text = "Scene 1\nimage_prompt:\n窗邊的女性\nScene 2\nimage_prompt:\n木桌上的咖啡";
        let prompts = extract_scene_prompts(text);
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].prompt, "窗邊的女性");
        assert_eq!(prompts[1].prompt, "木桌上的咖啡");
    }

    #[test]
    fn test_bullets_quotes_and_markdown_labels() {
        let text = "## Scene 1\n**生圖提示詞**：\n- 「晨光中的女性，電影感」\n\n### Scene 2\n圖像提示詞\n• “a steaming latte, 35mm”\n";
        let prompts = extract_scene_prompts(text);
        assert_eq!(prompts[0].prompt, "晨光中的女性，電影感");
        assert_eq!(prompts[1].prompt, "a steaming latte, 35mm");
    }

    #[test]
    fn test_multiline_prompt_is_single_line() {
        let text = "Scene 1\nIMAGE PROMPT:\r\n  女性站在窗邊，\r\n  柔光灑落，\r\n  淺景深\r\n\r\n";
        let prompts = extract_scene_prompts(text);
        assert_eq!(prompts[0].prompt, "女性站在窗邊， 柔光灑落， 淺景深");
        assert!(prompts.iter().all(|p| !p.prompt.contains('\n')));
    }

    #[test]
    fn test_empty_label_paragraph_falls_back() {
        let text = "Scene 1\n7) 拍攝技巧\n備援內容\n\nimage_prompt:\n\n很後面的段落\n";
        let prompts = extract_scene_prompts(text);
        assert_eq!(prompts[0].prompt, "備援內容");
    }

    #[test]
    fn test_unparsable_header_uses_accepted_count() {
        let text = "Scene 5\nimage_prompt:\na\n\nScene 6\n沒有提示\n\nScene 99999999999999999999\nimage_prompt:\nb\n";
        let prompts = extract_scene_prompts(text);
        let pairs: Vec<_> = prompts.iter().map(|p| (p.scene_no, p.prompt.as_str())).collect();
        assert_eq!(pairs, vec![(2, "b"), (5, "a")]);
    }

    #[test]
    fn test_label_mentioned_in_prose_is_ignored() {
        let text = "Scene 1\n2) 旁白：今天來聊聊什麼是 image prompt\n3) 情緒：好奇\n\n7) image_prompt：\n真正的提示詞\n";
        let prompts = extract_scene_prompts(text);
        assert_eq!(prompts, vec![ScenePrompt::new(1, "真正的提示詞".to_string())]);
    }

    #[test]
    fn test_label_after_checklist_numeral_and_bullet() {
        let text = "Scene 1\n- **7. 文生圖提示詞**：\n海邊的燈塔\n\nScene 2\n旁白：我們的生圖提示詞\n很長\n";
        let prompts = extract_scene_prompts(text);
        assert_eq!(prompts, vec![ScenePrompt::new(1, "海邊的燈塔".to_string())]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        assert_eq!(extract_scene_prompts(TWO_SCENES), extract_scene_prompts(TWO_SCENES));
    }
}
