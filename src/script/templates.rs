//! Versioned instruction text sent to the generation backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ResponseMode, ScriptRequest};
use crate::extraction::{SceneExtractor, DEFAULT_FALLBACK_MARKER};

/// Prompt template revisions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVersion {
    /// Six-item checklist with a separate `image_prompt` paragraph
    V1,
    /// Seven-item checklist, item 7 is the image prompt
    #[default]
    V2,
}

impl FromStr for TemplateVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" => Ok(TemplateVersion::V1),
            "v2" => Ok(TemplateVersion::V2),
            other => Err(format!("unknown template version: {}", other)),
        }
    }
}

impl fmt::Display for TemplateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateVersion::V1 => write!(f, "v1"),
            TemplateVersion::V2 => write!(f, "v2"),
        }
    }
}

const SHARED_CHECKLIST: &str = "\
1) 畫面/鏡頭描述（可含景別、運鏡、主體與背景）
2) 旁白（口語、精準、吸睛）
3) 情緒/氛圍標籤（2～4 組關鍵詞）
4) 影片類型標籤（沿用指定類型）
5) 視覺風格建議（沿用指定風格，可補充光影/質感）
6) 拍攝技巧（光線、鏡頭、節奏、聲音設計等）
";

const IMAGE_PROMPT_RULES: &str = "需包含主體、場景、關鍵視覺元素、相機與鏡頭感、構圖、光線、材質、配色與風格關鍵字；避免含有文字水印、Logo。\n";

const LANGUAGE_RULE: &str = "語言請使用台灣人習慣的繁體中文（全形標點）。\n";

/// Instruction builder for one template version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptTemplate {
    version: TemplateVersion,
}

impl PromptTemplate {
    pub fn new(version: TemplateVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> TemplateVersion {
        self.version
    }

    /// Fixed style and format rules for a script with `scene_count` scenes
    pub fn system_prompt(&self, scene_count: u8) -> String {
        let mut prompt = format!(
            "你是一位專業的短影音腳本與文案創作者，擅長為品牌量身打造 {n} 分鏡的短影音腳本。\n\
             請依據輸入的品牌主題、影片類型、曝光平台、影片尺寸與視覺風格，設計 {n} 個分鏡（Scene 1～{n}）。\n\
             每個分鏡以「Scene 編號」獨立一行開頭，並需清楚呈現：\n",
            n = scene_count
        );
        prompt.push_str(SHARED_CHECKLIST);

        match self.version {
            TemplateVersion::V1 => {
                prompt.push_str("此外，請為『每個分鏡』產出一段可直接用於文生圖模型的 image_prompt：\n");
                prompt.push_str(IMAGE_PROMPT_RULES);
                prompt.push_str("image_prompt 標籤獨立一行，下一行寫提示詞，提示詞後空一行。\n");
            }
            TemplateVersion::V2 => {
                prompt.push_str("7) image_prompt（可直接用於文生圖模型）\n");
                prompt.push_str(IMAGE_PROMPT_RULES);
                prompt.push_str("第 7 項的標籤獨立一行，下一行寫提示詞，提示詞後空一行。\n");
            }
        }

        prompt.push_str(LANGUAGE_RULE);
        prompt
    }

    /// Per-request instruction with every campaign parameter
    pub fn user_prompt(&self, request: &ScriptRequest, mode: ResponseMode) -> String {
        let mut prompt = format!(
            "品牌：{}\n影片主題：{}\n曝光平台：{}\n影片尺寸：{}\n影片類型：{}\n視覺風格：{}\n語氣/口吻：{}\n分鏡數量：{}\n\n",
            request.brand.trim(),
            request.topic.trim(),
            request.platform.trim(),
            request.aspect_ratio.trim(),
            request.video_type.trim(),
            request.visual_style.trim(),
            request.tone(),
            request.scene_count,
        );

        prompt.push_str(&format!(
            "請依上述條件產出 {} 分鏡腳本，並確保每個分鏡都含有可直接生成圖片的 image_prompt。\n",
            request.scene_count
        ));
        prompt.push_str("image_prompt 不要包含任何品牌名或文字元素，以免生圖出現浮水印或文字。\n");

        match mode {
            ResponseMode::Text => {
                prompt.push_str("請直接輸出純文字腳本，不要使用 JSON 或程式碼區塊。");
            }
            ResponseMode::Structured => {
                prompt.push_str("請依提供的 JSON schema 輸出每個分鏡，");
                prompt.push_str("並同時輸出一段 storyboard_text（純文字整段腳本，方便複製分享）。");
            }
        }

        prompt
    }

    /// Extractor matching the checklist layout this template asks for
    pub fn extractor(&self) -> SceneExtractor {
        let marker = match self.version {
            TemplateVersion::V1 => None,
            TemplateVersion::V2 => Some(DEFAULT_FALLBACK_MARKER),
        };
        SceneExtractor::new().with_fallback_marker(marker)
    }
}
