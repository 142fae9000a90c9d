//! Scene header detection and block segmentation

use once_cell::sync::Lazy;
use regex::Regex;

/// A "Scene N" header at the start of a line.
///
/// Leading indentation and heading or emphasis decoration (`## `, `**`, `> `,
/// `【`) are tolerated. List bullets are not, so a narration item such as
/// "- scene 2 的光線" stays inside its block, and the word must open the
/// line, so "旁白：這個 scene 2 的光線" never starts a new block either.
pub(crate) static SCENE_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t#*_>\[【]*scene[ \t]*(\d+)").unwrap()
});

/// The text belonging to one scene, header included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneBlock<'a> {
    /// Numeral from the header, `None` when it could not be parsed
    pub scene_number: Option<u32>,
    /// Span from the header up to the next header or end of text
    pub body: &'a str,
}

/// Split a script into scene blocks, in order of appearance.
///
/// Text before the first header is ignored. No headers yields no blocks.
pub fn segment_scenes(text: &str) -> Vec<SceneBlock<'_>> {
    let headers: Vec<_> = SCENE_HEADER_REGEX.captures_iter(text).collect();

    headers
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let start = caps.get(0)?.start();
            let end = headers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let scene_number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());

            Some(SceneBlock {
                scene_number,
                body: &text[start..end],
            })
        })
        .collect()
}
