// Prompt templates for story generation, splitting and illustration.
// Placeholders are `{name}` and are filled with str::replace.

use crate::generation::collaborators::StoryRequest;

pub const STORY_END_MARKER: &str = "###END###";

/// Story prompt template. Replace every `{…}` before sending.
pub const STORY_PROMPT_TEMPLATE: &str = r#"あなたは日本の小学生向けの読み物を書く作家です。
小学{grade}年生が一人で読める、短いお話を書いてください。

条件:
- 小学{grade}年生までに習う漢字だけを使うこと。それより上の学年の漢字は、ひらがなで書くこと。
- 次の漢字をそれぞれ{min_freq}回以上使うこと: {kanji_list}
- 本文は{wc_min}字から{wc_max}字まで。
- 本文の最後に {end_marker} と書くこと。
{idea_line}
次の形のJSONだけを返してください:
{"title": "題名", "story": "本文{end_marker}"}"#;

/// Split prompt template. Replace every `{…}` before sending.
pub const SPLIT_PROMPT_TEMPLATE: &str = r#"Split the Japanese story below into EXACTLY {pieces} consecutive pieces for an illustrated reader.

Rules:
- Copy the story text verbatim. Do not rewrite, summarize or drop any sentence.
- Pieces must be in story order and together cover the whole story.
- For each piece, write an English illustration prompt describing one scene from that piece.
- Keep characters visually consistent across prompts: give each recurring character a short tag such as [RIN] and describe them the same way every time.
- Every prompt must mention the art style "{style}".

Return JSON only, with exactly {pieces} entries:
{"pieces": [{"text": "...", "prompt": "..."}]}

STORY:
{story}"#;

pub fn story_prompt(request: &StoryRequest) -> String {
    let kanji_list = request
        .kanji
        .iter()
        .map(char::to_string)
        .collect::<Vec<_>>()
        .join("、");
    let idea_line = match request.idea.as_deref().map(str::trim) {
        Some(idea) if !idea.is_empty() => format!("- お話のアイデア: {idea}\n"),
        _ => String::new(),
    };

    STORY_PROMPT_TEMPLATE
        .replace("{grade}", &request.grade.to_string())
        .replace("{min_freq}", &request.min_freq.to_string())
        .replace("{kanji_list}", &kanji_list)
        .replace("{wc_min}", &request.wc_range.0.to_string())
        .replace("{wc_max}", &request.wc_range.1.to_string())
        .replace("{end_marker}", STORY_END_MARKER)
        .replace("{idea_line}", &idea_line)
}

pub fn split_prompt(story: &str, pieces: usize, style: &str) -> String {
    // Story last: it is model-generated text and may itself contain braces.
    SPLIT_PROMPT_TEMPLATE
        .replace("{pieces}", &pieces.to_string())
        .replace("{style}", style)
        .replace("{story}", story)
}

/// Final image prompt: `{{'Art style': STYLE}, PROMPT}`.
pub fn illustration_prompt(style: &str, prompt: &str) -> String {
    format!("{{{{'Art style': {style}}}, {prompt}}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(idea: Option<&str>) -> StoryRequest {
        StoryRequest {
            grade: 3,
            kanji: vec!['海', '魚'],
            min_freq: 5,
            wc_range: (2000, 3000),
            idea: idea.map(str::to_string),
        }
    }

    #[test]
    fn test_story_prompt_fills_every_placeholder() {
        let prompt = story_prompt(&request(Some("海の冒険")));
        assert!(prompt.contains("小学3年生"));
        assert!(prompt.contains("海、魚"));
        assert!(prompt.contains("5回以上"));
        assert!(prompt.contains("2000字から3000字"));
        assert!(prompt.contains("お話のアイデア: 海の冒険"));
        assert!(prompt.contains(STORY_END_MARKER));
        for placeholder in ["{grade}", "{kanji_list}", "{wc_min}", "{idea_line}", "{end_marker}"] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
    }

    #[test]
    fn test_story_prompt_without_idea() {
        let prompt = story_prompt(&request(Some("  ")));
        assert!(!prompt.contains("アイデア"));
    }

    #[test]
    fn test_split_prompt() {
        let prompt = split_prompt("むかしむかし{pieces}", 3, "Colored Pencil sketch");
        assert!(prompt.contains("EXACTLY 3 consecutive pieces"));
        assert!(prompt.contains("\"Colored Pencil sketch\""));
        assert!(prompt.ends_with("むかしむかし{pieces}"));
    }

    #[test]
    fn test_illustration_prompt_format() {
        assert_eq!(
            illustration_prompt("Watercolor", "a girl by the sea"),
            "{{'Art style': Watercolor}, a girl by the sea}"
        );
    }
}
