//! Prompt templates for the annotation pipelines.
//!
//! Templates use `{name}` placeholders. Rendering is single-pass, so a value
//! that itself contains `{...}` is never re-expanded.

use serde::Serialize;

use crate::story::{Scene, StoryEntity, StoryType};

/// A prompt template with placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub text: &'static str,
}

impl PromptTemplate {
    /// Substitute `vars` into the template. Unknown placeholders are kept verbatim.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out.trim().to_string();
            };
            let key = &after[..close];
            match vars.iter().find(|(name, _)| *name == key) {
                Some((_, value)) => out.push_str(value),
                None => {
                    out.push('{');
                    out.push_str(key);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out.trim().to_string()
    }
}

pub const CATEGORIES: PromptTemplate = PromptTemplate {
    slug: "categories_v1",
    text: r#"
Your job is to come up with a list of possible values for the attribute: "{attribute}".

If the attribute is categorical, list categories that multiple {story_type}s could fall into
(e.g., "male", "female", "n/a" or "happy", "sad", "angry", "tired", etc.).

If the attribute is continuous, list ranges that multiple {story_type}s could fall into.
Make sure the ranges don't overlap
(e.g., "low", "medium", "high" or "0-10", "11-20", "21-30", "31-40", etc.).

In either case, limit the total number of unique values as much as possible.
"#,
};

pub const ASSIGN_BATCH: PromptTemplate = PromptTemplate {
    slug: "assign_batch_v1",
    text: r#"
Assign each {story_type} in this list a value for the attribute: "{attribute}",
only picking from this set of possible values: {categories}.
If the {story_type} doesn't fit any of the categories, label it as "n/a" or "other".
Return exactly one entry per {story_type}, using the name exactly as given.

{story_type}s:
{entities}
"#,
};

pub const COLORS: PromptTemplate = PromptTemplate {
    slug: "colors_v1",
    text: r#"
Assign a color for each unique value of the attribute: "{attribute}".
{palette}
Use RGB color strings (e.g., rgb(118, 185, 71)). Every value must get a different color.
Don't use white, and make sure each color is visible against a white background.
Return exactly one entry per value and don't add any new values.

Unique attribute values:
{values}
"#,
};

pub const RATE_SCENE: PromptTemplate = PromptTemplate {
    slug: "rate_scene_v1",
    text: r#"
Assign each {story_type} a rating between 0: least {axis} to 1: most {axis} for this scene,
based on the provided information.
Make sure to assign a rating to every {story_type}, and don't add any new {story_type}s.

Scene:
{scene}
"#,
};

pub const ASK: PromptTemplate = PromptTemplate {
    slug: "ask_v1",
    text: r#"
Answer this question: "{question}" using only the provided information:

{data}

Keep your answer brief, using 1-2 sentences max.
"#,
};

pub const FIND_CHAPTER: PromptTemplate = PromptTemplate {
    slug: "find_chapter_v1",
    text: r#"
Identify which chapter can answer this question: "{question}"
Use the exact chapter name found in the "chapter" field of the data
(e.g., "Chapter 1: The Beginning" or "XVII.").

Chapter data:
{data}

If the question is not relevant to this story (e.g., asks about characters who
don't exist), or you can't find the answer in any chapter, write "N/A" for the
chapter and explanation.
"#,
};

fn json_text<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

pub fn categories_prompt(attribute: &str, story_type: StoryType) -> String {
    CATEGORIES.render(&[
        ("attribute", attribute),
        ("story_type", story_type.as_str()),
    ])
}

pub fn assign_batch_prompt(
    attribute: &str,
    story_type: StoryType,
    categories: &[String],
    batch: &[StoryEntity],
) -> String {
    ASSIGN_BATCH.render(&[
        ("attribute", attribute),
        ("story_type", story_type.as_str()),
        ("categories", &serde_json::to_string(categories).unwrap_or_default()),
        ("entities", &json_text(batch)),
    ])
}

pub fn colors_prompt(attribute: &str, palette: Option<&str>, values: &[String]) -> String {
    let palette = palette
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("Choose colors based on this palette: {p}."))
        .unwrap_or_default();
    COLORS.render(&[
        ("attribute", attribute),
        ("palette", &palette),
        ("values", &serde_json::to_string(values).unwrap_or_default()),
    ])
}

pub fn rate_scene_prompt(axis: &str, story_type: StoryType, scene: &Scene) -> String {
    RATE_SCENE.render(&[
        ("axis", axis),
        ("story_type", story_type.as_str()),
        ("scene", &json_text(scene)),
    ])
}

pub fn ask_prompt(question: &str, data: &serde_json::Value) -> String {
    ASK.render(&[("question", question), ("data", &json_text(data))])
}

pub fn find_chapter_prompt(question: &str, data: &serde_json::Value) -> String {
    FIND_CHAPTER.render(&[("question", question), ("data", &json_text(data))])
}
