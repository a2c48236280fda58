//! Single-shot questions over story data.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{AnnotateError, Stage};
use crate::oracle::{invoke_as, Oracle};
use crate::prompts::{ask_prompt, find_chapter_prompt};

/// Chapter reported when the question can't be answered from the data.
pub const NO_CHAPTER: &str = "N/A";

/// The chapter that answers a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChapterAnswer {
    /// The chapter that contains the answer, exactly as named in the data, or "N/A".
    pub chapter: String,
    /// Brief explanation of why this chapter contains the answer.
    pub explanation: String,
}

impl ChapterAnswer {
    pub fn is_answered(&self) -> bool {
        !self.chapter.trim().eq_ignore_ascii_case(NO_CHAPTER)
    }
}

/// Answer `question` in one or two sentences using only `data`.
pub async fn ask_question(
    oracle: &dyn Oracle,
    data: &Value,
    question: &str,
) -> Result<String, AnnotateError> {
    let question = non_empty(question)?;
    let answer = oracle
        .complete(&ask_prompt(question, data))
        .await
        .map_err(AnnotateError::oracle(Stage::AskQuestion))?;
    debug!(chars = answer.len(), "question answered");
    Ok(answer)
}

/// Find the chapter in `data` that answers `question`.
pub async fn find_chapter(
    oracle: &dyn Oracle,
    data: &Value,
    question: &str,
) -> Result<ChapterAnswer, AnnotateError> {
    let question = non_empty(question)?;
    let answer: ChapterAnswer = invoke_as(oracle, &find_chapter_prompt(question, data))
        .await
        .map_err(AnnotateError::oracle(Stage::FindChapter))?;
    debug!(chapter = %answer.chapter, "chapter located");
    Ok(answer)
}

fn non_empty(question: &str) -> Result<&str, AnnotateError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AnnotateError::invalid_input("question is empty"));
    }
    Ok(question)
}
