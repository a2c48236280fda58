//! Category induction: one oracle call producing the value scheme for an attribute.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AnnotateError, Stage};
use crate::oracle::{invoke_as, Oracle};
use crate::prompts::categories_prompt;
use crate::story::StoryType;

/// List of categories for an attribute.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CategoryList {
    /// List of categories for the attribute.
    pub categories: Vec<String>,
}

/// Ask the oracle for the ordered value scheme of `attribute`.
///
/// Labels are trimmed, blanks dropped and duplicates removed keeping the first
/// occurrence. The oracle error propagates unchanged.
pub async fn induce_categories(
    oracle: &dyn Oracle,
    attribute: &str,
    story_type: StoryType,
) -> Result<Vec<String>, AnnotateError> {
    let prompt = categories_prompt(attribute, story_type);
    let reply: CategoryList = invoke_as(oracle, &prompt)
        .await
        .map_err(AnnotateError::oracle(Stage::InduceCategories))?;

    let raw_len = reply.categories.len();
    let scheme = dedup_labels(reply.categories);
    if scheme.is_empty() {
        warn!(attribute, "oracle returned no categories");
    }
    debug!(attribute, raw_len, categories = ?scheme, "categories induced");
    Ok(scheme)
}

fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut scheme: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if label.is_empty() || scheme.iter().any(|seen| seen == label) {
            continue;
        }
        scheme.push(label.to_string());
    }
    scheme
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::ScriptedOracle;
    use crate::oracle::OracleError;
    use serde_json::json;

    #[test]
    fn dedup_keeps_first_occurrence_and_drops_blanks() {
        let labels = ["low", " medium ", "", "low", "high", "   ", "medium"]
            .map(String::from)
            .to_vec();
        assert_eq!(dedup_labels(labels), vec!["low", "medium", "high"]);
    }

    #[tokio::test]
    async fn induces_scheme_from_single_call() {
        let oracle = ScriptedOracle::new(|prompt, schema| {
            assert_eq!(schema, "CategoryList");
            assert!(prompt.contains("\"gender\""));
            assert!(prompt.contains("multiple characters"));
            Ok(json!({"categories": ["male", "female", "male", "n/a"]}))
        });
        let scheme = induce_categories(&oracle, "gender", StoryType::Character)
            .await
            .unwrap();
        assert_eq!(scheme, vec!["male", "female", "n/a"]);
        assert_eq!(oracle.call_count("CategoryList"), 1);
    }

    #[tokio::test]
    async fn oracle_failure_is_tagged_with_stage() {
        let oracle = ScriptedOracle::new(|_, _| Err(OracleError::Parse("garbled".into())));
        let err = induce_categories(&oracle, "mood", StoryType::Theme)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::Oracle {
                stage: Stage::InduceCategories,
                source: OracleError::Parse(_)
            }
        ));
    }
}
