//! Color assignment for the distinct attribute values.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::warn;

use crate::error::{AnnotateError, Stage};
use crate::oracle::{invoke_as, Oracle};
use crate::prompts::colors_prompt;
use crate::story::ColorAssignment;

/// Assigns a color to one attribute value.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ColorChoice {
    /// The value of the attribute to assign a color to.
    #[serde(rename = "attrVal")]
    pub attr_val: String,
    /// Unique RGB color string for this value (e.g., rgb(118, 185, 71)). Must
    /// not be white and must be visible against a white background.
    pub color: String,
}

/// List of colors for each attribute value.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ColorChoices {
    /// Exactly one entry per provided attribute value, each with a different color.
    pub colors: Vec<ColorChoice>,
}

/// Request one color per value in a single call, then order the result by
/// `scheme`.
pub async fn assign_colors(
    oracle: &dyn Oracle,
    attribute: &str,
    values: &[String],
    scheme: &[String],
    palette: Option<&str>,
) -> Result<Vec<ColorAssignment>, AnnotateError> {
    let prompt = colors_prompt(attribute, palette, values);
    let reply: ColorChoices = invoke_as(oracle, &prompt)
        .await
        .map_err(AnnotateError::oracle(Stage::AssignColors))?;

    let assignments: Vec<ColorAssignment> = reply
        .colors
        .into_iter()
        .map(|c| ColorAssignment {
            value: c.attr_val,
            color: c.color,
        })
        .collect();

    check_coverage(values, &assignments);
    Ok(order_by_scheme(assignments, scheme))
}

/// Stable sort by scheme position; values outside the scheme go last in
/// their original order.
pub fn order_by_scheme(
    mut assignments: Vec<ColorAssignment>,
    scheme: &[String],
) -> Vec<ColorAssignment> {
    assignments.sort_by_key(|a| {
        scheme
            .iter()
            .position(|label| *label == a.value)
            .unwrap_or(scheme.len())
    });
    assignments
}

fn check_coverage(values: &[String], assignments: &[ColorAssignment]) {
    let missing: Vec<&str> = values
        .iter()
        .filter(|v| !assignments.iter().any(|a| &a.value == *v))
        .map(String::as_str)
        .collect();
    let extra: Vec<&str> = assignments
        .iter()
        .filter(|a| !values.contains(&a.value))
        .map(|a| a.value.as_str())
        .collect();

    if !missing.is_empty() || !extra.is_empty() || assignments.len() != values.len() {
        warn!(
            expected = values.len(),
            returned = assignments.len(),
            ?missing,
            ?extra,
            "color assignments do not match the observed values"
        );
    }

    let mut colors: Vec<&str> = assignments.iter().map(|a| a.color.as_str()).collect();
    colors.sort_unstable();
    colors.dedup();
    if colors.len() != assignments.len() {
        warn!("oracle reused a color for different values");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::ScriptedOracle;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn values_of(assignments: &[ColorAssignment]) -> Vec<&str> {
        assignments.iter().map(|a| a.value.as_str()).collect()
    }

    fn fixed_oracle() -> ScriptedOracle {
        ScriptedOracle::new(|_, _| {
            Ok(json!({"colors": [
                {"attrVal": "high", "color": "rgb(200, 0, 0)"},
                {"attrVal": "extra", "color": "rgb(0, 0, 200)"},
                {"attrVal": "low", "color": "rgb(0, 200, 0)"},
                {"attrVal": "medium", "color": "rgb(200, 200, 0)"}
            ]}))
        })
    }

    #[test]
    fn reorders_by_scheme_with_unmatched_last() {
        let assignments: Vec<ColorAssignment> = ["high", "extra", "low", "n/a", "medium"]
            .iter()
            .map(|v| ColorAssignment {
                value: v.to_string(),
                color: format!("c-{v}"),
            })
            .collect();
        let ordered = order_by_scheme(assignments, &strings(&["low", "medium", "high"]));
        assert_eq!(
            values_of(&ordered),
            vec!["low", "medium", "high", "extra", "n/a"]
        );
        assert_eq!(ordered[0].color, "c-low");
    }

    #[tokio::test]
    async fn single_call_and_scheme_order() {
        let oracle = fixed_oracle();
        let values = strings(&["high", "extra", "low", "medium"]);
        let scheme = strings(&["low", "medium", "high"]);
        let out = assign_colors(&oracle, "risk", &values, &scheme, Some("reds"))
            .await
            .unwrap();
        assert_eq!(values_of(&out), vec!["low", "medium", "high", "extra"]);
        assert_eq!(oracle.call_count("ColorChoices"), 1);

        let calls = oracle.calls.lock().unwrap();
        assert!(calls[0].0.contains("palette: reds"));
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let oracle = fixed_oracle();
        let values = strings(&["high", "extra", "low", "medium"]);
        let scheme = strings(&["low", "medium", "high"]);
        let first = assign_colors(&oracle, "risk", &values, &scheme, None)
            .await
            .unwrap();
        let second = assign_colors(&oracle, "risk", &values, &scheme, None)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn wrong_cardinality_passes_through() {
        let oracle = fixed_oracle();
        let out = assign_colors(&oracle, "risk", &strings(&["low"]), &strings(&["low"]), None)
            .await
            .unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].value, "low");
    }
}
