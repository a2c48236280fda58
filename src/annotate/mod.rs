//! The colors pipeline: induce a scheme, assign values in batches, color the
//! distinct values.
//!
//! The three steps run strictly in sequence. Only the assignment step fans out.

mod attributes;
mod categories;
mod colors;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::config::PipelineSettings;
use crate::error::AnnotateError;
use crate::oracle::Oracle;
use crate::story::{AttributeRecord, ColorAssignment, StoryEntity, StoryType};

pub use attributes::{
    assign_attributes, normalize_value, observed_values, Assignment, EntityAttribute,
    EntityAttributes, FALLBACK_VALUE, SENTINELS,
};
pub use categories::{induce_categories, CategoryList};
pub use colors::{assign_colors, order_by_scheme, ColorChoice, ColorChoices};

/// Explanation attached by [`apply_attribute`] when an entity got no record.
pub const MISSING_EXPLANATION: &str = "No explanation provided.";

/// Result of [`run_colors`], shaped like the `/new_colors` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorsOutput {
    pub char_attrs: Vec<AttributeRecord>,
    pub color_assignments: Vec<ColorAssignment>,
    /// Induced scheme; not part of the wire response.
    #[serde(skip)]
    pub categories: Vec<String>,
}

/// Run the full colors pipeline for `attribute` over `entities`.
pub async fn run_colors(
    oracle: &dyn Oracle,
    entities: &[StoryEntity],
    attribute: &str,
    palette: Option<&str>,
    story_type: StoryType,
    settings: &PipelineSettings,
) -> Result<ColorsOutput, AnnotateError> {
    let attribute = attribute.trim();
    if attribute.is_empty() {
        return Err(AnnotateError::invalid_input("attribute name is empty"));
    }

    let run_id = Uuid::new_v4();
    let span = info_span!("colors", %run_id, attribute, story_type = %story_type);

    async move {
        let started = Instant::now();
        info!(entities = entities.len(), "colors pipeline started");

        let scheme = induce_categories(oracle, attribute, story_type).await?;
        info!(categories = ?scheme, "categories induced");

        let assignment =
            assign_attributes(oracle, entities, attribute, &scheme, story_type, settings).await?;
        info!(
            records = assignment.records.len(),
            values = ?assignment.observed_values,
            "attributes assigned"
        );

        let color_assignments = assign_colors(
            oracle,
            attribute,
            &assignment.observed_values,
            &scheme,
            palette,
        )
        .await?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            colors = color_assignments.len(),
            "colors pipeline finished"
        );
        Ok::<_, AnnotateError>(ColorsOutput {
            char_attrs: assignment.records,
            color_assignments,
            categories: scheme,
        })
    }
    .instrument(span)
    .await
}

/// Attach each entity's record under the lowercased attribute key as
/// `{val, exp}`. Entities without a record get `"n/a"` and a stock explanation.
pub fn apply_attribute(entities: &mut [StoryEntity], attribute: &str, records: &[AttributeRecord]) {
    let key = attribute.trim().to_lowercase();
    for entity in entities.iter_mut() {
        let record = records.iter().find(|r| r.name == entity.name);
        let value = record
            .map(|r| r.value.as_str())
            .filter(|v| !v.is_empty())
            .unwrap_or(FALLBACK_VALUE);
        let explanation = record
            .map(|r| r.explanation.as_str())
            .filter(|e| !e.is_empty())
            .unwrap_or(MISSING_EXPLANATION);
        entity.fields.insert(
            key.clone(),
            json!({ "val": value, "exp": explanation }),
        );
    }
}

/// Attribute `{val, exp}` previously attached by [`apply_attribute`].
pub fn attribute_of<'a>(entity: &'a StoryEntity, attribute: &str) -> Option<&'a Value> {
    entity.fields.get(&attribute.trim().to_lowercase())
}
