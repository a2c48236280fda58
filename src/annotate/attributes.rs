//! Batched attribute assignment.
//!
//! Entities are split into contiguous batches, one oracle call per batch runs
//! through [`fan_out`], and the replies are concatenated in batch order. The
//! observed values are then deduplicated in first-seen order.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::PipelineSettings;
use crate::error::{AnnotateError, Stage};
use crate::fanout::{fan_out, partition};
use crate::oracle::{invoke_as, Oracle, OracleError};
use crate::prompts::assign_batch_prompt;
use crate::story::{AttributeRecord, StoryEntity, StoryType};

/// Value used when the oracle picks something outside the scheme.
pub const FALLBACK_VALUE: &str = "n/a";

/// Values the oracle may use when nothing in the scheme fits.
pub const SENTINELS: &[&str] = &["n/a", "other"];

/// Assigns an attribute value to one entity.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EntityAttribute {
    /// The entity to assign a value to, exactly as named in the input.
    pub character: String,
    /// The value of the attribute to assign to the entity.
    #[serde(rename = "attrVal")]
    pub attr_val: String,
    /// Explanation of why the entity was assigned this attribute value.
    pub explanation: String,
}

/// List of attribute values for every entity in the batch.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EntityAttributes {
    /// List of entities and their attribute values.
    pub characters: Vec<EntityAttribute>,
}

/// Merged output of the assignment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// One record per returned entity, in input order.
    pub records: Vec<AttributeRecord>,
    /// Distinct values in first-seen order.
    pub observed_values: Vec<String>,
}

/// Assign every entity a value from `scheme`.
///
/// Any failing batch fails the whole step; the error lists every failed batch.
pub async fn assign_attributes(
    oracle: &dyn Oracle,
    entities: &[StoryEntity],
    attribute: &str,
    scheme: &[String],
    story_type: StoryType,
    settings: &PipelineSettings,
) -> Result<Assignment, AnnotateError> {
    let batches = partition(entities, settings.batch_size);
    let total = batches.len();
    debug!(
        entities = entities.len(),
        batches = total,
        batch_size = settings.batch_size,
        "dispatching attribute batches"
    );

    let replies = fan_out(batches, settings.max_concurrency, |index, batch| async move {
        let prompt = assign_batch_prompt(attribute, story_type, scheme, &batch);
        let reply: EntityAttributes = invoke_as(oracle, &prompt).await?;
        if reply.characters.len() != batch.len() {
            warn!(
                batch = index,
                expected = batch.len(),
                returned = reply.characters.len(),
                "oracle returned wrong number of entities for batch"
            );
        }
        Ok::<_, OracleError>(reply.characters)
    })
    .await
    .map_err(|failures| AnnotateError::FanOut {
        stage: Stage::AssignAttributes,
        total,
        failures,
    })?;

    let mut records = Vec::with_capacity(entities.len());
    for item in replies.into_iter().flatten() {
        let value = if settings.normalize_values {
            normalize_value(&item.attr_val, scheme)
        } else {
            item.attr_val
        };
        records.push(AttributeRecord {
            name: item.character,
            value,
            explanation: item.explanation,
        });
    }

    if records.len() != entities.len() {
        warn!(
            expected = entities.len(),
            returned = records.len(),
            "attribute record count differs from entity count"
        );
    }

    let observed_values = observed_values(&records);
    Ok(Assignment {
        records,
        observed_values,
    })
}

/// Distinct record values in first-seen order.
pub fn observed_values(records: &[AttributeRecord]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::new();
    for record in records {
        if seen.insert(record.value.as_str()) {
            ordered.push(record.value.clone());
        }
    }
    ordered
}

/// Map `value` onto the scheme.
///
/// Exact matches pass through. Otherwise a case and whitespace insensitive
/// match yields the canonical scheme label, a sentinel yields its lowercase
/// form, and anything else becomes [`FALLBACK_VALUE`].
pub fn normalize_value(value: &str, scheme: &[String]) -> String {
    if scheme.iter().any(|label| label == value) {
        return value.to_string();
    }

    let key = fold(value);
    if let Some(label) = scheme.iter().find(|label| fold(label) == key) {
        return label.clone();
    }
    if let Some(sentinel) = SENTINELS.iter().find(|s| **s == key) {
        return sentinel.to_string();
    }

    warn!(value, "attribute value outside the scheme, using fallback");
    FALLBACK_VALUE.to_string()
}

fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
