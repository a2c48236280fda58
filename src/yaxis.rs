//! The y-axis pipeline: rate every entity in every scene, then turn the
//! ratings into dense per-scene ranks.

use std::time::Instant;

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PipelineSettings;
use crate::error::{AnnotateError, Stage};
use crate::fanout::fan_out;
use crate::oracle::{invoke_as, Oracle, OracleError};
use crate::prompts::rate_scene_prompt;
use crate::story::{Scene, StoryType};

/// Assigns a rating to one entity in a scene.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct EntityRating {
    /// The entity to rate, exactly as named in the scene.
    pub character: String,
    /// The rating (between 0 and 1) for this entity.
    pub rating: f64,
}

/// List of ratings for all entities in a scene.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SceneRatings {
    /// List of entities and their ratings in this scene.
    pub characters: Vec<EntityRating>,
}

/// Rate `axis` for every scene, one oracle call per scene.
///
/// Returns the raw ratings positionally aligned with `scenes`.
pub async fn rate_scenes(
    oracle: &dyn Oracle,
    scenes: &[Scene],
    axis: &str,
    story_type: StoryType,
    settings: &PipelineSettings,
) -> Result<Vec<Vec<EntityRating>>, AnnotateError> {
    let total = scenes.len();
    debug!(scenes = total, "dispatching scene ratings");

    let inputs: Vec<&Scene> = scenes.iter().collect();
    fan_out(inputs, settings.max_concurrency, |index, scene| async move {
        let prompt = rate_scene_prompt(axis, story_type, scene);
        let reply: SceneRatings = invoke_as(oracle, &prompt).await?;
        debug!(scene = index, ratings = reply.characters.len(), "scene rated");
        Ok::<_, OracleError>(reply.characters)
    })
    .await
    .map_err(|failures| AnnotateError::FanOut {
        stage: Stage::RateScenes,
        total,
        failures,
    })
}

/// Store each rating on the scene entity with exactly the same name.
///
/// Any value already under `axis` is cleared first, so entities the oracle
/// skipped end up unrated. Ratings for names not in the scene are dropped.
/// Returns how many were dropped.
pub fn merge_ratings(scene: &mut Scene, axis: &str, ratings: Vec<EntityRating>) -> usize {
    for entity in &mut scene.characters {
        entity.fields.remove(axis);
    }

    let mut unmatched = 0;
    for EntityRating { character, rating } in ratings {
        match scene.entity_mut(&character) {
            Some(entity) => entity.set_axis_value(axis, rating),
            None => {
                warn!(character = %character, axis, "rating for unknown entity dropped");
                unmatched += 1;
            }
        }
    }
    unmatched
}

/// Replace each entity's rating under `axis` with its 1-based rank.
///
/// Missing ratings count as 0. Ties keep input order, so ranks are always
/// `1..=k` with no repeats. The raw ratings are discarded.
pub fn rank_scene(scene: &mut Scene, axis: &str) {
    let mut order: Vec<(usize, f64)> = scene
        .characters
        .iter()
        .enumerate()
        .map(|(i, entity)| (i, entity.axis_value(axis).unwrap_or(0.0)))
        .collect();
    // Stable, so equal ratings stay in input order.
    order.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (position, (index, _)) in order.into_iter().enumerate() {
        scene.characters[index].set_axis_value(axis, (position + 1) as u64);
    }
}

/// Run the full y-axis pipeline and return the scenes with ranks attached.
pub async fn run_yaxis(
    oracle: &dyn Oracle,
    mut scenes: Vec<Scene>,
    axis: &str,
    story_type: StoryType,
    settings: &PipelineSettings,
) -> Result<Vec<Scene>, AnnotateError> {
    let axis = axis.trim();
    if axis.is_empty() {
        return Err(AnnotateError::invalid_input("axis name is empty"));
    }
    if axis == "name" {
        return Err(AnnotateError::invalid_input(
            "axis name `name` would overwrite entity names",
        ));
    }

    let run_id = Uuid::new_v4();
    let span = info_span!("yaxis", %run_id, axis, story_type = %story_type);

    async move {
        let started = Instant::now();
        info!(scenes = scenes.len(), "y-axis pipeline started");

        let ratings = rate_scenes(oracle, &scenes, axis, story_type, settings).await?;

        let mut dropped = 0;
        for (scene, scene_ratings) in scenes.iter_mut().zip(ratings) {
            dropped += merge_ratings(scene, axis, scene_ratings);
            rank_scene(scene, axis);
        }

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            dropped,
            "y-axis pipeline finished"
        );
        Ok::<_, AnnotateError>(scenes)
    }
    .instrument(span)
    .await
}
