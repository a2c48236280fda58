//! Minimal end-to-end example for `story-annotator`.
//!
//! Colors four characters by "social class", then ranks them per scene by
//! "tension" and rolls the ranks up to chapters.
//!
//! To run:
//! - Set `OPENROUTER_API_KEY`
//! - `cargo run --example quickstart`

use std::sync::Arc;

use serde_json::json;
use story_annotator::gateway::TracingUsageSink;
use story_annotator::rollup::chapter_rollup;
use story_annotator::{
    apply_attribute, run_colors, run_yaxis, AnnotatorConfig, GatewayOracle, ProviderGateway,
    Scene, StoryEntity, StoryType,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter("story_annotator=info")
        .init();

    // -- Infrastructure setup ------------------------------------------------

    // Model, batch size and fan-out width; ANNOTATOR_* variables override.
    let config = AnnotatorConfig::from_env();

    // OpenRouter gateway; TracingUsageSink logs tokens and cost per call.
    let gateway = ProviderGateway::from_env(Arc::new(TracingUsageSink))?;
    let oracle = GatewayOracle::new(Arc::new(gateway), config.oracle.clone());

    // -- Colors ---------------------------------------------------------------

    let mut characters: Vec<StoryEntity> = [
        "Nick Carraway",
        "Jay Gatsby",
        "Tom Buchanan",
        "Myrtle Wilson",
    ]
    .into_iter()
    .map(StoryEntity::new)
    .collect();

    let colors = run_colors(
        &oracle,
        &characters,
        "social class",
        Some("earth tones"),
        StoryType::Character,
        &config.pipeline,
    )
    .await?;
    apply_attribute(&mut characters, "social class", &colors.char_attrs);

    println!("--- Colors ---");
    for assignment in &colors.color_assignments {
        println!("{:<20} {}", assignment.value, assignment.color);
    }
    println!("{}", serde_json::to_string_pretty(&characters)?);

    // -- Y-axis ---------------------------------------------------------------

    let scenes: Vec<Scene> = serde_json::from_value(json!([
        {
            "chapter": "Chapter 7",
            "text": "The confrontation in the Plaza Hotel suite.",
            "characters": [{"name": "Jay Gatsby"}, {"name": "Tom Buchanan"}, {"name": "Nick Carraway"}]
        },
        {
            "chapter": "Chapter 7",
            "text": "Myrtle runs into the road.",
            "characters": [{"name": "Myrtle Wilson"}, {"name": "Jay Gatsby"}]
        }
    ]))?;

    let ranked = run_yaxis(
        &oracle,
        scenes,
        "tension",
        StoryType::Character,
        &config.pipeline,
    )
    .await?;

    println!("--- Chapter ranks ---");
    for chapter in chapter_rollup(&ranked, "tension") {
        println!("{}", chapter.chapter);
        for entity in chapter.entities {
            println!("  {:>2}. {}", entity.rank, entity.name);
        }
    }

    Ok(())
}
