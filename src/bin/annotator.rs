#![forbid(unsafe_code)]

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use story_annotator::annotate::{apply_attribute, run_colors};
use story_annotator::config::AnnotatorConfig;
use story_annotator::oracle::{GatewayOracle, Oracle};
use story_annotator::qa::{ask_question, find_chapter};
use story_annotator::rollup::chapter_rollup;
use story_annotator::server::{self, AppState};
use story_annotator::story::{FlexibleJson, Scene, StoryEntity, StoryType};
use story_annotator::yaxis::run_yaxis;

#[derive(Parser)]
#[command(name = "annotator", version, about = "LLM annotation for story visualizations")]
struct Cli {
    /// Model id, overriding ANNOTATOR_MODEL
    #[arg(long, global = true)]
    model: Option<String>,
    /// Concurrent oracle calls per step (0 = unbounded)
    #[arg(long, global = true)]
    max_concurrency: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStoryType {
    Character,
    Theme,
}

impl From<CliStoryType> for StoryType {
    fn from(value: CliStoryType) -> Self {
        match value {
            CliStoryType::Character => StoryType::Character,
            CliStoryType::Theme => StoryType::Theme,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "ANNOTATOR_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
    },
    /// Assign an attribute and colors to entities from a JSON file
    Colors {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        attribute: String,
        #[arg(long)]
        palette: Option<String>,
        #[arg(long, value_enum, default_value_t = CliStoryType::Character)]
        story_type: CliStoryType,
        #[arg(long)]
        out: PathBuf,
        /// Also write the input entities with the attribute attached
        #[arg(long)]
        annotated: Option<PathBuf>,
    },
    /// Rank entities per scene along an axis
    Yaxis {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        axis: String,
        #[arg(long, value_enum, default_value_t = CliStoryType::Character)]
        story_type: CliStoryType,
        #[arg(long)]
        out: PathBuf,
        /// Also write per-chapter mean ranks
        #[arg(long)]
        rollup: Option<PathBuf>,
    },
    /// Roll ranked scenes up to chapters (no LLM calls)
    Rollup {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        axis: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// Ask a free-form question about story data
    Ask {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        question: String,
    },
    /// Find the chapter that answers a question
    FindChapter {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("story_annotator=info".parse()?),
        )
        .init();

    let mut config = AnnotatorConfig::from_env();
    if let Some(model) = cli.model {
        config.oracle.model = model;
    }
    if let Some(width) = cli.max_concurrency {
        config.pipeline.max_concurrency = width;
    }

    match cli.command {
        Commands::Serve { bind } => {
            let oracle = build_oracle(&config)?;
            server::serve(AppState::new(oracle, config.pipeline), bind).await?;
        }
        Commands::Colors {
            input,
            attribute,
            palette,
            story_type,
            out,
            annotated,
        } => {
            let FlexibleJson(mut entities) = read_json::<FlexibleJson<Vec<StoryEntity>>>(&input)?;
            let oracle = build_oracle(&config)?;
            let output = run_colors(
                oracle.as_ref(),
                &entities,
                &attribute,
                palette.as_deref(),
                story_type.into(),
                &config.pipeline,
            )
            .await?;
            write_json(&out, &output)?;
            if let Some(path) = annotated {
                apply_attribute(&mut entities, &attribute, &output.char_attrs);
                write_json(&path, &entities)?;
            }
        }
        Commands::Yaxis {
            input,
            axis,
            story_type,
            out,
            rollup,
        } => {
            let FlexibleJson(scenes) = read_json::<FlexibleJson<Vec<Scene>>>(&input)?;
            let oracle = build_oracle(&config)?;
            let ranked = run_yaxis(
                oracle.as_ref(),
                scenes,
                &axis,
                story_type.into(),
                &config.pipeline,
            )
            .await?;
            write_json(&out, &ranked)?;
            if let Some(path) = rollup {
                write_json(&path, &chapter_rollup(&ranked, axis.trim()))?;
            }
        }
        Commands::Rollup { input, axis, out } => {
            let FlexibleJson(scenes) = read_json::<FlexibleJson<Vec<Scene>>>(&input)?;
            write_json(&out, &chapter_rollup(&scenes, axis.trim()))?;
        }
        Commands::Ask { input, question } => {
            let data: Value = read_json(&input)?;
            let oracle = build_oracle(&config)?;
            let answer = ask_question(oracle.as_ref(), &data, &question).await?;
            println!("{answer}");
        }
        Commands::FindChapter { input, question } => {
            let data: Value = read_json(&input)?;
            let oracle = build_oracle(&config)?;
            let answer = find_chapter(oracle.as_ref(), &data, &question).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }

    Ok(())
}

fn build_oracle(config: &AnnotatorConfig) -> Result<Arc<dyn Oracle>, Box<dyn std::error::Error>> {
    Ok(Arc::new(GatewayOracle::from_env(config.oracle.clone())?))
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
