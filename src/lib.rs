#![forbid(unsafe_code)]

//! # story-annotator
//!
//! LLM-derived annotations for story visualizations.
//!
//! Two pipelines sit on top of a language-model [`Oracle`]:
//!
//! - **colors**: induce a value scheme for a free-text attribute, assign every
//!   character or theme a value in concurrent batches, then pick one color per
//!   distinct value, ordered by the scheme.
//! - **y-axis**: rate every entity in every scene along a narrative axis and
//!   turn the ratings into dense per-scene ranks.
//!
//! Oracle output is never trusted for ordering. Batches and scenes are merged
//! by submission position, and out-of-scheme values are normalized.

pub mod annotate;
pub mod config;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod oracle;
pub mod prompts;
pub mod qa;
pub mod rollup;
pub mod server;
pub mod story;
pub mod yaxis;

pub use annotate::{apply_attribute, run_colors, ColorsOutput};
pub use config::{AnnotatorConfig, OracleSettings, PipelineSettings};
pub use error::{AnnotateError, Stage};
pub use gateway::{ChatGateway, ProviderGateway, UsageSink};
pub use oracle::{GatewayOracle, Oracle, OracleError, OutputSchema};
pub use story::{
    AttributeRecord, ColorAssignment, FlexibleJson, Scene, SceneEntity, StoryEntity, StoryType,
};
pub use yaxis::run_yaxis;
