//! Creative-writing generation on top of `gemini-rust`.
//!
//! The crate turns template-driven form input into a prompt, routes it to a fast
//! or a high-reasoning Gemini model, streams the response back as cumulative
//! snapshots and keeps a small, capped history of past generations in local
//! key-value storage.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use penpal_studio::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = StudioConfig::from_env()?;
//!     let (mut studio, _report) = Studio::from_config(&config).await?;
//!
//!     let params = GenerationParams::new(ContentType::Poem)
//!         .with_genre("Horror")
//!         .with_input("style", "Haiku")
//!         .with_input("theme", "decay");
//!
//!     let report = studio
//!         .generate(params, |text| println!("{} chars so far", text.len()))
//!         .await?;
//!
//!     println!("{}", report.result.content);
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **`docs`** (default): Word-compatible HTML export of Markdown documentation.

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod models;
pub mod narration;
pub mod prompt;
pub mod selector;
pub mod stats;
pub mod storage;
pub mod studio;
pub mod templates;
pub mod validation;

pub use client::{
    GenerationOutput, GenerationRequest, MockHandler, SnapshotStream, StudioClient,
    StudioClientBuilder,
};
pub use config::StudioConfig;
pub use error::{Result, ResultExt, StudioError};
pub use export::{ExportFile, ExportFormat};
pub use history::{AppendOutcome, History, HistoryStore, LoadReport, RecoveryWarning};
pub use models::{GenerationMetrics, GenerationParams, GenerationResult, Length, Rating, Theme};
pub use narration::{AudioSink, BufferSink, GeminiSpeech, Narrator, PcmAudio, SpeechBackend};
pub use prompt::{build_prompt, Prompt};
pub use selector::{select_model, select_tier, ModelRouting, ModelTier};
pub use stats::HistoryStats;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use studio::{GenerationReport, Phase, SaveStatus, Studio};
pub use templates::{ContentType, Template, TemplateField};
pub use validation::validate_params;

/// Prelude module for convenient imports.
///
/// ```rust
/// use penpal_studio::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{MockHandler, StudioClient, StudioClientBuilder};
    pub use crate::config::StudioConfig;
    pub use crate::error::{Result, ResultExt, StudioError};
    pub use crate::export::{ExportFile, ExportFormat};
    pub use crate::history::{AppendOutcome, LoadReport, RecoveryWarning};
    pub use crate::models::{GenerationParams, GenerationResult, Length, Rating, Theme};
    pub use crate::narration::{AudioSink, BufferSink, Narrator, PcmAudio};
    pub use crate::selector::{ModelRouting, ModelTier};
    pub use crate::stats::HistoryStats;
    pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};
    pub use crate::studio::{GenerationReport, Phase, SaveStatus, Studio};
    pub use crate::templates::ContentType;

    // Re-export commonly used external types
    pub use futures::StreamExt;
    pub use serde::{Deserialize, Serialize};
}
