//! Application state: client, history, theme and narration behind one owner.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::{
    client::{StudioClient, StudioClientBuilder},
    config::StudioConfig,
    error::{Result, StudioError},
    export::{export_history, ExportFile, ExportFormat},
    history::{History, HistoryStore, LoadReport},
    models::{GenerationParams, GenerationResult, Rating, Theme},
    narration::Narrator,
    selector::ModelTier,
    stats::HistoryStats,
    storage::{FileStore, KeyValueStore, THEME_KEY},
    validation::validate_params,
};

/// Where a generation attempt currently is.
///
/// `Idle -> Validating -> Streaming -> Completed -> SaveAttempted -> Idle`, with
/// `Failed` reachable from validation or streaming. Every attempt ends in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    Streaming,
    Completed,
    SaveAttempted,
    Failed,
}

/// What happened to a completed generation when it was handed to history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved { remaining_slots: usize },
    /// History is at capacity; the output was not stored.
    StorageFull,
    /// History accepted the record but writing it out failed.
    WriteFailed { message: String },
}

impl SaveStatus {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Outcome of [`Studio::generate`].
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub result: GenerationResult,
    pub tier: ModelTier,
    pub save: SaveStatus,
}

/// The creative studio. Exactly one generation runs at a time since
/// [`Studio::generate`] borrows the studio mutably.
pub struct Studio<S: KeyValueStore> {
    client: StudioClient,
    history: HistoryStore<S>,
    theme: Theme,
    phase: Phase,
    transitions: Vec<Phase>,
    narrator: Option<Narrator>,
}

impl Studio<FileStore> {
    /// Build a client and a file-backed store from `config`.
    pub async fn from_config(config: &StudioConfig) -> Result<(Self, LoadReport)> {
        let builder = match &config.api_key {
            Some(key) => StudioClientBuilder::new(key.clone()),
            None => StudioClientBuilder::without_credential(),
        };
        let client = builder.with_routing(config.routing.clone()).build()?;
        let store = FileStore::open(&config.data_dir).await?;
        Self::open(client, store, config.history_capacity).await
    }
}

impl<S: KeyValueStore> Studio<S> {
    /// Load persisted history and theme from `store`.
    #[instrument(skip_all, fields(capacity = capacity))]
    pub async fn open(client: StudioClient, store: S, capacity: usize) -> Result<(Self, LoadReport)> {
        let theme = load_theme(&store).await?;
        let (history, report) = HistoryStore::load(store, capacity).await?;
        info!(
            entries = history.history().len(),
            theme = theme.as_str(),
            "Studio opened"
        );

        Ok((
            Self {
                client,
                history,
                theme,
                phase: Phase::Idle,
                transitions: Vec::new(),
                narrator: None,
            },
            report,
        ))
    }

    pub fn with_narrator(mut self, narrator: Narrator) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn client(&self) -> &StudioClient {
        &self.client
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Phases visited by the most recent generation attempt, in order.
    pub fn last_transitions(&self) -> &[Phase] {
        &self.transitions
    }

    /// Validate, stream and save one generation.
    ///
    /// `on_update` receives the cumulative text after each increment. Failed
    /// attempts save nothing.
    #[instrument(skip_all, fields(content_type = %params.content_type))]
    pub async fn generate<F>(&mut self, params: GenerationParams, on_update: F) -> Result<GenerationReport>
    where
        F: FnMut(&str),
    {
        self.transitions.clear();
        let outcome = self.attempt(params, on_update).await;
        if let Err(err) = &outcome {
            warn!(error = %err, "Generation attempt failed");
            self.enter(Phase::Failed);
        }
        self.enter(Phase::Idle);
        outcome
    }

    async fn attempt<F>(&mut self, params: GenerationParams, on_update: F) -> Result<GenerationReport>
    where
        F: FnMut(&str),
    {
        self.enter(Phase::Validating);
        validate_params(&params, params.content_type.template())?;

        self.enter(Phase::Streaming);
        let output = self.client.generate(&params, on_update).await?;

        self.enter(Phase::Completed);
        let tier = output.tier;
        let result = output.into_result(params);

        self.enter(Phase::SaveAttempted);
        let save = match self.history.append(result.clone()).await {
            Ok(outcome) if outcome.accepted => SaveStatus::Saved {
                remaining_slots: outcome.remaining_slots,
            },
            Ok(_) => SaveStatus::StorageFull,
            Err(err) => {
                warn!(error = %err, "Generated output could not be persisted");
                SaveStatus::WriteFailed {
                    message: err.to_string(),
                }
            }
        };

        Ok(GenerationReport { result, tier, save })
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "Phase change");
        self.phase = phase;
        self.transitions.push(phase);
    }

    pub fn history(&self) -> &History {
        self.history.history()
    }

    /// Attach a 1-5 star rating to a saved generation. Unknown ids return `None`.
    pub async fn rate(&mut self, id: &str, stars: u8) -> Result<Option<GenerationResult>> {
        let rating = Rating::new(stars)?;
        self.history.rate(id, rating).await
    }

    /// Delete a saved generation. Returns whether anything was removed.
    pub async fn delete(&mut self, id: &str) -> Result<bool> {
        Ok(self.history.delete(id).await?.is_some())
    }

    pub async fn clear_history(&mut self) -> Result<()> {
        self.history.clear().await
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub async fn set_theme(&mut self, theme: Theme) -> Result<()> {
        let json = serde_json::to_string(&theme)?;
        self.history.store().set(THEME_KEY, &json).await?;
        self.theme = theme;
        Ok(())
    }

    pub async fn toggle_theme(&mut self) -> Result<Theme> {
        let next = self.theme.toggled();
        self.set_theme(next).await?;
        Ok(next)
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats::from_history(self.history().all())
    }

    pub fn export(&self, format: ExportFormat) -> Result<ExportFile> {
        export_history(self.history().all(), format)
    }

    /// Narrate a saved generation, replacing any narration in progress.
    pub async fn narrate(&mut self, id: &str) -> Result<Duration> {
        let text = self
            .history()
            .get(id)
            .map(|r| r.content.clone())
            .ok_or_else(|| StudioError::validation("id", format!("no saved generation '{id}'")))?;
        self.narrate_text(&text).await
    }

    pub async fn narrate_text(&mut self, text: &str) -> Result<Duration> {
        let narrator = self
            .narrator
            .as_mut()
            .ok_or_else(|| StudioError::Config("narration is not configured".to_string()))?;
        narrator.narrate(text).await
    }

    /// Stop narration. Returns whether anything was playing.
    pub fn stop_narration(&mut self) -> bool {
        self.narrator.as_mut().is_some_and(Narrator::stop)
    }

    pub fn narrator(&self) -> Option<&Narrator> {
        self.narrator.as_ref()
    }
}

async fn load_theme<S: KeyValueStore>(store: &S) -> Result<Theme> {
    let Some(raw) = store.get(THEME_KEY).await? else {
        return Ok(Theme::default());
    };
    match raw.parse::<Theme>() {
        Ok(theme) => Ok(theme),
        Err(err) => {
            warn!(error = %err, "Ignoring unreadable theme preference");
            Ok(Theme::default())
        }
    }
}
