//! Bounded generation history and its persistence.
//!
//! [`History`] is the in-memory collection with the capacity rule. [`HistoryStore`]
//! wraps it and writes the whole snapshot to a [`KeyValueStore`] after every
//! successful mutation.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::{Result, ResultExt},
    models::{GenerationResult, Rating},
    storage::{KeyValueStore, HISTORY_KEY},
};

/// Default maximum number of stored generations.
pub const DEFAULT_CAPACITY: usize = 10;

/// Result of an append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOutcome {
    pub accepted: bool,
    pub remaining_slots: usize,
}

/// Ordered, capacity-bounded list of generations in insertion order.
///
/// Once full, appends of new ids are rejected rather than evicting old entries.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: Vec<GenerationResult>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Insert a new record or overwrite the record with the same id.
    ///
    /// Overwrites always succeed and keep their position. A new id is rejected
    /// when the history is full, leaving it untouched.
    pub fn append(&mut self, result: GenerationResult) -> AppendOutcome {
        if let Some(existing) = self.entries.iter_mut().find(|r| r.id == result.id) {
            *existing = result;
            return self.outcome(true);
        }
        if self.entries.len() >= self.capacity {
            return self.outcome(false);
        }
        self.entries.push(result);
        self.outcome(true)
    }

    /// Remove the record with `id`, returning it. Absent ids are a no-op.
    pub fn delete(&mut self, id: &str) -> Option<GenerationResult> {
        let index = self.entries.iter().position(|r| r.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn all(&self) -> &[GenerationResult] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&GenerationResult> {
        self.entries.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn remaining_slots(&self) -> usize {
        self.capacity.saturating_sub(self.entries.len())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationResult> {
        self.entries.iter()
    }

    fn outcome(&self, accepted: bool) -> AppendOutcome {
        AppendOutcome {
            accepted,
            remaining_slots: self.remaining_slots(),
        }
    }
}

/// Something odd found while loading persisted history. Loading still succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryWarning {
    /// The stored value was not a valid history array and was ignored.
    CorruptHistoryDiscarded { bytes: usize, reason: String },
    /// More records were stored than the capacity allows; the oldest were dropped.
    HistoryTruncated { found: usize, kept: usize },
}

/// What [`HistoryStore::load`] found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub warnings: Vec<RecoveryWarning>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// History persisted to a key-value slot.
pub struct HistoryStore<S> {
    store: S,
    history: History,
}

impl<S: KeyValueStore> HistoryStore<S> {
    /// Read the persisted history. Unreadable JSON yields an empty history and a
    /// warning; storage I/O failures are returned as errors.
    #[instrument(skip_all, fields(capacity = capacity))]
    pub async fn load(store: S, capacity: usize) -> Result<(Self, LoadReport)> {
        let mut report = LoadReport::default();
        let raw = store
            .get(HISTORY_KEY)
            .await
            .with_context("loading history")?;

        let mut entries = match raw {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<GenerationResult>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        bytes = raw.len(),
                        error = %err,
                        "Persisted history is corrupt; starting with an empty history"
                    );
                    report.warnings.push(RecoveryWarning::CorruptHistoryDiscarded {
                        bytes: raw.len(),
                        reason: err.to_string(),
                    });
                    Vec::new()
                }
            },
        };

        if entries.len() > capacity {
            let found = entries.len();
            entries.drain(..found - capacity);
            warn!(found, kept = capacity, "Persisted history exceeds capacity; dropping oldest");
            report.warnings.push(RecoveryWarning::HistoryTruncated {
                found,
                kept: capacity,
            });
        }

        report.loaded = entries.len();
        debug!(loaded = report.loaded, "History loaded");

        Ok((
            Self {
                store,
                history: History { entries, capacity },
            },
            report,
        ))
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append or overwrite, persisting when accepted. A rejected append does not write.
    pub async fn append(&mut self, result: GenerationResult) -> Result<AppendOutcome> {
        let mut next = self.history.clone();
        let outcome = next.append(result);
        if !outcome.accepted {
            warn!(
                capacity = self.history.capacity(),
                "History is full; generation not saved"
            );
            return Ok(outcome);
        }
        self.commit(next).await?;
        Ok(outcome)
    }

    /// Attach or replace the rating on a stored record. Unknown ids are a no-op.
    pub async fn rate(&mut self, id: &str, rating: Rating) -> Result<Option<GenerationResult>> {
        let Some(updated) = self.history.get(id).map(|r| r.rated(rating)) else {
            return Ok(None);
        };
        let mut next = self.history.clone();
        next.append(updated.clone());
        self.commit(next).await?;
        Ok(Some(updated))
    }

    /// Remove a record. Unknown ids are a no-op and do not write.
    pub async fn delete(&mut self, id: &str) -> Result<Option<GenerationResult>> {
        let mut next = self.history.clone();
        let Some(removed) = next.delete(id) else {
            return Ok(None);
        };
        self.commit(next).await?;
        Ok(Some(removed))
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.commit(History::new(self.history.capacity())).await
    }

    /// Persist `next`, then adopt it. On a failed write the in-memory state is unchanged.
    async fn commit(&mut self, next: History) -> Result<()> {
        let json = serde_json::to_string(next.all())?;
        self.store
            .set(HISTORY_KEY, &json)
            .await
            .with_context("saving history")?;
        debug!(entries = next.len(), bytes = json.len(), "History persisted");
        self.history = next;
        Ok(())
    }
}
