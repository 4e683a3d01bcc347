//! Aggregate analytics over the generation history.

use std::collections::HashMap;

use serde::Serialize;

use crate::{models::GenerationResult, templates::ContentType};

/// Number of most recent records included in [`HistoryStats::recent`].
pub const RECENT_WINDOW: usize = 10;

/// One record in the recent-activity series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// `Gen 1`, `Gen 2`, ... counted within the window.
    pub label: String,
    pub duration_secs: f64,
    pub tokens: u64,
    pub content_type: ContentType,
}

/// Summary numbers for the analytics view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_generations: usize,
    pub rated_generations: usize,
    /// Mean over rated records only; `0.0` when nothing is rated.
    pub average_rating: f64,
    pub average_duration_secs: f64,
    pub total_tokens: u64,
    pub average_tokens: f64,
    /// Mean of per-record throughput, skipping records with zero duration.
    pub average_tokens_per_second: f64,
    /// Most frequent genre. Ties go to the genre used most recently.
    pub favorite_genre: Option<String>,
    /// Count per content type, in catalog order, including zeros.
    pub by_content_type: Vec<(ContentType, usize)>,
    pub recent: Vec<SeriesPoint>,
}

impl HistoryStats {
    pub fn from_history(records: &[GenerationResult]) -> Self {
        let total = records.len();

        let ratings: Vec<f64> = records
            .iter()
            .filter_map(|r| r.user_rating.map(|rating| f64::from(rating.stars())))
            .collect();

        let total_tokens: u64 = records
            .iter()
            .map(|r| r.metrics.estimated_token_count)
            .sum();

        let throughputs: Vec<f64> = records
            .iter()
            .filter(|r| r.metrics.duration_ms > 0)
            .map(|r| r.metrics.tokens_per_second())
            .collect();

        let by_content_type = ContentType::ALL
            .into_iter()
            .map(|ct| {
                let count = records
                    .iter()
                    .filter(|r| r.params.content_type == ct)
                    .count();
                (ct, count)
            })
            .collect();

        let window_start = total.saturating_sub(RECENT_WINDOW);
        let recent = records[window_start..]
            .iter()
            .enumerate()
            .map(|(i, r)| SeriesPoint {
                label: format!("Gen {}", i + 1),
                duration_secs: r.metrics.duration_ms as f64 / 1000.0,
                tokens: r.metrics.estimated_token_count,
                content_type: r.params.content_type,
            })
            .collect();

        Self {
            total_generations: total,
            rated_generations: ratings.len(),
            average_rating: mean(&ratings),
            average_duration_secs: mean(
                &records
                    .iter()
                    .map(|r| r.metrics.duration_ms as f64 / 1000.0)
                    .collect::<Vec<_>>(),
            ),
            total_tokens,
            average_tokens: if total == 0 {
                0.0
            } else {
                total_tokens as f64 / total as f64
            },
            average_tokens_per_second: mean(&throughputs),
            favorite_genre: favorite_genre(records),
            by_content_type,
            recent,
        }
    }

    pub fn count_for(&self, content_type: ContentType) -> usize {
        self.by_content_type
            .iter()
            .find(|(ct, _)| *ct == content_type)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn favorite_genre(records: &[GenerationResult]) -> Option<String> {
    // genre -> (count, index of latest use)
    let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        let genre = record.params.genre.trim();
        if genre.is_empty() {
            continue;
        }
        let entry = tally.entry(genre).or_insert((0, index));
        entry.0 += 1;
        entry.1 = index;
    }
    tally
        .into_iter()
        .max_by_key(|(_, (count, latest))| (*count, *latest))
        .map(|(genre, _)| genre.to_string())
}
