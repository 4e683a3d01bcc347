use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StudioError;
use crate::templates::ContentType;

/// Requested output length. Each tier maps to a fixed output-token ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Length {
    Short,
    #[default]
    Medium,
    Long,
}

impl Length {
    pub const ALL: [Length; 3] = [Length::Short, Length::Medium, Length::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    pub fn max_output_tokens(&self) -> i32 {
        match self {
            Self::Short => 500,
            Self::Medium => 1500,
            Self::Long => 4000,
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Length {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Length::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StudioError::validation("length", format!("unknown length '{s}'")))
    }
}

/// Everything the user picked for one generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub genre: String,
    pub tone: String,
    #[serde(default)]
    pub language: String,
    pub length: Length,
    /// Sampling temperature in `[0, 1]`.
    pub creativity: f32,
    #[serde(rename = "promptInputs", default)]
    pub inputs: BTreeMap<String, String>,
}

impl GenerationParams {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            genre: "Fantasy".to_string(),
            tone: "Dark".to_string(),
            language: "English".to_string(),
            length: Length::Medium,
            creativity: 0.7,
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_length(mut self, length: Length) -> Self {
        self.length = length;
        self
    }

    pub fn with_creativity(mut self, creativity: f32) -> Self {
        self.creativity = creativity;
        self
    }

    /// Set one template field value.
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn input(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).map(String::as_str)
    }
}

/// A user rating between 1 and 5 stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub fn new(stars: u8) -> crate::Result<Self> {
        if (1..=5).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(StudioError::validation(
                "rating",
                format!("rating must be between 1 and 5, got {stars}"),
            ))
        }
    }

    pub fn stars(&self) -> u8 {
        self.0
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stars = u8::deserialize(deserializer)?;
        Rating::new(stars).map_err(serde::de::Error::custom)
    }
}

/// Measurements captured for a completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetrics {
    pub duration_ms: u64,
    #[serde(alias = "estimatedTokens", deserialize_with = "token_count")]
    pub estimated_token_count: u64,
    #[serde(alias = "model")]
    pub model_used: String,
}

impl GenerationMetrics {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Estimated output tokens per second, or `0.0` for instant results.
    pub fn tokens_per_second(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        self.estimated_token_count as f64 / (self.duration_ms as f64 / 1000.0)
    }
}

/// Accepts integer or fractional token counts; older records stored `len / 4` unrounded.
fn token_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct TokenCountVisitor;

    impl<'de> Visitor<'de> for TokenCountVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a non-negative number")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(value).map_err(de::Error::custom)
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if value.is_finite() && value >= 0.0 {
                Ok(value.ceil() as u64)
            } else {
                Err(de::Error::custom(format!("invalid token count {value}")))
            }
        }
    }

    deserializer.deserialize_any(TokenCountVisitor)
}

/// Rough token estimate: about four characters per token.
pub fn estimate_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(4) as u64
}

/// A completed generation as stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub id: String,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds", alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub params: GenerationParams,
    pub metrics: GenerationMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<Rating>,
}

impl GenerationResult {
    /// Build a fresh record with a new id and the current time.
    pub fn new(
        content: impl Into<String>,
        params: GenerationParams,
        model_used: impl Into<String>,
        duration: Duration,
    ) -> Self {
        let content = content.into();
        let estimated_token_count = estimate_tokens(&content);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            // Millisecond precision so a persisted record reloads unchanged.
            created_at: Utc::now().trunc_subsecs(3),
            params,
            metrics: GenerationMetrics {
                duration_ms: duration.as_millis() as u64,
                estimated_token_count,
                model_used: model_used.into(),
            },
            user_rating: None,
        }
    }

    /// Copy of this record carrying the given rating.
    pub fn rated(&self, rating: Rating) -> Self {
        Self {
            user_rating: Some(rating),
            ..self.clone()
        }
    }
}

/// UI colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"') {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(StudioError::Config(format!("unknown theme '{other}'"))),
        }
    }
}
