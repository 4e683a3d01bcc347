use std::path::PathBuf;

use crate::{
    error::{Result, StudioError},
    history::DEFAULT_CAPACITY,
    narration::{DEFAULT_TTS_MODEL, DEFAULT_VOICE},
    selector::ModelRouting,
};

/// Runtime settings for a [`crate::Studio`].
#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    /// Gemini API key. Generation fails with `MissingCredential` when absent.
    pub api_key: Option<String>,
    /// Directory for the file-backed store.
    pub data_dir: PathBuf,
    /// Maximum number of saved generations (default: 10)
    pub history_capacity: usize,
    pub routing: ModelRouting,
    pub tts_model: String,
    pub voice: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            data_dir: PathBuf::from(".penpal"),
            history_capacity: DEFAULT_CAPACITY,
            routing: ModelRouting::default(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

impl StudioConfig {
    /// Read settings from the process environment.
    ///
    /// `GEMINI_API_KEY` (or `API_KEY`), `PENPAL_DATA_DIR`, `PENPAL_HISTORY_CAP`,
    /// `PENPAL_FAST_MODEL`, `PENPAL_PRO_MODEL`, `PENPAL_TTS_MODEL`, `PENPAL_VOICE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self {
            api_key: var("GEMINI_API_KEY").or_else(|| var("API_KEY")),
            ..Self::default()
        };

        if let Some(dir) = var("PENPAL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(cap) = var("PENPAL_HISTORY_CAP") {
            config.history_capacity = cap.trim().parse().map_err(|_| {
                StudioError::Config(format!("PENPAL_HISTORY_CAP must be a whole number, got '{cap}'"))
            })?;
        }
        if let Some(model) = var("PENPAL_FAST_MODEL") {
            config.routing.fast = model;
        }
        if let Some(model) = var("PENPAL_PRO_MODEL") {
            config.routing.high_reasoning = model;
        }
        if let Some(model) = var("PENPAL_TTS_MODEL") {
            config.tts_model = model;
        }
        if let Some(voice) = var("PENPAL_VOICE") {
            config.voice = voice;
        }
        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_routing(mut self, routing: ModelRouting) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_tts_model(mut self, model: impl Into<String>) -> Self {
        self.tts_model = model.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = StudioConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StudioConfig::default());
        assert_eq!(config.history_capacity, 10);
    }

    #[test]
    fn test_api_key_fallback() {
        let config = StudioConfig::from_lookup(lookup(&[("API_KEY", "k2")])).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k2"));

        let config = StudioConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k1"),
            ("API_KEY", "k2"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k1"));
    }

    #[test]
    fn test_overrides() {
        let config = StudioConfig::from_lookup(lookup(&[
            ("PENPAL_HISTORY_CAP", "25"),
            ("PENPAL_PRO_MODEL", "gemini-2.5-pro"),
            ("PENPAL_VOICE", "Puck"),
            ("PENPAL_DATA_DIR", "/tmp/penpal"),
        ]))
        .unwrap();
        assert_eq!(config.history_capacity, 25);
        assert_eq!(config.routing.high_reasoning, "gemini-2.5-pro");
        assert_eq!(config.routing.fast, "gemini-2.5-flash");
        assert_eq!(config.voice, "Puck");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/penpal"));
    }

    #[test]
    fn test_bad_capacity() {
        let err = StudioConfig::from_lookup(lookup(&[("PENPAL_HISTORY_CAP", "ten")])).unwrap_err();
        assert!(matches!(err, StudioError::Config(_)));
    }
}
