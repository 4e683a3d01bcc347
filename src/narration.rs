//! Text-to-speech narration of finished output.
//!
//! A [`Narrator`] owns at most one audio sink at a time. Starting a new narration,
//! calling [`Narrator::stop`], failing midway or dropping the narrator all stop and
//! close the active sink before anything else happens.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use gemini_rust::{
    Gemini, GenerationConfig, Message, Part, PrebuiltVoiceConfig, SpeechConfig, VoiceConfig,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    client::gemini_for,
    error::{Result, StudioError},
};

pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";

/// Signed 16-bit mono PCM at [`SAMPLE_RATE`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PcmAudio {
    samples: Vec<i16>,
}

impl PcmAudio {
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Decode little-endian sample bytes. An odd byte count is an error.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(StudioError::Audio(format!(
                "PCM payload has odd length {}",
                bytes.len()
            )));
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self { samples })
    }

    pub fn from_base64(payload: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| StudioError::Audio(format!("invalid base64 audio: {e}")))?;
        Self::from_le_bytes(&bytes)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(SAMPLE_RATE))
    }

    /// Samples scaled to `[-1.0, 1.0)` for float audio APIs.
    pub fn to_f32_frames(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|s| f32::from(*s) / 32768.0)
            .collect()
    }

    /// RIFF/WAVE container around the samples.
    pub fn to_wav_bytes(&self) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let block_align = CHANNELS * bits_per_sample / 8;
        let byte_rate = SAMPLE_RATE * u32::from(block_align);
        let data_len = (self.samples.len() * 2) as u32;

        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&CHANNELS.to_le_bytes());
        out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits_per_sample.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for sample in &self.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }
}

/// Somewhere decoded audio can be played.
pub trait AudioSink: Send {
    /// Begin playback. Returns once playback has started.
    fn play(&mut self, audio: &PcmAudio) -> Result<()>;

    fn stop(&mut self);

    /// Release the underlying resource. Must be safe to call more than once.
    fn close(&mut self);

    fn is_playing(&self) -> bool;
}

/// Creates a fresh sink for each narration.
pub type SinkFactory = Box<dyn Fn() -> Result<Box<dyn AudioSink>> + Send + Sync>;

/// Produces base64 PCM for a piece of text.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<String>;
}

#[async_trait]
impl<F> SpeechBackend for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    async fn synthesize(&self, text: &str) -> Result<String> {
        (self)(text)
    }
}

/// Gemini text-to-speech with a prebuilt voice.
pub struct GeminiSpeech {
    client: Gemini,
    model: String,
    voice: String,
}

impl GeminiSpeech {
    pub fn new(api_key: &str, model: &str, voice: impl Into<String>) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(StudioError::MissingCredential);
        }
        Ok(Self {
            client: gemini_for(api_key, model)?,
            model: model.to_string(),
            voice: voice.into(),
        })
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }
}

#[async_trait]
impl SpeechBackend for GeminiSpeech {
    #[instrument(skip_all, fields(model = %self.model, voice = %self.voice))]
    async fn synthesize(&self, text: &str) -> Result<String> {
        let config = GenerationConfig {
            response_modalities: Some(vec!["AUDIO".to_string()]),
            speech_config: Some(SpeechConfig {
                voice_config: Some(VoiceConfig {
                    prebuilt_voice_config: Some(PrebuiltVoiceConfig {
                        voice_name: self.voice.clone(),
                    }),
                }),
                multi_speaker_voice_config: None,
            }),
            ..Default::default()
        };

        let response = self
            .client
            .generate_content()
            .with_message(Message::user(text.to_string()))
            .with_generation_config(config)
            .execute()
            .await?;

        response
            .candidates
            .iter()
            .filter_map(|candidate| candidate.content.parts.as_ref())
            .flatten()
            .find_map(|part| match part {
                Part::InlineData { inline_data, .. } => Some(inline_data.data.clone()),
                _ => None,
            })
            .ok_or_else(|| StudioError::Audio("speech response carried no audio".to_string()))
    }
}

/// What happened to a [`BufferSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Play { samples: usize },
    Stop,
    Close,
}

/// Sink that keeps the audio it was given instead of playing it.
///
/// Clones share one log, so a test or demo can keep a handle after the factory
/// hands a clone to the narrator.
#[derive(Clone, Default)]
pub struct BufferSink {
    state: Arc<Mutex<BufferState>>,
}

#[derive(Default)]
struct BufferState {
    events: Vec<SinkEvent>,
    last: Option<PcmAudio>,
    playing: bool,
    closed: bool,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().events.clone()
    }

    /// Audio passed to the most recent `play`.
    pub fn last_audio(&self) -> Option<PcmAudio> {
        self.lock().last.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferState> {
        // A poisoned log is still readable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AudioSink for BufferSink {
    fn play(&mut self, audio: &PcmAudio) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(StudioError::Audio("sink already closed".to_string()));
        }
        state.events.push(SinkEvent::Play {
            samples: audio.samples().len(),
        });
        state.last = Some(audio.clone());
        state.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.playing = false;
        state.events.push(SinkEvent::Stop);
    }

    fn close(&mut self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            state.playing = false;
            state.events.push(SinkEvent::Close);
        }
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrationState {
    #[default]
    Idle,
    Requesting,
    Playing,
}

/// Single in-flight narration with explicit stop.
pub struct Narrator {
    backend: Arc<dyn SpeechBackend>,
    sink_factory: SinkFactory,
    active: Option<Box<dyn AudioSink>>,
    state: NarrationState,
}

impl Narrator {
    pub fn new(backend: Arc<dyn SpeechBackend>, sink_factory: SinkFactory) -> Self {
        Self {
            backend,
            sink_factory,
            active: None,
            state: NarrationState::Idle,
        }
    }

    pub fn state(&self) -> NarrationState {
        self.state
    }

    /// True while a sink is held and still playing.
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|sink| sink.is_playing())
    }

    /// Speak `text`, replacing any narration in progress. Returns the audio length.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub async fn narrate(&mut self, text: &str) -> Result<Duration> {
        self.stop();
        if text.trim().is_empty() {
            return Err(StudioError::validation("text", "nothing to narrate"));
        }

        self.state = NarrationState::Requesting;
        let result = self.start(text).await;
        if let Err(err) = &result {
            warn!(error = %err, "Narration failed");
            self.stop();
        }
        result
    }

    async fn start(&mut self, text: &str) -> Result<Duration> {
        let payload = self.backend.synthesize(text).await?;
        let audio = PcmAudio::from_base64(&payload)?;
        debug!(samples = audio.samples().len(), "Speech decoded");

        let mut sink = (self.sink_factory)()?;
        if let Err(err) = sink.play(&audio) {
            sink.stop();
            sink.close();
            return Err(err);
        }

        let duration = audio.duration();
        info!(duration_ms = duration.as_millis() as u64, "Narration started");
        self.active = Some(sink);
        self.state = NarrationState::Playing;
        Ok(duration)
    }

    /// Stop and release the active sink, if any. Returns whether one was held.
    pub fn stop(&mut self) -> bool {
        self.state = NarrationState::Idle;
        match self.active.take() {
            Some(mut sink) => {
                sink.stop();
                sink.close();
                info!("Narration stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_payload(samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        BASE64.encode(bytes)
    }

    fn recording_factory(log: Arc<Mutex<Vec<BufferSink>>>) -> SinkFactory {
        Box::new(move || -> Result<Box<dyn AudioSink>> {
            let sink = BufferSink::new();
            log.lock().unwrap().push(sink.clone());
            Ok(Box::new(sink))
        })
    }

    #[test]
    fn test_pcm_decoding() {
        let audio = PcmAudio::from_base64(&tone_payload(&[0, 1, -1, i16::MAX])).unwrap();
        assert_eq!(audio.samples(), &[0, 1, -1, i16::MAX]);
        assert!(PcmAudio::from_le_bytes(&[1, 2, 3]).is_err());
        assert!(matches!(
            PcmAudio::from_base64("***"),
            Err(StudioError::Audio(_))
        ));
    }

    #[test]
    fn test_duration_at_24khz() {
        let audio = PcmAudio::from_samples(vec![0; 12_000]);
        assert_eq!(audio.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_wav_header() {
        let wav = PcmAudio::from_samples(vec![0, 256]).to_wav_bytes();
        assert_eq!(wav.len(), 48);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 4);
        assert_eq!(&wav[44..], &[0, 0, 0, 1]);
    }

    #[tokio::test]
    async fn test_new_narration_closes_previous_sink() {
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let backend = |_: &str| -> Result<String> { Ok(tone_payload(&[1, 2, 3])) };
        let mut narrator = Narrator::new(Arc::new(backend), recording_factory(sinks.clone()));

        narrator.narrate("first").await.unwrap();
        assert!(narrator.is_active());
        narrator.narrate("second").await.unwrap();

        let sinks = sinks.lock().unwrap();
        assert_eq!(sinks.len(), 2);
        assert_eq!(
            sinks[0].events(),
            vec![SinkEvent::Play { samples: 3 }, SinkEvent::Stop, SinkEvent::Close]
        );
        assert!(!sinks[1].is_closed());
        assert_eq!(narrator.state(), NarrationState::Playing);
    }

    #[tokio::test]
    async fn test_stop_and_drop_release_sink() {
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let backend = |_: &str| -> Result<String> { Ok(tone_payload(&[5])) };
        let mut narrator = Narrator::new(Arc::new(backend), recording_factory(sinks.clone()));

        narrator.narrate("hello").await.unwrap();
        assert!(narrator.stop());
        assert!(!narrator.stop());
        assert_eq!(narrator.state(), NarrationState::Idle);

        narrator.narrate("again").await.unwrap();
        drop(narrator);

        let sinks = sinks.lock().unwrap();
        assert!(sinks.iter().all(BufferSink::is_closed));
    }

    #[tokio::test]
    async fn test_backend_error_leaves_narrator_idle() {
        let sinks = Arc::new(Mutex::new(Vec::new()));
        let backend = |_: &str| -> Result<String> {
            Err(StudioError::GenerationFailed("quota exceeded".into()))
        };
        let mut narrator = Narrator::new(Arc::new(backend), recording_factory(sinks.clone()));

        let err = narrator.narrate("hello").await.unwrap_err();
        assert!(matches!(err, StudioError::GenerationFailed(_)));
        assert_eq!(narrator.state(), NarrationState::Idle);
        assert!(sinks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_play_closes_sink() {
        let sink = BufferSink::new();
        let mut closed = sink.clone();
        closed.close();
        let handle = sink.clone();
        let backend = |_: &str| -> Result<String> { Ok(tone_payload(&[7])) };
        let mut narrator = Narrator::new(
            Arc::new(backend),
            Box::new(move || -> Result<Box<dyn AudioSink>> { Ok(Box::new(sink.clone())) }),
        );

        assert!(matches!(
            narrator.narrate("hello").await,
            Err(StudioError::Audio(_))
        ));
        assert!(!narrator.is_active());
        assert!(handle.events().contains(&SinkEvent::Stop));
    }
}
