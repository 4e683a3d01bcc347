//! Example: narrate a saved generation and write the audio to a WAV file.
//!
//! Run with: `GEMINI_API_KEY=... cargo run --example narrate`
//!
//! Without a key a synthetic tone stands in for the speech backend.

use std::sync::Arc;

use base64::Engine;
use penpal_studio::narration::{SpeechBackend, SAMPLE_RATE};
use penpal_studio::prelude::*;
use penpal_studio::GeminiSpeech;

/// Half a second of a 440 Hz tone, base64-encoded like the TTS payload.
fn tone_payload() -> String {
    let samples = SAMPLE_RATE / 2;
    let bytes: Vec<u8> = (0..samples)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE as f32;
            ((t * 440.0 * std::f32::consts::TAU).sin() * 8_000.0) as i16
        })
        .flat_map(i16::to_le_bytes)
        .collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = StudioConfig::from_env()?;
    let backend: Arc<dyn SpeechBackend> = match &config.api_key {
        Some(key) => Arc::new(GeminiSpeech::new(key, &config.tts_model, &config.voice)?),
        None => {
            println!("GEMINI_API_KEY not set; narrating with a test tone.");
            Arc::new(|_: &str| -> Result<String> { Ok(tone_payload()) })
        }
    };

    let sink = BufferSink::new();
    let factory_sink = sink.clone();
    let narrator = Narrator::new(
        backend,
        Box::new(move || -> Result<Box<dyn AudioSink>> { Ok(Box::new(factory_sink.clone())) }),
    );

    let client = StudioClientBuilder::new("mock-key")
        .with_mock(|_| {
            Ok(vec![
                "INT. KITCHEN - NIGHT\n\n".to_string(),
                "ANA: That was my slice.\nBO: Prove it.".to_string(),
            ])
        })
        .build()?;
    let (studio, _) = Studio::open(client, MemoryStore::new(), 10).await?;
    let mut studio = studio.with_narrator(narrator);

    let params = GenerationParams::new(ContentType::Dialogue)
        .with_genre("Comedy")
        .with_input("characters", "Ana and Bo, roommates")
        .with_input("conflict", "The last slice of pizza");
    let report = studio.generate(params, |_| {}).await?;

    let duration = studio.narrate(&report.result.id).await?;
    println!("Narrating {:.2}s of audio", duration.as_secs_f32());
    studio.stop_narration();

    if let Some(audio) = sink.last_audio() {
        let path = std::env::temp_dir().join("penpal-narration.wav");
        tokio::fs::write(&path, audio.to_wav_bytes()).await?;
        println!("Wrote {}", path.display());
    }
    println!("Sink events: {:?}", sink.events());

    Ok(())
}
