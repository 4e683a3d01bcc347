use std::sync::{Arc, Mutex};

use futures::StreamExt;
use penpal_studio::prelude::*;
use penpal_studio::selector::{FAST_MODEL, HIGH_REASONING_MODEL};
use penpal_studio::GenerationRequest;
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("penpal_studio=debug")
        .with_test_writer()
        .try_init();
}

/// Client whose mock records every request and streams `chunks`.
fn recording_client(
    chunks: Vec<&'static str>,
) -> (StudioClient, Arc<Mutex<Vec<GenerationRequest>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let client = StudioClientBuilder::new("test-key")
        .with_mock(move |req: GenerationRequest| {
            log.lock().unwrap().push(req);
            Ok(chunks.iter().map(|c| c.to_string()).collect())
        })
        .build()
        .unwrap();
    (client, seen)
}

fn haiku_params() -> GenerationParams {
    GenerationParams::new(ContentType::Poem)
        .with_genre("Horror")
        .with_tone("Eerie")
        .with_length(Length::Short)
        .with_creativity(0.9)
        .with_input("style", "Haiku")
        .with_input("theme", "decay")
}

#[tokio::test]
async fn test_horror_haiku_end_to_end() {
    init_tracing();
    let (client, seen) = recording_client(vec!["Rot ", "blooms in ", "silence"]);
    let (mut studio, _) = Studio::open(client, MemoryStore::new(), 10).await.unwrap();

    let mut updates = Vec::new();
    let report = studio
        .generate(haiku_params(), |text| updates.push(text.to_string()))
        .await
        .unwrap();

    let requests = seen.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.model, HIGH_REASONING_MODEL);
    assert_eq!(request.tier, ModelTier::HighReasoning);
    assert_eq!(request.max_output_tokens, 500);
    assert!((request.temperature - 0.9).abs() < f32::EPSILON);
    assert!(request.prompt.contains("Haiku"));
    assert!(request.prompt.contains("decay"));
    assert!(request.prompt.contains("Horror genre"));

    assert_eq!(
        updates,
        vec!["Rot ", "Rot blooms in ", "Rot blooms in silence"]
    );
    assert_eq!(report.result.content, "Rot blooms in silence");
    assert_eq!(report.result.metrics.model_used, HIGH_REASONING_MODEL);
    assert_eq!(report.result.metrics.estimated_token_count, 6);
    assert_eq!(report.save, SaveStatus::Saved { remaining_slots: 9 });
    assert_eq!(studio.history().all(), &[report.result.clone()]);
}

#[tokio::test]
async fn test_low_creativity_story_uses_fast_model() {
    let (client, seen) = recording_client(vec!["Once."]);
    let params = GenerationParams::new(ContentType::Story)
        .with_creativity(0.4)
        .with_input("protagonist", "A retired detective")
        .with_input("setting", "A rain-slicked futuristic Tokyo")
        .with_input("twist", "The detective is a ghost");

    let output = client.generate(&params, |_| {}).await.unwrap();
    assert_eq!(output.model, FAST_MODEL);
    assert_eq!(seen.lock().unwrap()[0].max_output_tokens, 1500);
}

#[tokio::test]
async fn test_missing_credential_fails_before_request() {
    let seen = Arc::new(Mutex::new(0usize));
    let calls = seen.clone();
    let client = StudioClientBuilder::new("   ")
        .with_mock(move |_| {
            *calls.lock().unwrap() += 1;
            Ok(vec!["unreachable".to_string()])
        })
        .build()
        .unwrap();
    let (mut studio, _) = Studio::open(client, MemoryStore::new(), 10).await.unwrap();

    let err = studio.generate(haiku_params(), |_| {}).await.unwrap_err();
    assert!(matches!(err, StudioError::MissingCredential));
    assert_eq!(*seen.lock().unwrap(), 0);
    assert_eq!(studio.phase(), Phase::Idle);
    assert!(studio.history().is_empty());
}

#[tokio::test]
async fn test_validation_blocks_network_call() {
    let (client, seen) = recording_client(vec!["never"]);
    let (mut studio, _) = Studio::open(client, MemoryStore::new(), 10).await.unwrap();

    let params = haiku_params().with_input("theme", "qwrtypsdfghjklzxcvbnm");
    let err = studio.generate(params, |_| {}).await.unwrap_err();

    assert_eq!(err.field(), Some("Theme"));
    assert!(seen.lock().unwrap().is_empty());

    let params = haiku_params().with_input("style", "Ballad");
    let err = studio.generate(params, |_| {}).await.unwrap_err();
    assert_eq!(err.field(), Some("Poetic Style"));
}

#[tokio::test]
async fn test_backend_error_is_verbatim_and_not_saved() {
    let client = StudioClientBuilder::new("test-key")
        .with_mock(|_| {
            Err(StudioError::GenerationFailed(
                "Response blocked: SAFETY".to_string(),
            ))
        })
        .build()
        .unwrap();
    let (mut studio, _) = Studio::open(client, MemoryStore::new(), 10).await.unwrap();

    let err = studio.generate(haiku_params(), |_| {}).await.unwrap_err();
    assert_eq!(err.to_string(), "Response blocked: SAFETY");
    assert!(err.is_content_policy());
    assert_eq!(
        studio.last_transitions(),
        &[Phase::Validating, Phase::Streaming, Phase::Failed, Phase::Idle]
    );
    assert!(studio.history().is_empty());
}

#[tokio::test]
async fn test_full_history_reports_storage_full() {
    let (client, _) = recording_client(vec!["A short verse"]);
    let (mut studio, _) = Studio::open(client, MemoryStore::new(), 1).await.unwrap();

    let first = studio.generate(haiku_params(), |_| {}).await.unwrap();
    assert_eq!(first.save, SaveStatus::Saved { remaining_slots: 0 });

    let second = studio.generate(haiku_params(), |_| {}).await.unwrap();
    assert_eq!(second.save, SaveStatus::StorageFull);
    assert_eq!(second.result.content, "A short verse");
    assert_eq!(studio.history().len(), 1);
    assert_eq!(studio.history().all()[0].id, first.result.id);
}

#[tokio::test]
async fn test_snapshot_stream_is_cumulative() {
    let (client, _) = recording_client(vec!["The ", "", "door ", "creaks."]);
    let mut stream = client.stream(&haiku_params()).await.unwrap();
    assert_eq!(stream.model(), HIGH_REASONING_MODEL);

    let mut snapshots = Vec::new();
    while let Some(item) = stream.next().await {
        snapshots.push(item.unwrap());
    }
    assert_eq!(snapshots, vec!["The ", "The door ", "The door creaks."]);
}

#[tokio::test]
async fn test_rate_and_delete_through_studio() {
    let (client, _) = recording_client(vec!["Leaves fall"]);
    let store = MemoryStore::new();
    let (mut studio, _) = Studio::open(client.clone(), store.clone(), 10).await.unwrap();

    let report = studio.generate(haiku_params(), |_| {}).await.unwrap();
    let id = report.result.id.clone();

    assert!(studio.rate(&id, 0).await.is_err());
    let rated = studio.rate(&id, 5).await.unwrap().unwrap();
    assert_eq!(rated.user_rating.map(|r| r.stars()), Some(5));
    assert_eq!(studio.stats().average_rating, 5.0);

    let (reopened, _) = Studio::open(client.clone(), store.clone(), 10).await.unwrap();
    assert_eq!(reopened.history().all(), &[rated]);

    assert!(!studio.delete("missing").await.unwrap());
    assert!(studio.delete(&id).await.unwrap());
    let (reopened, _) = Studio::open(client, store, 10).await.unwrap();
    assert!(reopened.history().is_empty());
}
