use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::{
    stream::{self, BoxStream},
    Stream, StreamExt,
};
use gemini_rust::{Gemini, GenerationConfig, Message, Model};
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    error::{Result, StudioError},
    models::{GenerationParams, GenerationResult},
    prompt::build_prompt,
    selector::{ModelRouting, ModelTier},
};

/// Handler used to short-circuit requests during tests.
///
/// The handler receives the fully prepared request and returns the text
/// increments the backend would have streamed, in order.
pub type MockHandler = Arc<dyn Fn(GenerationRequest) -> Result<Vec<String>> + Send + Sync>;

/// Everything sent to the backend for one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub tier: ModelTier,
    pub system_instruction: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: i32,
}

/// Final text plus the facts needed to build a history record.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub text: String,
    pub model: String,
    pub tier: ModelTier,
    /// Wall-clock time from request start to end of stream.
    pub duration: Duration,
}

impl GenerationOutput {
    /// Turn the output into a fresh history record for `params`.
    pub fn into_result(self, params: GenerationParams) -> GenerationResult {
        GenerationResult::new(self.text, params, self.model, self.duration)
    }
}

/// Builder for [`StudioClient`].
pub struct StudioClientBuilder {
    api_key: Option<String>,
    routing: ModelRouting,
    mock_handler: Option<MockHandler>,
}

impl StudioClientBuilder {
    /// Blank keys are treated as missing; the failure surfaces on the first request.
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            api_key: (!api_key.trim().is_empty()).then_some(api_key),
            routing: ModelRouting::default(),
            mock_handler: None,
        }
    }

    /// A builder with no credential.
    pub fn without_credential() -> Self {
        Self {
            api_key: None,
            routing: ModelRouting::default(),
            mock_handler: None,
        }
    }

    /// Override the model ids behind each tier.
    pub fn with_routing(mut self, routing: ModelRouting) -> Self {
        self.routing = routing;
        self
    }

    /// Provide a mock handler to intercept all requests.
    ///
    /// This is primarily intended for unit tests where network calls should be avoided.
    pub fn with_mock(
        mut self,
        handler: impl Fn(GenerationRequest) -> Result<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.mock_handler = Some(Arc::new(handler));
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<StudioClient> {
        let backends = match (&self.api_key, &self.mock_handler) {
            (Some(key), None) => Some(Backends {
                fast: Arc::new(gemini_for(key, &self.routing.fast)?),
                high_reasoning: Arc::new(gemini_for(key, &self.routing.high_reasoning)?),
            }),
            _ => None,
        };

        Ok(StudioClient {
            has_credential: self.api_key.is_some(),
            routing: self.routing,
            backends,
            mock_handler: self.mock_handler,
        })
    }
}

/// Gemini wants `models/<id>`; bare ids are prefixed.
pub(crate) fn model_path(id: &str) -> String {
    if id.starts_with("models/") {
        id.to_string()
    } else {
        format!("models/{id}")
    }
}

pub(crate) fn gemini_for(api_key: &str, model_id: &str) -> Result<Gemini> {
    Gemini::with_model(api_key, Model::Custom(model_path(model_id)))
        .map_err(|e| StudioError::Config(format!("cannot create client for {model_id}: {e}")))
}

#[derive(Clone)]
struct Backends {
    fast: Arc<Gemini>,
    high_reasoning: Arc<Gemini>,
}

impl Backends {
    fn for_tier(&self, tier: ModelTier) -> &Arc<Gemini> {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::HighReasoning => &self.high_reasoning,
        }
    }
}

/// Streams creative text from Gemini, choosing the model per request.
#[derive(Clone)]
pub struct StudioClient {
    has_credential: bool,
    routing: ModelRouting,
    backends: Option<Backends>,
    pub(crate) mock_handler: Option<MockHandler>,
}

impl StudioClient {
    pub fn builder(api_key: impl Into<String>) -> StudioClientBuilder {
        StudioClientBuilder::new(api_key)
    }

    pub fn routing(&self) -> &ModelRouting {
        &self.routing
    }

    pub fn has_credential(&self) -> bool {
        self.has_credential
    }

    /// Assemble the backend request for `params` without sending it.
    pub fn prepare(&self, params: &GenerationParams) -> GenerationRequest {
        let template = params.content_type.template();
        let prompt = build_prompt(params, template);
        let (tier, model) = self.routing.route(params);
        GenerationRequest {
            model: model.to_string(),
            tier,
            system_instruction: prompt.system_instruction,
            prompt: prompt.user_text,
            temperature: params.creativity,
            max_output_tokens: params.length.max_output_tokens(),
        }
    }

    /// Open a stream of cumulative text snapshots.
    ///
    /// Each item is the full text received so far. The stream is lazy, finite and
    /// cannot be restarted; dropping it abandons the request. Backend errors end the
    /// stream after being yielded once.
    #[instrument(skip_all, fields(content_type = %params.content_type))]
    pub async fn stream(&self, params: &GenerationParams) -> Result<SnapshotStream> {
        if !self.has_credential {
            return Err(StudioError::MissingCredential);
        }

        let request = self.prepare(params);
        info!(
            model = %request.model,
            temperature = request.temperature,
            max_output_tokens = request.max_output_tokens,
            "Starting generation stream"
        );

        let model = request.model.clone();
        let tier = request.tier;
        let deltas: BoxStream<'static, Result<String>> = if let Some(mock) = &self.mock_handler {
            let chunks = (mock)(request)?;
            Box::pin(stream::iter(chunks.into_iter().map(Ok)))
        } else {
            let backends = self
                .backends
                .as_ref()
                .ok_or(StudioError::MissingCredential)?;

            let mut config = GenerationConfig::default();
            config.temperature = Some(request.temperature);
            config.max_output_tokens = Some(request.max_output_tokens);

            let inner = backends
                .for_tier(tier)
                .generate_content()
                .with_system_instruction(request.system_instruction)
                .with_message(Message::user(request.prompt))
                .with_generation_config(config)
                .execute_stream()
                .await?;

            Box::pin(inner.map(|item| item.map(|response| response.text()).map_err(StudioError::from)))
        };

        Ok(SnapshotStream {
            model,
            tier,
            inner: accumulate(deltas),
        })
    }

    /// Stream a generation to completion, calling `on_update` with the cumulative
    /// text after every increment.
    #[instrument(skip_all, fields(content_type = %params.content_type))]
    pub async fn generate<F>(
        &self,
        params: &GenerationParams,
        mut on_update: F,
    ) -> Result<GenerationOutput>
    where
        F: FnMut(&str),
    {
        let started = Instant::now();
        let mut stream = self.stream(params).await?;

        let mut text = String::new();
        while let Some(snapshot) = stream.next().await {
            let snapshot = snapshot.inspect_err(|err| warn!(error = %err, "Generation stream failed"))?;
            on_update(&snapshot);
            text = snapshot;
        }

        let duration = started.elapsed();
        if text.trim().is_empty() {
            warn!(model = %stream.model, "Model returned an empty response");
        }
        info!(
            model = %stream.model,
            chars = text.len(),
            duration_ms = duration.as_millis() as u64,
            "Generation complete"
        );

        Ok(GenerationOutput {
            text,
            model: stream.model,
            tier: stream.tier,
            duration,
        })
    }
}

/// Cumulative text snapshots for one request.
pub struct SnapshotStream {
    model: String,
    tier: ModelTier,
    inner: BoxStream<'static, Result<String>>,
}

impl SnapshotStream {
    /// Model id serving this stream.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tier(&self) -> ModelTier {
        self.tier
    }
}

impl Stream for SnapshotStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

struct AccumulateState {
    deltas: BoxStream<'static, Result<String>>,
    buffer: String,
    chunks: usize,
}

/// Fold text increments into cumulative snapshots, skipping empty increments.
fn accumulate(deltas: BoxStream<'static, Result<String>>) -> BoxStream<'static, Result<String>> {
    let state = AccumulateState {
        deltas,
        buffer: String::new(),
        chunks: 0,
    };

    Box::pin(stream::try_unfold(state, |mut state| async move {
        while let Some(delta) = state.deltas.next().await {
            let delta = delta?;
            if delta.is_empty() {
                continue;
            }
            state.buffer.push_str(&delta);
            state.chunks += 1;
            trace!(chunk = state.chunks, delta_len = delta.len(), "Received chunk");
            let snapshot = state.buffer.clone();
            return Ok(Some((snapshot, state)));
        }

        debug!(
            chunks = state.chunks,
            total_len = state.buffer.len(),
            "Generation stream finished"
        );
        Ok::<_, StudioError>(None)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::ContentType;

    #[test]
    fn test_model_path_prefix() {
        assert_eq!(model_path("gemini-2.5-flash"), "models/gemini-2.5-flash");
        assert_eq!(model_path("models/gemini-2.5-pro"), "models/gemini-2.5-pro");
    }

    #[tokio::test]
    async fn test_accumulate_emits_cumulative_text() {
        let deltas: BoxStream<'static, Result<String>> = Box::pin(stream::iter(
            ["Once", "", " upon", " a time"].map(|s| Ok(s.to_string())),
        ));
        let snapshots: Vec<String> = accumulate(deltas)
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(snapshots, vec!["Once", "Once upon", "Once upon a time"]);
    }

    #[tokio::test]
    async fn test_accumulate_stops_after_error() {
        let deltas: BoxStream<'static, Result<String>> = Box::pin(stream::iter(vec![
            Ok("partial".to_string()),
            Err(StudioError::GenerationFailed("connection reset".into())),
            Ok("never seen".to_string()),
        ]));
        let items: Vec<Result<String>> = accumulate(deltas).collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(StudioError::GenerationFailed(m)) if m == "connection reset"));
    }

    #[test]
    fn test_prepare_maps_params() {
        let client = StudioClientBuilder::new("key")
            .with_mock(|_| Ok(vec![]))
            .build()
            .unwrap();
        let params = GenerationParams::new(ContentType::Worldbuilding)
            .with_creativity(0.3)
            .with_length(crate::models::Length::Long);
        let request = client.prepare(&params);
        assert_eq!(request.tier, ModelTier::HighReasoning);
        assert_eq!(request.max_output_tokens, 4000);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    }
}
