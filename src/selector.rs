use crate::models::GenerationParams;
use crate::templates::ContentType;

pub const FAST_MODEL: &str = "gemini-2.5-flash";
pub const HIGH_REASONING_MODEL: &str = "gemini-3-pro-preview";

/// Creativity strictly above this routes to the high-reasoning model.
pub const CREATIVITY_THRESHOLD: f32 = 0.8;

/// Which class of model a request needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelTier {
    /// Low latency, used for most requests.
    Fast,
    /// Slower and more capable. Used for high creativity and world building,
    /// where internal consistency matters more than speed.
    HighReasoning,
}

/// Pick the tier for a request. Pure and total: NaN creativity routes to `Fast`.
pub fn select_tier(creativity: f32, content_type: ContentType) -> ModelTier {
    let complex = match content_type {
        ContentType::Worldbuilding => true,
        ContentType::Story | ContentType::Poem | ContentType::Character | ContentType::Dialogue => {
            false
        }
    };
    if complex || creativity > CREATIVITY_THRESHOLD {
        ModelTier::HighReasoning
    } else {
        ModelTier::Fast
    }
}

/// Model id chosen for a request under the default routing.
pub fn select_model(creativity: f32, content_type: ContentType) -> &'static str {
    match select_tier(creativity, content_type) {
        ModelTier::Fast => FAST_MODEL,
        ModelTier::HighReasoning => HIGH_REASONING_MODEL,
    }
}

/// Model identifiers behind each tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRouting {
    pub fast: String,
    pub high_reasoning: String,
}

impl Default for ModelRouting {
    fn default() -> Self {
        Self {
            fast: FAST_MODEL.to_string(),
            high_reasoning: HIGH_REASONING_MODEL.to_string(),
        }
    }
}

impl ModelRouting {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::HighReasoning => &self.high_reasoning,
        }
    }

    /// Tier and model id for `params`.
    pub fn route(&self, params: &GenerationParams) -> (ModelTier, &str) {
        let tier = select_tier(params.creativity, params.content_type);
        (tier, self.model_for(tier))
    }
}
