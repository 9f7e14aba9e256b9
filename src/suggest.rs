//! The suggestion orchestrator.
//!
//! One synchronous call per user action: cache lookup, normalization,
//! request assembly, classifier call, strict parse, cache insert. The UI
//! host is responsible for preventing overlapping submissions; the cache
//! mutex is the only shared state here.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::cache::{cache_key, SuggestionCache, DEFAULT_CACHE_CAPACITY};
use crate::classifier::{ClassificationRequest, OpenAiClient, VisionClassifier};
use crate::credentials::{EnvSecrets, SecretSource};
use crate::normalize::{normalize, DEFAULT_MAX_SIDE};
use crate::schema::{parse_suggestion, ToneSuggestion};
use crate::tone::ToneLabel;
use crate::SuggestError;

/// Build the fixed instruction block: the task, the closed label set, and
/// the disambiguation rules.
fn build_instruction() -> String {
    let labels: Vec<&str> = ToneLabel::ALL.iter().map(|t| t.as_str()).collect();
    format!(
        "You are assisting a cosmetics subscription quiz.\n\
         Task: choose the best matching skin tone label from this fixed set:\n\
         {}.\n\n\
         Rules:\n\
         - Focus on the person's natural skin tone (cheek/jaw/neck if visible).\n\
         - Ignore background, hair, clothing, and temporary redness.\n\
         - Lighting can skew color; if the lighting is very tinted (strong warm/cool cast), \
         or the face/skin is not clearly visible, return skin_tone='unknown' and set \
         needs_better_photo=true.\n\
         - Return ONLY valid JSON that matches the provided schema.",
        labels.join(", ")
    )
}

/// Suggests a skin tone for a selfie via the configured classifier.
///
/// Owns the bounded memoization cache; repeated byte-identical submissions
/// are answered without a classifier call.
pub struct ToneSuggester {
    classifier: Arc<dyn VisionClassifier>,
    cache: Mutex<SuggestionCache>,
    max_side: u32,
}

impl ToneSuggester {
    /// Suggester with the default cache capacity.
    pub fn new(classifier: Arc<dyn VisionClassifier>) -> Self {
        Self::with_capacity(classifier, DEFAULT_CACHE_CAPACITY)
    }

    /// Suggester with an explicit cache capacity (zero disables caching).
    pub fn with_capacity(classifier: Arc<dyn VisionClassifier>, capacity: usize) -> Self {
        Self {
            classifier,
            cache: Mutex::new(SuggestionCache::new(capacity)),
            max_side: DEFAULT_MAX_SIDE,
        }
    }

    /// Production suggester over the hosted service. The credential is
    /// resolved eagerly (host store, then environment), so a missing key
    /// fails here, before any network activity.
    pub fn openai(host: &dyn SecretSource) -> Result<Self, SuggestError> {
        let client = OpenAiClient::from_secrets(host, &EnvSecrets)?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Override the normalization bound (default 1024).
    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side;
        self
    }

    /// Suggest a tone for the given selfie, optionally anchored by an
    /// 8-swatch reference image.
    pub fn suggest(
        &self,
        selfie_bytes: &[u8],
        reference_bytes: Option<&[u8]>,
    ) -> Result<ToneSuggestion, SuggestError> {
        let _span = tracing::info_span!(
            "suggest_tone",
            selfie_size = selfie_bytes.len(),
            has_reference = reference_bytes.is_some(),
        )
        .entered();
        let start = std::time::Instant::now();

        let key = cache_key(selfie_bytes, reference_bytes);
        if let Some(hit) = self
            .cache
            .lock()
            .map_err(|_| SuggestError::LockPoisoned)?
            .get(&key)
        {
            debug!(tone = %hit.tone, "Suggestion cache hit");
            return Ok(hit);
        }

        let reference = reference_bytes
            .map(|bytes| normalize(bytes, self.max_side))
            .transpose()?;
        let selfie = normalize(selfie_bytes, self.max_side)?;

        let request = ClassificationRequest {
            instruction: build_instruction(),
            reference,
            selfie,
        };

        let raw = self.classifier.classify(&request)?;
        let suggestion = parse_suggestion(&raw)?;

        self.cache
            .lock()
            .map_err(|_| SuggestError::LockPoisoned)?
            .insert(key, suggestion.clone());

        info!(
            elapsed_ms = %start.elapsed().as_millis(),
            tone = %suggestion.tone,
            confidence = suggestion.confidence,
            needs_better_photo = suggestion.needs_better_photo,
            "Tone suggestion complete"
        );

        Ok(suggestion)
    }
}
