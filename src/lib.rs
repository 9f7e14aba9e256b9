//! tonematch — skin tone suggestion core for a cosmetics quiz.
//!
//! Takes a user selfie (and an optional 8-swatch reference image), makes it
//! transport-ready, and asks a hosted vision model to pick one of eight
//! fixed tone labels under a strict JSON output schema. The UI host renders
//! the result and lets the user override it.
//!
//! Two cooperating pieces:
//! - [`normalize`] — decode, orient, downscale, and re-encode raw image
//!   bytes into a compact JPEG payload.
//! - [`classifier`] + [`suggest`] — one schema-constrained request to the
//!   inference service per submission, memoized for byte-identical inputs.
//!
//! Everything is synchronous, one call per user action. No subscriber is
//! installed for `tracing` — that's the host's job.
//!
//! ```no_run
//! use tonematch::{StaticSecrets, ToneSuggester};
//!
//! let secrets = StaticSecrets::empty().with("OPENAI_API_KEY", "sk-...");
//! let suggester = ToneSuggester::openai(&secrets)?;
//!
//! let selfie = std::fs::read("selfie.jpg")?;
//! let suggestion = suggester.suggest(&selfie, None)?;
//! println!("suggested: {} ({:.2})", suggestion.tone, suggestion.confidence);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod classifier;
pub mod credentials;
pub mod normalize;
pub mod schema;
pub mod suggest;
pub mod tone;

pub use cache::{SuggestionCache, DEFAULT_CACHE_CAPACITY};
pub use classifier::{ClassificationRequest, MockClassifier, OpenAiClient, VisionClassifier};
pub use credentials::{EnvSecrets, SecretSource, StaticSecrets, API_KEY_VAR};
pub use normalize::{normalize, NormalizeError, NormalizedImage, DEFAULT_MAX_SIDE};
pub use schema::{parse_suggestion, suggestion_schema, Preselection, ToneSuggestion};
pub use suggest::ToneSuggester;
pub use tone::ToneLabel;

use thiserror::Error;

/// Errors from a classification attempt.
///
/// The UI boundary catches all of these and renders a single user-visible
/// failure message; there is no partial-success state.
#[derive(Debug, Error)]
pub enum SuggestError {
    /// Fatal configuration error — raised before any network call.
    #[error(
        "Missing OPENAI_API_KEY. Set it in the host secret store or as an environment variable."
    )]
    MissingCredential,

    /// The selfie or reference bytes could not be normalized.
    #[error("Failed to analyze image: {0}")]
    Image(#[from] NormalizeError),

    #[error("Inference service is not reachable at {0}")]
    ServiceUnreachable(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Inference service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// The service's response envelope could not be read.
    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    /// The service returned output violating the declared schema. Never
    /// defaulted to `unknown` — that would hide a contract break.
    #[error("Service response violates the output schema: {0}")]
    SchemaViolation(String),

    #[error("Internal lock error")]
    LockPoisoned,
}
