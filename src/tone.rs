//! The closed skin-tone label set.
//!
//! Eight fixed categories ordered lightest to darkest, plus the `Unknown`
//! sentinel the service returns when it cannot make a confident call.
//! Wire names are the SCREAMING form the inference service sees
//! (`FAIR` … `DEEP`) and the literal `unknown`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the eight fixed skin-tone categories, or `Unknown`.
///
/// The variant order IS the tone order (lightest first) — the UI relies on
/// it for swatch layout and the fallback pre-selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToneLabel {
    Fair,
    Light,
    LightMedium,
    Medium,
    MediumTan,
    Tan,
    Dark,
    Deep,
    /// The service could not determine a tone (bad lighting, no visible skin).
    #[serde(rename = "unknown")]
    Unknown,
}

impl ToneLabel {
    /// The eight real labels, lightest to darkest. Excludes `Unknown`.
    pub const ALL: [ToneLabel; 8] = [
        ToneLabel::Fair,
        ToneLabel::Light,
        ToneLabel::LightMedium,
        ToneLabel::Medium,
        ToneLabel::MediumTan,
        ToneLabel::Tan,
        ToneLabel::Dark,
        ToneLabel::Deep,
    ];

    /// The first defined label — the UI fallback when the tone is unknown.
    pub fn first() -> ToneLabel {
        ToneLabel::ALL[0]
    }

    /// Wire name as sent to / received from the inference service.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToneLabel::Fair => "FAIR",
            ToneLabel::Light => "LIGHT",
            ToneLabel::LightMedium => "LIGHT_MEDIUM",
            ToneLabel::Medium => "MEDIUM",
            ToneLabel::MediumTan => "MEDIUM_TAN",
            ToneLabel::Tan => "TAN",
            ToneLabel::Dark => "DARK",
            ToneLabel::Deep => "DEEP",
            ToneLabel::Unknown => "unknown",
        }
    }

    /// Parse a wire name. Strict: only the exact names above are accepted.
    pub fn from_wire(s: &str) -> Option<ToneLabel> {
        match s {
            "FAIR" => Some(ToneLabel::Fair),
            "LIGHT" => Some(ToneLabel::Light),
            "LIGHT_MEDIUM" => Some(ToneLabel::LightMedium),
            "MEDIUM" => Some(ToneLabel::Medium),
            "MEDIUM_TAN" => Some(ToneLabel::MediumTan),
            "TAN" => Some(ToneLabel::Tan),
            "DARK" => Some(ToneLabel::Dark),
            "DEEP" => Some(ToneLabel::Deep),
            "unknown" => Some(ToneLabel::Unknown),
            _ => None,
        }
    }

    /// Whether this is one of the eight real categories (not `Unknown`).
    pub fn is_known(&self) -> bool {
        !matches!(self, ToneLabel::Unknown)
    }
}

impl fmt::Display for ToneLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
