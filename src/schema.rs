//! The strict output contract with the inference service.
//!
//! The service is constrained to a JSON schema with exactly five required
//! fields and no additional properties. Parsing is equally strict on our
//! side: an extra field, an out-of-set label, or an out-of-bounds
//! confidence is a [`SuggestError::SchemaViolation`], never a silent
//! default — silently guessing would hide a service contract break.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tone::ToneLabel;
use crate::SuggestError;

/// Schema name declared to the service alongside the schema value.
pub const SCHEMA_NAME: &str = "skin_tone_suggestion";

/// A parsed, validated classification result.
///
/// Invariants: `tone` is a member of the closed set (including `Unknown`);
/// `confidence` is within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSuggestion {
    pub tone: ToneLabel,
    pub confidence: f32,
    pub needs_better_photo: bool,
    pub notes: String,
    pub warnings: Vec<String>,
}

/// What the UI should pre-seed its override selector with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preselection {
    pub label: ToneLabel,
    /// True when the tone was `unknown` and the first label is a stand-in;
    /// the UI shows a warning state in that case.
    pub is_fallback: bool,
}

impl ToneSuggestion {
    /// Pre-selection for the manual-override selector: the suggested label,
    /// or the first defined label (with a warning flag) when unknown.
    pub fn preselect(&self) -> Preselection {
        if self.tone.is_known() {
            Preselection {
                label: self.tone,
                is_fallback: false,
            }
        } else {
            Preselection {
                label: ToneLabel::first(),
                is_fallback: true,
            }
        }
    }
}

/// Wire shape of the service response. Strict: unknown fields are rejected
/// at deserialization so a contract break surfaces as an error.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSuggestion {
    skin_tone: String,
    confidence: f64,
    needs_better_photo: bool,
    notes: String,
    warnings: Vec<String>,
}

/// The JSON schema value sent to the service as the output constraint.
///
/// Exactly five required fields, `additionalProperties: false`, and the
/// label enum is derived from [`ToneLabel::ALL`] so the schema can never
/// drift from the compile-time set.
pub fn suggestion_schema() -> serde_json::Value {
    let mut labels: Vec<&str> = ToneLabel::ALL.iter().map(|t| t.as_str()).collect();
    labels.push(ToneLabel::Unknown.as_str());

    json!({
        "type": "object",
        "properties": {
            "skin_tone": {"type": "string", "enum": labels},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "needs_better_photo": {"type": "boolean"},
            "notes": {"type": "string"},
            "warnings": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["skin_tone", "confidence", "needs_better_photo", "notes", "warnings"],
        "additionalProperties": false
    })
}

/// Parse and validate a raw service response body.
pub fn parse_suggestion(raw_json: &str) -> Result<ToneSuggestion, SuggestError> {
    let raw: RawSuggestion = serde_json::from_str(raw_json)
        .map_err(|e| SuggestError::SchemaViolation(e.to_string()))?;

    let tone = ToneLabel::from_wire(&raw.skin_tone).ok_or_else(|| {
        SuggestError::SchemaViolation(format!(
            "skin_tone '{}' is not in the closed label set",
            raw.skin_tone
        ))
    })?;

    if !(0.0..=1.0).contains(&raw.confidence) {
        return Err(SuggestError::SchemaViolation(format!(
            "confidence {} is outside [0, 1]",
            raw.confidence
        )));
    }

    Ok(ToneSuggestion {
        tone,
        confidence: raw.confidence as f32,
        needs_better_photo: raw.needs_better_photo,
        notes: raw.notes,
        warnings: raw.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conforming(skin_tone: &str, confidence: f64) -> String {
        format!(
            r#"{{"skin_tone":"{skin_tone}","confidence":{confidence},"needs_better_photo":false,"notes":"ok","warnings":[]}}"#
        )
    }

    // ── suggestion_schema ──

    #[test]
    fn schema_declares_five_required_fields() {
        let schema = suggestion_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 5);
        for field in ["skin_tone", "confidence", "needs_better_photo", "notes", "warnings"] {
            assert!(required.iter().any(|v| v == field), "missing {field}");
        }
    }

    #[test]
    fn schema_forbids_additional_properties() {
        let schema = suggestion_schema();
        assert_eq!(schema["additionalProperties"], serde_json::Value::Bool(false));
    }

    #[test]
    fn schema_enum_is_eight_labels_plus_unknown() {
        let schema = suggestion_schema();
        let labels = schema["properties"]["skin_tone"]["enum"].as_array().unwrap();
        assert_eq!(labels.len(), 9);
        assert_eq!(labels[0], "FAIR");
        assert_eq!(labels[8], "unknown");
    }

    #[test]
    fn schema_bounds_confidence() {
        let schema = suggestion_schema();
        let conf = &schema["properties"]["confidence"];
        assert_eq!(conf["minimum"], 0);
        assert_eq!(conf["maximum"], 1);
    }

    // ── parse_suggestion ──

    #[test]
    fn parse_conforming_response() {
        let raw = r#"{"skin_tone":"TAN","confidence":0.82,"needs_better_photo":false,"notes":"clear daylight photo","warnings":[]}"#;
        let suggestion = parse_suggestion(raw).unwrap();
        assert_eq!(suggestion.tone, ToneLabel::Tan);
        assert!((suggestion.confidence - 0.82).abs() < 1e-6);
        assert!(!suggestion.needs_better_photo);
        assert_eq!(suggestion.notes, "clear daylight photo");
        assert!(suggestion.warnings.is_empty());
    }

    #[test]
    fn parse_unknown_tone_response() {
        let raw = r#"{"skin_tone":"unknown","confidence":0.1,"needs_better_photo":true,"notes":"strong warm cast","warnings":["tinted lighting"]}"#;
        let suggestion = parse_suggestion(raw).unwrap();
        assert_eq!(suggestion.tone, ToneLabel::Unknown);
        assert!(suggestion.needs_better_photo);
        assert_eq!(suggestion.warnings, vec!["tinted lighting"]);
    }

    #[test]
    fn extra_field_is_schema_violation() {
        let raw = r##"{"skin_tone":"TAN","confidence":0.8,"needs_better_photo":false,"notes":"","warnings":[],"hex":"#c68642"}"##;
        let err = parse_suggestion(raw).unwrap_err();
        assert!(matches!(err, SuggestError::SchemaViolation(_)), "{err}");
    }

    #[test]
    fn missing_field_is_schema_violation() {
        let raw = r#"{"skin_tone":"TAN","confidence":0.8,"notes":"","warnings":[]}"#;
        let err = parse_suggestion(raw).unwrap_err();
        assert!(matches!(err, SuggestError::SchemaViolation(_)), "{err}");
    }

    #[test]
    fn out_of_set_label_is_schema_violation() {
        let err = parse_suggestion(&conforming("OLIVE", 0.5)).unwrap_err();
        assert!(matches!(err, SuggestError::SchemaViolation(_)), "{err}");
    }

    #[test]
    fn out_of_bounds_confidence_is_schema_violation() {
        let err = parse_suggestion(&conforming("TAN", 1.2)).unwrap_err();
        assert!(matches!(err, SuggestError::SchemaViolation(_)), "{err}");

        let err = parse_suggestion(&conforming("TAN", -0.1)).unwrap_err();
        assert!(matches!(err, SuggestError::SchemaViolation(_)), "{err}");
    }

    #[test]
    fn boundary_confidence_accepted() {
        assert_eq!(parse_suggestion(&conforming("FAIR", 0.0)).unwrap().confidence, 0.0);
        assert_eq!(parse_suggestion(&conforming("DEEP", 1.0)).unwrap().confidence, 1.0);
    }

    #[test]
    fn non_json_body_is_schema_violation() {
        let err = parse_suggestion("I think the tone is TAN").unwrap_err();
        assert!(matches!(err, SuggestError::SchemaViolation(_)), "{err}");
    }

    // ── preselect ──

    #[test]
    fn preselect_uses_suggested_label() {
        let suggestion = parse_suggestion(&conforming("TAN", 0.82)).unwrap();
        let pre = suggestion.preselect();
        assert_eq!(pre.label, ToneLabel::Tan);
        assert!(!pre.is_fallback);
    }

    #[test]
    fn preselect_falls_back_to_first_label_on_unknown() {
        let suggestion = parse_suggestion(&conforming("unknown", 0.1)).unwrap();
        let pre = suggestion.preselect();
        assert_eq!(pre.label, ToneLabel::first());
        assert!(pre.is_fallback);
    }
}
