//! Result normalizer
//!
//! Repairs raw result entries into the canonical [`ModelResult`] schema
//! instead of rejecting them: missing names and accuracies get documented
//! defaults, and a wholly absent classification report is synthesized as
//! the zero-valued five-label default. A report that is present but missing
//! its `macro avg` / `weighted avg` keys is left alone; consumers tolerate
//! absent aggregates.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{default_report, ClassificationMetrics, ModelResult, DEFAULT_MODEL_NAME};

/// Raw result entry as emitted by the analysis program. Every field is
/// optional; defaulting happens in [`normalize`].
#[derive(Debug, Default, Deserialize)]
struct RawModelResult {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    classification_report: Option<serde_json::Map<String, Value>>,
}

/// Raw metrics block. sklearn emits `support` as a float for the weighted
/// aggregate row, so it is accepted as f64 and cast down.
#[derive(Debug, Default, Deserialize)]
struct RawMetrics {
    #[serde(default)]
    precision: f64,
    #[serde(default)]
    recall: f64,
    #[serde(default, rename = "f1-score")]
    f1_score: f64,
    #[serde(default)]
    support: f64,
}

impl From<RawMetrics> for ClassificationMetrics {
    fn from(raw: RawMetrics) -> Self {
        ClassificationMetrics {
            precision: raw.precision,
            recall: raw.recall,
            f1_score: raw.f1_score,
            support: raw.support as u64,
        }
    }
}

/// Map raw payload entries into canonical, ordered model results.
///
/// Never fails: unrecognizable entries degrade to a fully-defaulted result.
/// Normalizing an already-canonical payload is the identity transform.
pub fn normalize(raw_results: Vec<Value>) -> Vec<ModelResult> {
    raw_results.into_iter().map(normalize_entry).collect()
}

fn normalize_entry(value: Value) -> ModelResult {
    let raw: RawModelResult = serde_json::from_value(value).unwrap_or_default();

    let classification_report = match raw.classification_report {
        Some(report) => report
            .into_iter()
            // sklearn embeds a bare "accuracy": <number> entry in the
            // report; only object-valued entries are metric blocks.
            .filter(|(_, v)| v.is_object())
            .map(|(label, v)| {
                let metrics: RawMetrics = serde_json::from_value(v).unwrap_or_default();
                (label, metrics.into())
            })
            .collect(),
        None => {
            debug!("Raw result carried no classification report; synthesizing default");
            default_report()
        }
    };

    ModelResult {
        model: raw.model.unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
        accuracy: raw.accuracy.unwrap_or(0.0),
        classification_report,
    }
}
