//! Decode, preprocess, infer, decode the argmax and enrich with reference data

use crate::error::ClassifyError;
use crate::preprocess::{decode_image, preprocess};
use crate::reference::WeightStats;
use crate::resources::ResourceBundle;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Outcome of classifying one image, created fresh for every call
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: String,
    /// Highest score scaled to a percentage, always within `0.0..=100.0`
    pub confidence: f32,
    /// `None` when the label has no reference entry
    pub weights: Option<WeightStats>,
}

impl PredictionResult {
    pub fn weights_view(&self) -> WeightsView {
        WeightsView::from(self.weights.as_ref())
    }
}

/// Weight fields as rendered to callers, `"N/A"` when absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightsView {
    pub min: String,
    pub avg: String,
    pub max: String,
}

impl From<Option<&WeightStats>> for WeightsView {
    fn from(stats: Option<&WeightStats>) -> Self {
        let stats = stats.cloned().unwrap_or_else(WeightStats::not_available);
        Self {
            min: stats.min,
            avg: stats.avg,
            max: stats.max,
        }
    }
}

/// Index and value of the largest score. Ties go to the lowest index and NaN
/// never wins. Returns `None` for an empty or all-NaN vector.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best
}

/// Scale a probability-like score to a percentage. Scores are not
/// renormalized across the vector, only clamped.
pub fn confidence_percent(score: f32) -> f32 {
    (score * 100.0).clamp(0.0, 100.0)
}

/// Run the full pipeline against an already loaded bundle
pub fn classify(bundle: &ResourceBundle, bytes: &[u8]) -> Result<PredictionResult, ClassifyError> {
    let started = Instant::now();

    let image = decode_image(bytes)?;
    let tensor = preprocess(&image, bundle.input_size());
    let scores = bundle.classifier().infer(&tensor)?;

    let labels = bundle.labels();
    let Some((index, top)) = argmax(&scores) else {
        tracing::error!(
            scores = scores.len(),
            labels = labels.len(),
            "Classifier returned no usable scores"
        );
        return Err(ClassifyError::NoScores { len: scores.len() });
    };

    let Some(label) = labels.get(index) else {
        tracing::error!(
            index,
            labels = labels.len(),
            scores = scores.len(),
            "Classifier output does not match the label table"
        );
        return Err(ClassifyError::IndexOutOfRange {
            index,
            labels: labels.len(),
        });
    };

    let weights = bundle.reference().get(label).cloned();
    if weights.is_none() {
        tracing::debug!(label, "No reference weight data for label");
    }

    let result = PredictionResult {
        label: label.to_string(),
        confidence: confidence_percent(top),
        weights,
    };

    tracing::debug!(
        label = %result.label,
        confidence = result.confidence,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Classified image"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
    }

    #[test]
    fn argmax_ties_go_to_first() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4, 0.0]), Some((1, 0.4)));
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.1]), Some((1, 0.3)));
        assert_eq!(argmax(&[f32::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(confidence_percent(0.9), 90.0);
        assert_eq!(confidence_percent(1.5), 100.0);
        assert_eq!(confidence_percent(-0.2), 0.0);
    }

    #[test]
    fn missing_weights_render_as_not_available() {
        let view = WeightsView::from(None);
        assert_eq!(view.min, "N/A");
        assert_eq!(view.avg, "N/A");
        assert_eq!(view.max, "N/A");
    }
}
