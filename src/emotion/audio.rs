//! Emotion classification from a normalised audio window.
//!
//! ```text
//! AudioSignal (mono, target rate, target length)
//!   → FbankExtractor → EmotionModel::infer → arg-max → LabelTable → label
//! ```

use std::sync::Arc;

use thiserror::Error;

use super::features::{frame_count, FbankExtractor, N_MELS};
use super::label::{EmotionLabel, EmotionPolicy, LabelTable};
use super::model::EmotionModel;
use crate::audio::AudioSignal;

/// Why the audio classifier could not produce a label.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassificationError {
    /// The signal does not satisfy the normaliser's post-conditions.
    #[error("signal is not normalised: {0}")]
    InvalidSignal(String),

    /// Extracted features have an unexpected shape.
    #[error("feature shape mismatch: expected {expected_frames}x{expected_bins}, got {frames}x{bins}")]
    FeatureShape {
        expected_frames: usize,
        expected_bins: usize,
        frames: usize,
        bins: usize,
    },

    /// The model returned no scores.
    #[error("model returned no scores")]
    EmptyScores,

    /// The model returned NaN or infinite scores.
    #[error("model returned non-finite scores")]
    NonFinite,

    /// The model collaborator failed.
    #[error("model inference failed: {0}")]
    Model(String),
}

/// Wraps a pretrained [`EmotionModel`] behind the label table and policy.
pub struct AudioEmotionClassifier {
    model: Arc<dyn EmotionModel>,
    extractor: FbankExtractor,
    table: LabelTable,
    policy: EmotionPolicy,
    target_rate: u32,
    target_length: usize,
}

impl AudioEmotionClassifier {
    pub fn new(
        model: Arc<dyn EmotionModel>,
        table: LabelTable,
        policy: EmotionPolicy,
        target_rate: u32,
        target_length: usize,
    ) -> Self {
        Self {
            model,
            extractor: FbankExtractor::new(target_rate),
            table,
            policy,
            target_rate,
            target_length,
        }
    }

    /// Classify one normalised window.
    ///
    /// The signal is not renormalised; anything other than mono audio at
    /// the target rate and length is rejected.  An arg-max index missing
    /// from the label table yields the default label.
    pub async fn classify(
        &self,
        signal: &AudioSignal,
    ) -> Result<EmotionLabel, ClassificationError> {
        self.check_signal(signal)?;

        let features = self.extractor.extract(&signal.samples);
        let expected_frames = frame_count(self.target_length);
        if features.frames != expected_frames
            || features.bins != N_MELS
            || !features.is_well_formed()
        {
            return Err(ClassificationError::FeatureShape {
                expected_frames,
                expected_bins: N_MELS,
                frames: features.frames,
                bins: features.bins,
            });
        }

        let scores = self.model.infer(&features).await?;
        let index = argmax(&scores)?;

        let label = self.table.lookup(index);
        if label.is_none() {
            log::warn!(
                "emotion: class index {index} not in label table ({} entries), using {}",
                self.table.len(),
                self.policy.default_label
            );
        }
        Ok(self.policy.coerce(label))
    }

    fn check_signal(&self, signal: &AudioSignal) -> Result<(), ClassificationError> {
        if signal.channels != 1 {
            return Err(ClassificationError::InvalidSignal(format!(
                "{} channels, expected mono",
                signal.channels
            )));
        }
        if signal.sample_rate != self.target_rate {
            return Err(ClassificationError::InvalidSignal(format!(
                "{} Hz, expected {} Hz",
                signal.sample_rate, self.target_rate
            )));
        }
        if signal.samples.len() != self.target_length {
            return Err(ClassificationError::InvalidSignal(format!(
                "{} samples, expected {}",
                signal.samples.len(),
                self.target_length
            )));
        }
        Ok(())
    }
}

/// Index of the highest score; ties resolve to the lowest index.
fn argmax(scores: &[f32]) -> Result<usize, ClassificationError> {
    if scores.is_empty() {
        return Err(ClassificationError::EmptyScores);
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(ClassificationError::NonFinite);
    }
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = i;
        }
    }
    Ok(best)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::emotion::features::FeatureMatrix;
    use async_trait::async_trait;

    /// Returns the same scores for every input.
    pub(crate) struct FixedModel(pub Vec<f32>);

    #[async_trait]
    impl EmotionModel for FixedModel {
        async fn infer(&self, _: &FeatureMatrix) -> Result<Vec<f32>, ClassificationError> {
            Ok(self.0.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl EmotionModel for FailingModel {
        async fn infer(&self, _: &FeatureMatrix) -> Result<Vec<f32>, ClassificationError> {
            Err(ClassificationError::Model("offline".into()))
        }
    }

    fn classifier(model: impl EmotionModel + 'static) -> AudioEmotionClassifier {
        AudioEmotionClassifier::new(
            Arc::new(model),
            LabelTable::default(),
            EmotionPolicy::default(),
            16_000,
            16_000,
        )
    }

    fn window() -> AudioSignal {
        let samples = (0..16_000)
            .map(|i| 0.3 * (i as f32 * 0.05).sin())
            .collect();
        AudioSignal::mono(samples, 16_000)
    }

    #[tokio::test]
    async fn argmax_maps_through_table() {
        let c = classifier(FixedModel(vec![0.1, 0.0, 0.2, 0.05, 0.1, 0.9]));
        assert_eq!(c.classify(&window()).await.unwrap(), EmotionLabel::Sad);
    }

    #[tokio::test]
    async fn index_outside_table_is_default() {
        let c = classifier(FixedModel(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0]));
        assert_eq!(c.classify(&window()).await.unwrap(), EmotionLabel::Neutral);
    }

    #[tokio::test]
    async fn unnormalised_signal_is_rejected() {
        let c = classifier(FixedModel(vec![1.0]));
        let stereo = AudioSignal::new(vec![0.0; 32_000], 16_000, 2);
        assert!(matches!(
            c.classify(&stereo).await,
            Err(ClassificationError::InvalidSignal(_))
        ));
        let short = AudioSignal::mono(vec![0.0; 8_000], 16_000);
        assert!(matches!(
            c.classify(&short).await,
            Err(ClassificationError::InvalidSignal(_))
        ));
        let wrong_rate = AudioSignal::mono(vec![0.0; 16_000], 8_000);
        assert!(matches!(
            c.classify(&wrong_rate).await,
            Err(ClassificationError::InvalidSignal(_))
        ));
    }

    #[tokio::test]
    async fn bad_scores_are_errors() {
        let empty = classifier(FixedModel(Vec::new()));
        assert_eq!(
            empty.classify(&window()).await,
            Err(ClassificationError::EmptyScores)
        );
        let nan = classifier(FixedModel(vec![0.1, f32::NAN]));
        assert_eq!(
            nan.classify(&window()).await,
            Err(ClassificationError::NonFinite)
        );
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let c = classifier(FailingModel);
        assert!(matches!(
            c.classify(&window()).await,
            Err(ClassificationError::Model(_))
        ));
    }

    #[tokio::test]
    async fn deterministic_for_fixed_input() {
        let c = classifier(FixedModel(vec![0.0, 0.0, 0.0, 2.0]));
        let a = c.classify(&window()).await.unwrap();
        let b = c.classify(&window()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a, EmotionLabel::Happy);
    }

    #[test]
    fn ties_pick_lowest_index() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]).unwrap(), 1);
    }
}
