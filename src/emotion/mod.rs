//! Emotion labels and the two classifiers that produce them.
//!
//! * [`TextEmotionClassifier`] — asks the chat model for one label.
//! * [`AudioEmotionClassifier`] — log-mel features → [`EmotionModel`] →
//!   arg-max → [`LabelTable`].
//!
//! Both funnel their output through [`EmotionPolicy::coerce`], so only
//! members of [`EmotionLabel`] ever leave this module.

pub mod audio;
pub mod features;
pub mod label;
pub mod model;
pub mod text;

pub use audio::{AudioEmotionClassifier, ClassificationError};
pub use features::{FbankExtractor, FeatureMatrix};
pub use label::{
    DetectedEmotion, EmotionLabel, EmotionPolicy, EmotionSource, LabelTable, Polarity,
    UnknownLabel,
};
pub use model::{EmotionModel, HttpEmotionModel};
pub use text::TextEmotionClassifier;
