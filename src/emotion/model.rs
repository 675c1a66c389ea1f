//! The classification model seam.
//!
//! [`EmotionModel`] takes a feature matrix and returns one score per class.
//! [`HttpEmotionModel`] forwards the features to a model-serving endpoint;
//! tests use fixed-score doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::audio::ClassificationError;
use super::features::FeatureMatrix;

/// Pretrained audio classifier.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn EmotionModel>`.
#[async_trait]
pub trait EmotionModel: Send + Sync {
    /// One score (logit or probability) per class index.
    async fn infer(&self, features: &FeatureMatrix) -> Result<Vec<f32>, ClassificationError>;
}

#[derive(Serialize)]
struct InferRequest<'a> {
    frames: usize,
    bins: usize,
    features: &'a [f32],
}

#[derive(Deserialize)]
struct InferResponse {
    #[serde(alias = "logits")]
    scores: Vec<f32>,
}

/// POSTs features as JSON to `url` and reads `{"scores": [...]}` back
/// (`"logits"` is accepted as well).
pub struct HttpEmotionModel {
    client: reqwest::Client,
    url: String,
}

impl HttpEmotionModel {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EmotionModel for HttpEmotionModel {
    async fn infer(&self, features: &FeatureMatrix) -> Result<Vec<f32>, ClassificationError> {
        let body = InferRequest {
            frames: features.frames,
            bins: features.bins,
            features: &features.values,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ClassificationError::Model(e.to_string()))?;

        let parsed: InferResponse = response
            .json()
            .await
            .map_err(|e| ClassificationError::Model(format!("bad response: {e}")))?;

        Ok(parsed.scores)
    }
}
