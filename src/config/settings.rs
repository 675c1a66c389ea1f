//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::CropPolicy;
use crate::emotion::features::WIN_LENGTH;
use crate::emotion::{EmotionLabel, EmotionPolicy, LabelTable};

// ---------------------------------------------------------------------------
// EmotionDetector
// ---------------------------------------------------------------------------

/// Which detector labels the emotion of an audio turn.
///
/// Text turns always use the text classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionDetector {
    /// Classify the transcript with the language model.
    Text,
    /// Run the audio classifier on the normalised waveform.
    Audio,
}

impl Default for EmotionDetector {
    fn default() -> Self {
        Self::Text
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the OpenAI-compatible language-model endpoint.
///
/// Used for both emotion classification and reply generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the API endpoint.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key — `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"qwen2.5:3b"`, `"gpt-4o-mini"`).
    pub model: String,
    /// Sampling temperature for replies.  Classification always runs at 0.0.
    pub temperature: f32,
    /// Maximum seconds to wait for a response before timing out.
    pub timeout_secs: u64,
    /// Upper bound on generated reply tokens.
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "qwen2.5:3b".into(),
            temperature: 0.7,
            timeout_secs: 20,
            max_tokens: 512,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper speech recogniser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// GGML model file stem inside the models directory (e.g. `"ggml-base"`).
    pub model: String,
    /// Recognition languages in the order they are tried.  Locale tags such
    /// as `"ko-KR"` are accepted.
    pub languages: Vec<String>,
    /// Attempt GPU-accelerated inference when available.
    pub use_gpu: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "ggml-base".into(),
            languages: vec!["ko-KR".into(), "en-US".into()],
            use_gpu: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Signal shaping applied before classification and transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate the classifier expects, in Hz.
    pub target_rate: u32,
    /// Classifier window length in samples (16 000 = one second at 16 kHz).
    pub target_length: usize,
    /// How over-long clips are cut down to `target_length`.
    pub crop_policy: CropPolicy,
    /// Uploads smaller than this many bytes are rejected as truncated.
    pub min_audio_bytes: usize,
    /// Length of the leading segment used to estimate ambient noise.
    pub calibration_secs: f32,
    /// Speech must exceed the noise floor by this factor.
    pub energy_ratio: f32,
    /// Absolute RMS floor for speech, regardless of calibration.
    pub min_energy: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_rate: 16_000,
            target_length: 16_000,
            crop_policy: CropPolicy::default(),
            min_audio_bytes: 1_000,
            calibration_secs: 0.5,
            energy_ratio: 1.5,
            min_energy: 0.005,
        }
    }
}

// ---------------------------------------------------------------------------
// EmotionConfig
// ---------------------------------------------------------------------------

/// Label table, default label and statistics partitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionConfig {
    /// Detector used for audio turns.
    pub detector: EmotionDetector,
    /// Classifier output index → label.
    pub labels: Vec<EmotionLabel>,
    /// Substituted for any output outside the label set.
    pub default_label: EmotionLabel,
    /// Labels counted as positive in conversation statistics.
    pub positive: Vec<EmotionLabel>,
    /// Labels counted as negative in conversation statistics.
    pub negative: Vec<EmotionLabel>,
    /// Model-serving endpoint for the audio classifier.  Required when
    /// `detector = "audio"`.
    pub classifier_url: Option<String>,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        let policy = EmotionPolicy::default();
        Self {
            detector: EmotionDetector::default(),
            labels: EmotionLabel::ALL.to_vec(),
            default_label: policy.default_label,
            positive: policy.positive,
            negative: policy.negative,
            classifier_url: None,
        }
    }
}

impl EmotionConfig {
    pub fn policy(&self) -> EmotionPolicy {
        EmotionPolicy {
            default_label: self.default_label,
            positive: self.positive.clone(),
            negative: self.negative.clone(),
        }
    }

    pub fn label_table(&self) -> LabelTable {
        LabelTable::new(self.labels.clone())
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Conversation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// First assistant message of every new conversation.
    pub greeting: String,
    /// Persona selected at startup.
    pub default_persona: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello! How was your day? Tell me freely how you feel. \
                       You can type a message or send a voice recording."
                .into(),
            default_persona: "companion".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use emotion_chat::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub stt: SttConfig,
    pub audio: AudioConfig,
    pub emotion: EmotionConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.audio.target_rate == 0 {
            bail!("audio.target_rate must be positive");
        }
        if self.audio.target_length == 0 {
            bail!("audio.target_length must be positive");
        }
        if self.emotion.detector == EmotionDetector::Audio
            && self.audio.target_length < WIN_LENGTH
        {
            bail!(
                "audio.target_length must be at least {WIN_LENGTH} samples for the audio detector"
            );
        }
        if self.stt.languages.is_empty() {
            bail!("stt.languages must list at least one language");
        }
        if self.emotion.labels.is_empty() {
            bail!("emotion.labels must map at least one class index");
        }
        if let Some(overlap) = self
            .emotion
            .positive
            .iter()
            .find(|label| self.emotion.negative.contains(label))
        {
            bail!("emotion label {overlap} is listed as both positive and negative");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
