//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each stage of
//! the pipeline, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, EmotionConfig, EmotionDetector, LlmConfig, SessionConfig, SttConfig,
};
