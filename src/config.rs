use crate::error::{Result, VideoError};
use crate::speech::SpeechQuality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TTS_PROGRAM: &str = "espeak-ng";

/// Tunables for parsing, budgeting and aligning narration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Sync points above this count are resampled
    pub max_segments: usize,
    /// Interior points kept when resampling (first and last are always kept)
    pub resampled_interior: usize,
    /// Word cap applied when segments are created for synthesis
    pub segment_max_words: usize,
    /// Word cap applied by the assembler when estimating speaking time
    pub assembler_max_words: usize,
    /// Max distance (seconds) between a sync point and a scene cut for snapping
    pub snap_tolerance_secs: f64,
    /// Speaking-rate model
    pub words_per_second: f64,
    /// Lower bound on estimated segment length
    pub min_segment_secs: f64,
    /// ffmpeg scene-change score threshold (0-1)
    pub scene_threshold: f64,
    /// Reported when scene detection yields too little data
    pub default_scene_duration_secs: f64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            max_segments: 6,
            resampled_interior: 3,
            segment_max_words: 25,
            assembler_max_words: 20,
            snap_tolerance_secs: 1.5,
            words_per_second: 2.5,
            min_segment_secs: 1.5,
            scene_threshold: 0.2,
            default_scene_duration_secs: 3.0,
        }
    }
}

impl NarrationConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_segments < self.resampled_interior + 2 {
            return Err(VideoError::ConfigError(format!(
                "max_segments ({}) must leave room for first, last and {} interior points",
                self.max_segments, self.resampled_interior
            )));
        }
        if self.segment_max_words == 0 || self.assembler_max_words == 0 {
            return Err(VideoError::ConfigError(
                "word caps must be greater than zero".to_string(),
            ));
        }
        if self.words_per_second <= 0.0 {
            return Err(VideoError::ConfigError(
                "words_per_second must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.scene_threshold) {
            return Err(VideoError::ConfigError(
                "scene_threshold must be within 0..=1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-wide settings, built once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ffmpeg_path: PathBuf,
    pub tts_program: String,
    pub output_dir: PathBuf,
    pub quality: SpeechQuality,
    /// Opt-in presentation-timestamp multiplier applied before muxing
    pub speed_factor: Option<f64>,
    pub narration: NarrationConfig,
}

impl AppConfig {
    /// Resolve the ffmpeg binary: an explicit path wins, otherwise search PATH.
    pub fn resolve_ffmpeg(explicit: Option<String>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(PathBuf::from(path)),
            None => which::which("ffmpeg")
                .map_err(|_| VideoError::ConfigError("ffmpeg not found in PATH".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_keep_both_word_caps() {
        let config = NarrationConfig::default();
        assert_eq!(config.segment_max_words, 25);
        assert_eq!(config.assembler_max_words, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_small_segment_cap() {
        let config = NarrationConfig {
            max_segments: 3,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VideoError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_load_partial_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("narration.json");
        tokio::fs::write(&path, r#"{"snap_tolerance_secs": 2.0}"#)
            .await
            .unwrap();

        let config = NarrationConfig::load(&path).await.unwrap();
        assert_eq!(config.snap_tolerance_secs, 2.0);
        assert_eq!(config.max_segments, 6);
    }
}
