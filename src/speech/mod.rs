use crate::error::{Result, VideoError};
use crate::narration::{AudioSegmentFile, NarrationSegment};
use crate::video::ffmpeg::Ffmpeg;
use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Quality hint passed to the speech backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SpeechQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl SpeechQuality {
    /// LAME VBR quality (0 best, 9 worst).
    pub fn lame_quality(self) -> u8 {
        match self {
            SpeechQuality::Low => 7,
            SpeechQuality::Medium => 4,
            SpeechQuality::High => 0,
        }
    }
}

/// Turns text into a short playable audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, output_path: &Path, quality: SpeechQuality)
        -> Result<()>;
}

/// Speech through an external TTS program that writes WAV, transcoded to MP3.
pub struct CommandSynthesizer {
    program: String,
    ffmpeg: Ffmpeg,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>, ffmpeg: Ffmpeg) -> Self {
        Self {
            program: program.into(),
            ffmpeg,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        output_path: &Path,
        quality: SpeechQuality,
    ) -> Result<()> {
        if text.trim().is_empty() {
            return Err(VideoError::SynthesisError("empty text".to_string()));
        }

        info!("Generating speech for text: {}", text);

        let wav_path = output_path.with_extension("wav");
        let output = Command::new(&self.program)
            .arg("-w")
            .arg(&wav_path)
            .arg(text)
            .output()
            .await
            .map_err(|e| {
                VideoError::SynthesisError(format!("Failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::SynthesisError(format!(
                "{} failed: {}",
                self.program, error
            )));
        }

        let encoded = self.ffmpeg.encode_mp3(&wav_path, output_path, quality).await;
        tokio::fs::remove_file(&wav_path).await.ok();
        encoded.map_err(|e| VideoError::SynthesisError(e.to_string()))?;

        info!("Speech saved to: {}", output_path.display());
        Ok(())
    }
}

/// Path of the clip for segment `index` inside `dir`.
pub fn segment_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("segment_{:03}.mp3", index))
}

/// Synthesize every segment in order, one at a time.
///
/// Segments whose synthesis fails are logged and left out; the assembler
/// fills their slot with silence.
pub async fn synthesize_segments(
    synthesizer: &dyn SpeechSynthesizer,
    segments: &[NarrationSegment],
    dir: &Path,
    quality: SpeechQuality,
) -> Vec<AudioSegmentFile> {
    let mut clips = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let path = segment_path(dir, i);
        match synthesizer
            .synthesize(&segment.cleaned_text, &path, quality)
            .await
        {
            Ok(()) => clips.push(AudioSegmentFile {
                timestamp: segment.timestamp,
                file_path: path,
                source_text: segment.cleaned_text.clone(),
            }),
            Err(e) => warn!(
                "Speech synthesis failed for segment {} at {}s, leaving silence: {}",
                i, segment.timestamp, e
            ),
        }
    }

    info!(
        "Synthesized {}/{} narration segments",
        clips.len(),
        segments.len()
    );
    clips
}
