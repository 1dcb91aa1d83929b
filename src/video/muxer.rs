use crate::error::Result;
use crate::video::ffmpeg::{loop_count, Ffmpeg};
use std::path::Path;
use tracing::info;

/// Puts a narration track under a rendered video.
pub struct AudioVideoMuxer {
    ffmpeg: Ffmpeg,
}

impl AudioVideoMuxer {
    pub fn new(ffmpeg: Ffmpeg) -> Self {
        Self { ffmpeg }
    }

    /// Replace the video's audio with `audio_path`, trimmed to the shorter input.
    pub async fn mux(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        self.ffmpeg.add_audio(video_path, audio_path, output_path).await
    }

    /// Repeat a single unsynchronized clip until it covers the whole video.
    pub async fn mux_looped(
        &self,
        video_path: &Path,
        video_duration: f64,
        clip_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        let clip_duration = self.ffmpeg.probe_duration(clip_path).await?;
        let loops = loop_count(video_duration, clip_duration)?;
        info!(
            "Video duration: {:.1}s, Audio duration: {:.1}s, loops: {}",
            video_duration, clip_duration, loops
        );

        self.ffmpeg
            .add_looped_audio(video_path, clip_path, loops, video_duration, output_path)
            .await
    }

    /// Uniformly retime the video before muxing (factor > 1 slows it down).
    pub async fn adjust_speed(
        &self,
        video_path: &Path,
        factor: f64,
        output_path: &Path,
    ) -> Result<()> {
        self.ffmpeg.change_speed(video_path, factor, output_path).await
    }
}
