use crate::error::{Result, VideoError};
use crate::speech::SpeechQuality;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, error, info};

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2}\.\d{2})").expect("valid duration pattern")
});

/// Thin wrapper over the ffmpeg CLI. Every call blocks the request until the
/// process exits; nothing is retried.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn output(&self, args: &[String]) -> Result<Output> {
        debug!("ffmpeg {}", args.join(" "));
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| VideoError::ffmpeg(format!("Failed to run FFmpeg: {}", e), ""))
    }

    /// Run ffmpeg and fail on a non-zero exit, keeping the raw diagnostics.
    async fn run(&self, what: &str, args: Vec<String>) -> Result<()> {
        let output = self.output(&args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!("FFmpeg {} failed: {}", what, stderr);
            return Err(VideoError::ffmpeg(format!("FFmpeg {} failed", what), stderr));
        }

        Ok(())
    }

    pub async fn create_silence(&self, duration: f64, output_path: &Path) -> Result<()> {
        self.run("silence creation", silence_args(duration, output_path))
            .await
    }

    pub async fn encode_mp3(
        &self,
        input: &Path,
        output_path: &Path,
        quality: SpeechQuality,
    ) -> Result<()> {
        let args = strings([
            "-y".into(),
            "-i".into(),
            path_arg(input),
            "-c:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            quality.lame_quality().to_string(),
            path_arg(output_path),
        ]);
        self.run("mp3 encoding", args).await
    }

    /// Concatenate the files listed in a concat-demuxer manifest.
    pub async fn concat_audio(&self, list_file: &Path, output_path: &Path) -> Result<()> {
        info!("Concatenating audio segments...");
        let args = strings([
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            path_arg(list_file),
            "-c:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            "0".into(),
            path_arg(output_path),
        ]);
        self.run("concat", args).await?;
        info!("Concatenated audio: {}", output_path.display());
        Ok(())
    }

    /// Replace the audio of `video_path`, copying the video stream as-is.
    pub async fn add_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!("Adding audio to video...");
        self.run("audio merge", mux_args(video_path, audio_path, output_path))
            .await?;
        info!("Added audio to video: {}", output_path.display());
        Ok(())
    }

    /// Loop `audio_path` `loops` times under the video, cut to `duration`.
    pub async fn add_looped_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        loops: u32,
        duration: f64,
        output_path: &Path,
    ) -> Result<()> {
        info!("Looping narration {} time(s) over {:.1}s of video...", loops, duration);
        let args = loop_mux_args(video_path, audio_path, loops, duration, output_path);
        self.run("looped audio merge", args).await
    }

    /// Retime the video by multiplying presentation timestamps by `factor`.
    pub async fn change_speed(
        &self,
        video_path: &Path,
        factor: f64,
        output_path: &Path,
    ) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(VideoError::ConfigError(format!(
                "speed factor must be positive, got {}",
                factor
            )));
        }
        info!("Adjusting video speed (setpts={}*PTS)...", factor);
        self.run("speed adjustment", speed_args(video_path, factor, output_path))
            .await
    }

    /// Duration of a media file, scraped from ffmpeg's diagnostic output.
    pub async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let args = strings([
            "-i".into(),
            path_arg(path),
            "-f".into(),
            "null".into(),
            "-".into(),
        ]);
        let output = self.output(&args).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        parse_duration_text(&stderr).ok_or_else(|| {
            error!("No duration in FFmpeg output for {}: {}", path.display(), stderr);
            VideoError::DurationUnavailable(path.display().to_string())
        })
    }

    /// Raw output of the scene-change filter, stdout followed by stderr.
    pub async fn scene_metadata(&self, video_path: &Path, threshold: f64) -> Result<String> {
        let args = strings([
            "-hide_banner".into(),
            "-i".into(),
            path_arg(video_path),
            "-vf".into(),
            format!("select=gt(scene\\,{}),metadata=print:file=-", threshold),
            "-f".into(),
            "null".into(),
            "-".into(),
        ]);
        let output = self.output(&args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(VideoError::ffmpeg("FFmpeg scene detection failed", stderr));
        }

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}

/// Parse `Duration: HH:MM:SS.ff` into seconds.
pub fn parse_duration_text(text: &str) -> Option<f64> {
    let caps = DURATION.captures(text)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// How many times a clip must play back to back to cover the video.
pub fn loop_count(video_duration: f64, audio_duration: f64) -> Result<u32> {
    if !audio_duration.is_finite() || audio_duration <= 0.0 {
        return Err(VideoError::DurationUnavailable(format!(
            "narration clip reported {}s",
            audio_duration
        )));
    }
    Ok(((video_duration / audio_duration).ceil() as u32).max(1))
}

/// One line of a concat-demuxer manifest.
pub fn concat_list_line(path: &Path) -> String {
    let escaped = path.display().to_string().replace('\'', "'\\''");
    format!("file '{}'\n", escaped)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn strings<const N: usize>(args: [String; N]) -> Vec<String> {
    args.into()
}

fn silence_args(duration: f64, output_path: &Path) -> Vec<String> {
    strings([
        "-y".into(),
        "-f".into(),
        "lavfi".into(),
        "-i".into(),
        "anullsrc=r=44100:cl=stereo".into(),
        "-t".into(),
        format!("{:.3}", duration),
        "-q:a".into(),
        "0".into(),
        "-c:a".into(),
        "libmp3lame".into(),
        path_arg(output_path),
    ])
}

fn mux_args(video_path: &Path, audio_path: &Path, output_path: &Path) -> Vec<String> {
    strings([
        "-y".into(),
        "-i".into(),
        path_arg(video_path),
        "-i".into(),
        path_arg(audio_path),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        "-shortest".into(),
        path_arg(output_path),
    ])
}

fn loop_mux_args(
    video_path: &Path,
    audio_path: &Path,
    loops: u32,
    duration: f64,
    output_path: &Path,
) -> Vec<String> {
    strings([
        "-y".into(),
        "-i".into(),
        path_arg(video_path),
        "-stream_loop".into(),
        loops.saturating_sub(1).to_string(),
        "-i".into(),
        path_arg(audio_path),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        "-t".into(),
        format!("{:.3}", duration),
        path_arg(output_path),
    ])
}

fn speed_args(video_path: &Path, factor: f64, output_path: &Path) -> Vec<String> {
    strings([
        "-y".into(),
        "-i".into(),
        path_arg(video_path),
        "-filter:v".into(),
        format!("setpts={}*PTS", factor),
        "-an".into(),
        path_arg(output_path),
    ])
}
