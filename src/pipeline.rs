use crate::config::AppConfig;
use crate::error::{Result, VideoError};
use crate::narration::{
    clean_text_for_speech, extract_sync_points, AudioSegmentFile, NarrationSegment,
    SegmentBudgeter, SyncPoint,
};
use crate::scene::analyze_video_pacing;
use crate::speech::{synthesize_segments, SpeechSynthesizer};
use crate::video::{AudioSegmentAssembler, AudioVideoMuxer, Ffmpeg};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One narration job: a script to voice over a rendered video.
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub script: String,
    pub video_path: PathBuf,
    /// Derived from the output directory when absent
    pub output_path: Option<PathBuf>,
}

/// States a request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParseMarkers,
    Budget,
    PerSegmentSynthesize,
    AnalyzeScenes,
    Assemble,
    Mux,
    FallbackWholeScriptSynthesize,
    LoopAndMux,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ParseMarkers => "parse-markers",
            Stage::Budget => "budget",
            Stage::PerSegmentSynthesize => "synthesize",
            Stage::AnalyzeScenes => "analyze-scenes",
            Stage::Assemble => "assemble",
            Stage::Mux => "mux",
            Stage::FallbackWholeScriptSynthesize => "fallback-synthesize",
            Stage::LoopAndMux => "loop-and-mux",
        };
        f.write_str(name)
    }
}

/// Drives a request from script to narrated video.
pub struct NarrationPipeline {
    config: AppConfig,
    ffmpeg: Ffmpeg,
    synthesizer: Box<dyn SpeechSynthesizer>,
}

impl NarrationPipeline {
    pub fn new(config: AppConfig, synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        let ffmpeg = Ffmpeg::new(config.ffmpeg_path.clone());
        Self {
            config,
            ffmpeg,
            synthesizer,
        }
    }

    /// Run a request to completion and return the final video path.
    ///
    /// Every intermediate file lives in a temp dir that is removed when this
    /// returns, whether it succeeds or fails.
    pub async fn run(&self, request: &NarrationRequest) -> Result<PathBuf> {
        let temp_dir = tempfile::Builder::new().prefix("narration-").tempdir()?;
        let work_dir = temp_dir.path();

        // 1. Retime the video if requested
        let video_path = match self.config.speed_factor {
            Some(factor) => {
                let slowed = work_dir.join("retimed.mp4");
                AudioVideoMuxer::new(self.ffmpeg.clone())
                    .adjust_speed(&request.video_path, factor, &slowed)
                    .await?;
                slowed
            }
            None => request.video_path.clone(),
        };

        // 2. Probe the video length every later step pads or cuts to
        let video_duration = self.ffmpeg.probe_duration(&video_path).await?;
        info!("Video duration: {:.1}s", video_duration);

        // 3. Synchronized narration, or one looped clip when markers are unusable
        let muxed = work_dir.join("narrated.mp4");
        let routed = route(&request.script)?;
        debug!("Routing to {}", routed.next_stage());
        match routed {
            Route::Synchronized(points) => {
                self.run_synchronized(points, &video_path, video_duration, work_dir, &muxed)
                    .await?
            }
            Route::Fallback => {
                self.run_fallback(&request.script, &video_path, video_duration, work_dir, &muxed)
                    .await?
            }
        }

        // 4. Copy out before the temp dir goes away
        let output_path = self.output_path(request);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&muxed, &output_path).await?;

        info!("Synchronized video created at {}", output_path.display());
        Ok(output_path)
    }

    async fn run_synchronized(
        &self,
        points: Vec<SyncPoint>,
        video_path: &Path,
        video_duration: f64,
        work_dir: &Path,
        output_path: &Path,
    ) -> Result<()> {
        let narration = &self.config.narration;

        // 1. Budget
        info!("[{}] Budgeting {} sync points", Stage::Budget, points.len());
        let segments = SegmentBudgeter::for_segments(narration).budget(points);

        // 2. Synthesize
        let clips = self.synthesize_clips(&segments, work_dir).await?;

        // 3. Scene cuts; failures only disable snapping
        info!("[{}]", Stage::AnalyzeScenes);
        let scenes = analyze_video_pacing(&self.ffmpeg, video_path, narration).await;

        // 4. Assemble the narration track
        info!("[{}]", Stage::Assemble);
        let audio_path = work_dir.join("synchronized_audio.mp3");
        AudioSegmentAssembler::new(self.ffmpeg.clone(), narration.clone())
            .assemble(&clips, &scenes, video_duration, work_dir, &audio_path)
            .await?;

        // 5. Mux
        let audio_duration = self.ffmpeg.probe_duration(&audio_path).await?;
        info!(
            "[{}] Video duration: {:.1}s, Audio duration: {:.1}s",
            Stage::Mux,
            video_duration,
            audio_duration
        );
        AudioVideoMuxer::new(self.ffmpeg.clone())
            .mux(video_path, &audio_path, output_path)
            .await
    }

    /// Synthesize each segment once. Failed segments are dropped; the request
    /// fails only when none survive.
    async fn synthesize_clips(
        &self,
        segments: &[NarrationSegment],
        work_dir: &Path,
    ) -> Result<Vec<AudioSegmentFile>> {
        info!(
            "[{}] Synthesizing {} segments",
            Stage::PerSegmentSynthesize,
            segments.len()
        );
        let clips = synthesize_segments(
            &*self.synthesizer,
            segments,
            work_dir,
            self.config.quality,
        )
        .await;
        if clips.is_empty() {
            return Err(VideoError::SynthesisError(
                "Failed to create any audio segments".to_string(),
            ));
        }
        Ok(clips)
    }

    async fn run_fallback(
        &self,
        script: &str,
        video_path: &Path,
        video_duration: f64,
        work_dir: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!("[{}]", Stage::FallbackWholeScriptSynthesize);
        let text = clean_text_for_speech(script);
        let clip_path = work_dir.join("narration.mp3");
        self.synthesizer
            .synthesize(&text, &clip_path, self.config.quality)
            .await?;

        info!("[{}]", Stage::LoopAndMux);
        AudioVideoMuxer::new(self.ffmpeg.clone())
            .mux_looped(video_path, video_duration, &clip_path, output_path)
            .await
    }

    fn output_path(&self, request: &NarrationRequest) -> PathBuf {
        request.output_path.clone().unwrap_or_else(|| {
            self.config
                .output_dir
                .join(format!("{}.mp4", Uuid::new_v4()))
        })
    }
}

/// Path a script takes after marker parsing.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Synchronized(Vec<SyncPoint>),
    Fallback,
}

impl Route {
    fn next_stage(&self) -> Stage {
        match self {
            Route::Synchronized(_) => Stage::Budget,
            Route::Fallback => Stage::FallbackWholeScriptSynthesize,
        }
    }
}

/// Missing or unparseable markers send the whole script down the fallback.
fn route(script: &str) -> Result<Route> {
    info!("[{}] Extracting sync points", Stage::ParseMarkers);
    match extract_sync_points(script) {
        Ok(points) => Ok(Route::Synchronized(points)),
        Err(e @ (VideoError::NoSyncMarkers | VideoError::InvalidSyncMarker(_))) => {
            warn!("{}; falling back to unsynchronized narration", e);
            Ok(Route::Fallback)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NarrationConfig;
    use crate::speech::SpeechQuality;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Records every text it is asked to speak; writes nothing.
    struct RecordingSynthesizer {
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for RecordingSynthesizer {
        async fn synthesize(
            &self,
            text: &str,
            _path: &Path,
            _quality: SpeechQuality,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(VideoError::SynthesisError("engine offline".to_string()));
            }
            Ok(())
        }
    }

    fn pipeline_with(
        output_dir: &str,
        fail: bool,
    ) -> (NarrationPipeline, Arc<Mutex<Vec<String>>>) {
        let config = AppConfig {
            gemini_api_key: None,
            gemini_model: "test".to_string(),
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg"),
            tts_program: "true".to_string(),
            output_dir: PathBuf::from(output_dir),
            quality: SpeechQuality::Medium,
            speed_factor: None,
            narration: NarrationConfig::default(),
        };
        let calls = Arc::new(Mutex::new(Vec::new()));
        let synthesizer = RecordingSynthesizer {
            calls: calls.clone(),
            fail,
        };
        (NarrationPipeline::new(config, Box::new(synthesizer)), calls)
    }

    fn pipeline(output_dir: &str) -> NarrationPipeline {
        pipeline_with(output_dir, false).0
    }

    #[test]
    fn test_explicit_output_path_wins() {
        let request = NarrationRequest {
            script: String::new(),
            video_path: PathBuf::from("in.mp4"),
            output_path: Some(PathBuf::from("out/final.mp4")),
        };
        assert_eq!(
            pipeline("videos").output_path(&request),
            PathBuf::from("out/final.mp4")
        );
    }

    #[test]
    fn test_derived_output_paths_are_unique() {
        let request = NarrationRequest {
            script: String::new(),
            video_path: PathBuf::from("in.mp4"),
            output_path: None,
        };
        let p = pipeline("videos");
        let a = p.output_path(&request);
        let b = p.output_path(&request);

        assert_ne!(a, b);
        assert!(a.starts_with("videos"));
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("mp4"));
    }

    #[tokio::test]
    async fn test_media_tool_failure_is_fatal() {
        let request = NarrationRequest {
            script: "[SYNC: 0] Hello".to_string(),
            video_path: PathBuf::from("missing.mp4"),
            output_path: None,
        };
        let result = pipeline("videos").run(&request).await;
        assert!(matches!(result, Err(VideoError::FfmpegError { .. })));
    }

    #[test]
    fn test_marked_script_takes_synchronized_path() {
        let routed = route("[SYNC: 0] Intro [SYNC: 12] Slopes").unwrap();
        assert_eq!(routed.next_stage(), Stage::Budget);
        match routed {
            Route::Synchronized(points) => {
                let stamps: Vec<u32> = points.iter().map(|p| p.timestamp).collect();
                assert_eq!(stamps, vec![0, 12]);
            }
            Route::Fallback => panic!("expected synchronized route"),
        }
    }

    #[test]
    fn test_unmarked_script_falls_back() {
        let routed = route("A plain overview of derivatives.").unwrap();
        assert_eq!(routed, Route::Fallback);
        assert_eq!(routed.next_stage(), Stage::FallbackWholeScriptSynthesize);
    }

    #[test]
    fn test_overflowing_timestamp_falls_back() {
        assert_eq!(route("[SYNC: 99999999999] Too late").unwrap(), Route::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_speaks_whole_cleaned_script_once() {
        let dir = TempDir::new().unwrap();
        let (pipeline, calls) = pipeline_with("videos", false);
        let script = "Slopes [PAUSE] measure $m$ change.";

        let result = pipeline
            .run_fallback(
                script,
                Path::new("in.mp4"),
                30.0,
                dir.path(),
                &dir.path().join("out.mp4"),
            )
            .await;

        // ffmpeg is missing, so looping fails after synthesis
        assert!(matches!(result, Err(VideoError::FfmpegError { .. })));
        assert_eq!(*calls.lock().unwrap(), vec!["Slopes measure symbol change."]);
    }

    #[tokio::test]
    async fn test_all_segments_failing_is_a_synthesis_error() {
        let dir = TempDir::new().unwrap();
        let (pipeline, calls) = pipeline_with("videos", true);
        let segments = vec![
            NarrationSegment::new(0, "Intro".to_string()),
            NarrationSegment::new(10, "Body".to_string()),
        ];

        let result = pipeline.synthesize_clips(&segments, dir.path()).await;

        assert!(matches!(result, Err(VideoError::SynthesisError(_))));
        assert_eq!(*calls.lock().unwrap(), vec!["Intro", "Body"]);
    }

    #[tokio::test]
    async fn test_surviving_segments_are_returned() {
        let dir = TempDir::new().unwrap();
        let (pipeline, calls) = pipeline_with("videos", false);
        let segments = vec![NarrationSegment::new(4, "Only one".to_string())];

        let clips = pipeline.synthesize_clips(&segments, dir.path()).await.unwrap();

        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].timestamp, 4);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::LoopAndMux.to_string(), "loop-and-mux");
        assert_eq!(Stage::ParseMarkers.to_string(), "parse-markers");
    }
}
