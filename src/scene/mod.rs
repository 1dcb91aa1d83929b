use crate::config::NarrationConfig;
use crate::error::VideoError;
use crate::video::ffmpeg::Ffmpeg;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

static PTS_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pts_time:(\d+(?:\.\d+)?)").expect("valid pts_time pattern"));

/// Visual scene cuts of a rendered video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAnalysis {
    /// Cut timestamps in seconds, in detection order
    pub scene_changes: Vec<f64>,
    /// Mean spacing between cuts
    pub avg_scene_duration: f64,
}

impl SceneAnalysis {
    /// No cuts; disables snapping.
    pub fn empty(default_duration: f64) -> Self {
        Self {
            scene_changes: Vec::new(),
            avg_scene_duration: default_duration,
        }
    }

    /// Build from detected cuts. Fewer than two cuts are treated as no data.
    pub fn from_cuts(cuts: Vec<f64>, default_duration: f64) -> Self {
        if cuts.len() < 2 {
            return Self::empty(default_duration);
        }

        let total: f64 = cuts.windows(2).map(|w| w[1] - w[0]).sum();
        let avg_scene_duration = total / (cuts.len() - 1) as f64;

        Self {
            scene_changes: cuts,
            avg_scene_duration,
        }
    }

    /// Closest cut to `time` if it lies strictly within `tolerance` seconds.
    pub fn snap(&self, time: f64, tolerance: f64) -> Option<f64> {
        self.scene_changes
            .iter()
            .copied()
            .min_by(|a, b| (a - time).abs().total_cmp(&(b - time).abs()))
            .filter(|cut| (cut - time).abs() < tolerance)
    }
}

/// Collect `pts_time` values from ffmpeg's metadata printout.
pub fn parse_scene_timestamps(text: &str) -> Vec<f64> {
    text.lines()
        .filter(|line| line.contains("pts_time"))
        .filter_map(|line| PTS_TIME.captures(line))
        .filter_map(|caps| caps[1].parse::<f64>().ok())
        .collect()
}

/// Detect scene cuts in a rendered video.
///
/// Advisory only: any failure is logged and reported as an empty analysis.
pub async fn analyze_video_pacing(
    ffmpeg: &Ffmpeg,
    video_path: &Path,
    config: &NarrationConfig,
) -> SceneAnalysis {
    info!("Analyzing scene changes in {}", video_path.display());

    let text = match ffmpeg
        .scene_metadata(video_path, config.scene_threshold)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            let e = VideoError::AnalysisError(e.to_string());
            warn!("Scene analysis unavailable, narration will not snap: {}", e);
            return SceneAnalysis::empty(config.default_scene_duration_secs);
        }
    };

    let analysis = SceneAnalysis::from_cuts(
        parse_scene_timestamps(&text),
        config.default_scene_duration_secs,
    );
    info!(
        "Found {} scene changes (avg {:.1}s per scene)",
        analysis.scene_changes.len(),
        analysis.avg_scene_duration
    );
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata_output() {
        let text = "frame:0    pts:15360   pts_time:1.2\n\
                    lavfi.scene_score=0.412\n\
                    frame:1    pts:76800   pts_time:6\n\
                    lavfi.scene_score=0.3\n\
                    frame:2    pts:110000  pts_time:8.593333\n";
        assert_eq!(parse_scene_timestamps(text), vec![1.2, 6.0, 8.593333]);
    }

    #[test]
    fn test_average_scene_duration() {
        let analysis = SceneAnalysis::from_cuts(vec![2.0, 5.0, 11.0], 3.0);
        assert_eq!(analysis.scene_changes.len(), 3);
        assert!((analysis.avg_scene_duration - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_cut_falls_back() {
        let analysis = SceneAnalysis::from_cuts(vec![4.0], 3.0);
        assert!(analysis.scene_changes.is_empty());
        assert_eq!(analysis.avg_scene_duration, 3.0);
    }

    #[test]
    fn test_snap_picks_closest_within_tolerance() {
        let analysis = SceneAnalysis::from_cuts(vec![8.0, 11.2, 20.0], 3.0);
        assert_eq!(analysis.snap(10.0, 1.5), Some(11.2));
        assert_eq!(analysis.snap(9.4, 1.5), Some(8.0));
        assert_eq!(analysis.snap(15.0, 1.5), None);
    }

    #[test]
    fn test_snap_boundary() {
        let analysis = SceneAnalysis::from_cuts(vec![0.0, 11.4], 3.0);
        assert_eq!(analysis.snap(10.0, 1.5), Some(11.4));
        let analysis = SceneAnalysis::from_cuts(vec![0.0, 11.5], 3.0);
        assert_eq!(analysis.snap(10.0, 1.5), None);
        let analysis = SceneAnalysis::from_cuts(vec![0.0, 11.6], 3.0);
        assert_eq!(analysis.snap(10.0, 1.5), None);
    }

    #[tokio::test]
    async fn test_missing_binary_degrades_to_empty() {
        let ffmpeg = Ffmpeg::new("/nonexistent/ffmpeg");
        let config = NarrationConfig::default();
        let analysis = analyze_video_pacing(&ffmpeg, Path::new("v.mp4"), &config).await;
        assert_eq!(analysis, SceneAnalysis::empty(3.0));
    }
}
