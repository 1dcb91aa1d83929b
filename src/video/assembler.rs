use crate::config::NarrationConfig;
use crate::error::Result;
use crate::narration::budget::truncate_words;
use crate::narration::AudioSegmentFile;
use crate::scene::SceneAnalysis;
use crate::video::ffmpeg::{concat_list_line, Ffmpeg};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Gaps shorter than this are float noise, not pauses.
const MIN_SILENCE_SECS: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TimelineClip {
    Silence { duration: f64 },
    Speech { path: PathBuf, estimated_duration: f64 },
}

impl TimelineClip {
    pub fn duration(&self) -> f64 {
        match self {
            TimelineClip::Silence { duration } => *duration,
            TimelineClip::Speech {
                estimated_duration, ..
            } => *estimated_duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub start: f64,
    pub clip: TimelineClip,
}

/// Concatenation plan for the narration track, in narration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    /// Estimated end of the last spoken segment
    pub spoken_end: f64,
}

impl Timeline {
    /// Sum of every clip's (estimated) length.
    pub fn estimated_duration(&self) -> f64 {
        self.entries.iter().map(|e| e.clip.duration()).sum()
    }

    pub fn speech_starts(&self) -> Vec<f64> {
        self.entries
            .iter()
            .filter(|e| matches!(e.clip, TimelineClip::Speech { .. }))
            .map(|e| e.start)
            .collect()
    }

    fn push_silence(&mut self, start: f64, duration: f64) {
        if duration >= MIN_SILENCE_SECS {
            self.entries.push(TimelineEntry {
                start,
                clip: TimelineClip::Silence { duration },
            });
        }
    }
}

/// Places narration clips on a timeline padded to the video length.
pub struct AudioSegmentAssembler {
    ffmpeg: Ffmpeg,
    config: NarrationConfig,
}

impl AudioSegmentAssembler {
    pub fn new(ffmpeg: Ffmpeg, config: NarrationConfig) -> Self {
        Self { ffmpeg, config }
    }

    /// Lay out clips without touching the filesystem.
    ///
    /// Each clip starts at its sync timestamp, moved onto the closest scene
    /// cut within the snap tolerance. Silence fills any gap after the
    /// previous clip's estimated end and pads the track up to `target`.
    /// Clips stay in narration order even when snapping makes start times
    /// run backwards. Speech is never cut.
    pub fn plan(
        &self,
        clips: &[AudioSegmentFile],
        scenes: &SceneAnalysis,
        target: f64,
    ) -> Timeline {
        let mut timeline = Timeline::default();
        let mut last_end = 0.0_f64;

        for (i, clip) in clips.iter().enumerate() {
            let nominal = clip.timestamp as f64;
            let start = match scenes.snap(nominal, self.config.snap_tolerance_secs) {
                Some(cut) => {
                    debug!("Segment {} snapped from {}s to scene cut {:.2}s", i, nominal, cut);
                    cut
                }
                None => nominal,
            };

            if start > last_end {
                timeline.push_silence(last_end, start - last_end);
            }

            let estimated_duration = self.estimate_speaking_time(i, &clip.source_text);
            timeline.entries.push(TimelineEntry {
                start,
                clip: TimelineClip::Speech {
                    path: clip.file_path.clone(),
                    estimated_duration,
                },
            });
            last_end = start + estimated_duration;
        }

        timeline.spoken_end = last_end;
        if target > last_end {
            timeline.push_silence(last_end, target - last_end);
        }

        timeline
    }

    fn estimate_speaking_time(&self, index: usize, text: &str) -> f64 {
        let (_, truncated_from) = truncate_words(text, self.config.assembler_max_words);
        let word_count = match truncated_from {
            Some(original) => {
                info!(
                    "Segment {} has {} words, budgeting {} for timing",
                    index, original, self.config.assembler_max_words
                );
                self.config.assembler_max_words
            }
            None => text.split_whitespace().count(),
        };
        (word_count as f64 / self.config.words_per_second).max(self.config.min_segment_secs)
    }

    /// Plan the timeline, render its silences and concatenate everything
    /// into `output_path`. Intermediate files go into `work_dir`.
    pub async fn assemble(
        &self,
        clips: &[AudioSegmentFile],
        scenes: &SceneAnalysis,
        target: f64,
        work_dir: &Path,
        output_path: &Path,
    ) -> Result<Timeline> {
        let timeline = self.plan(clips, scenes, target);
        info!(
            "Assembling {} timeline entries ({:.1}s spoken, {:.1}s estimated, {:.1}s target)",
            timeline.entries.len(),
            timeline.spoken_end,
            timeline.estimated_duration(),
            target
        );
        debug!("Speech starts: {:?}", timeline.speech_starts());

        let mut manifest = String::new();
        for (i, entry) in timeline.entries.iter().enumerate() {
            let path = match &entry.clip {
                TimelineClip::Silence { duration } => {
                    let silence = work_dir.join(format!("silence_{:03}.mp3", i));
                    self.ffmpeg.create_silence(*duration, &silence).await?;
                    silence
                }
                TimelineClip::Speech { path, .. } => path.clone(),
            };
            let absolute = tokio::fs::canonicalize(&path).await?;
            manifest.push_str(&concat_list_line(&absolute));
        }

        let list_file = work_dir.join("concat_list.txt");
        tokio::fs::write(&list_file, manifest).await?;
        self.ffmpeg.concat_audio(&list_file, output_path).await?;

        Ok(timeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> AudioSegmentAssembler {
        AudioSegmentAssembler::new(Ffmpeg::new("ffmpeg"), NarrationConfig::default())
    }

    fn clip(timestamp: u32, words: usize) -> AudioSegmentFile {
        AudioSegmentFile {
            timestamp,
            file_path: PathBuf::from(format!("segment_{}.mp3", timestamp)),
            source_text: vec!["word"; words].join(" "),
        }
    }

    fn no_scenes() -> SceneAnalysis {
        SceneAnalysis::empty(3.0)
    }

    #[test]
    fn test_three_segment_script_fills_thirty_seconds() {
        // 3 words -> 1.5s floor; 2 words -> 1.5s; 1 word -> 1.5s
        let clips = vec![clip(0, 3), clip(10, 2), clip(25, 1)];
        let timeline = assembler().plan(&clips, &no_scenes(), 30.0);

        let kinds: Vec<&str> = timeline
            .entries
            .iter()
            .map(|e| match e.clip {
                TimelineClip::Silence { .. } => "silence",
                TimelineClip::Speech { .. } => "speech",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["speech", "silence", "speech", "silence", "speech", "silence"]
        );
        assert_eq!(timeline.speech_starts(), vec![0.0, 10.0, 25.0]);
        assert!((timeline.entries[1].clip.duration() - 8.5).abs() < 1e-9);
        assert!((timeline.entries[3].clip.duration() - 13.5).abs() < 1e-9);
        assert!((timeline.spoken_end - 26.5).abs() < 1e-9);
        assert!((timeline.estimated_duration() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_scene_cuts_keep_nominal_timestamps() {
        let clips = vec![clip(3, 10), clip(7, 10), clip(19, 10)];
        let timeline = assembler().plan(&clips, &no_scenes(), 10.0);
        assert_eq!(timeline.speech_starts(), vec![3.0, 7.0, 19.0]);
    }

    #[test]
    fn test_snaps_to_close_scene_cut_only() {
        let clips = vec![clip(10, 5)];

        let near = SceneAnalysis::from_cuts(vec![0.0, 11.2], 3.0);
        assert_eq!(assembler().plan(&clips, &near, 0.0).speech_starts(), vec![11.2]);

        let edge = SceneAnalysis::from_cuts(vec![0.0, 11.5], 3.0);
        assert_eq!(assembler().plan(&clips, &edge, 0.0).speech_starts(), vec![10.0]);

        let far = SceneAnalysis::from_cuts(vec![0.0, 11.6], 3.0);
        assert_eq!(assembler().plan(&clips, &far, 0.0).speech_starts(), vec![10.0]);
    }

    #[test]
    fn test_snapping_does_not_reorder_segments() {
        // Both snap to 8.6s; the second starts before the first has ended.
        let clips = vec![clip(9, 5), clip(10, 5)];
        let scenes = SceneAnalysis::from_cuts(vec![8.6, 30.0], 3.0);
        let timeline = assembler().plan(&clips, &scenes, 0.0);

        assert_eq!(timeline.speech_starts(), vec![8.6, 8.6]);
        let paths: Vec<_> = timeline
            .entries
            .iter()
            .filter_map(|e| match &e.clip {
                TimelineClip::Speech { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("segment_9.mp3"), PathBuf::from("segment_10.mp3")]
        );
    }

    #[test]
    fn test_speaking_rate_and_assembler_word_cap() {
        let a = assembler();
        assert!((a.estimate_speaking_time(0, "one two") - 1.5).abs() < 1e-9);
        assert!((a.estimate_speaking_time(0, &vec!["w"; 10].join(" ")) - 4.0).abs() < 1e-9);
        // 25 words are budgeted as 20
        assert!((a.estimate_speaking_time(0, &vec!["w"; 25].join(" ")) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_track_reaches_target_with_trailing_silence() {
        let clips = vec![clip(0, 20), clip(2, 20)];
        for target in [0.0, 5.0, 16.0, 45.0] {
            let timeline = assembler().plan(&clips, &no_scenes(), target);
            assert!(timeline.estimated_duration() + 1e-9 >= target);

            if target > timeline.spoken_end {
                let last = timeline.entries.last().unwrap();
                assert!(matches!(last.clip, TimelineClip::Silence { .. }));
                assert!((last.start - timeline.spoken_end).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_empty_clip_list_is_all_silence() {
        let timeline = assembler().plan(&[], &no_scenes(), 12.0);
        assert_eq!(timeline.entries.len(), 1);
        assert_eq!(timeline.entries[0].clip, TimelineClip::Silence { duration: 12.0 });
    }
}
