use super::{clean_text_for_speech, NarrationSegment, SyncPoint};
use crate::config::NarrationConfig;
use tracing::{info, warn};

/// Caps segment count and per-segment word count so the spoken narration
/// stays short.
#[derive(Debug, Clone)]
pub struct SegmentBudgeter {
    max_segments: usize,
    interior: usize,
    max_words: usize,
}

impl SegmentBudgeter {
    pub fn new(max_segments: usize, interior: usize, max_words: usize) -> Self {
        Self {
            max_segments,
            interior,
            max_words,
        }
    }

    /// Budgeter used when creating segments for synthesis.
    pub fn for_segments(config: &NarrationConfig) -> Self {
        Self::new(
            config.max_segments,
            config.resampled_interior,
            config.segment_max_words,
        )
    }

    /// Resample, clean and truncate sync points into narration segments.
    pub fn budget(&self, points: Vec<SyncPoint>) -> Vec<NarrationSegment> {
        self.limit_count(points)
            .into_iter()
            .enumerate()
            .map(|(i, point)| {
                let cleaned = clean_text_for_speech(&point.raw_text);
                let (text, truncated_from) = truncate_words(&cleaned, self.max_words);
                if let Some(original) = truncated_from {
                    info!(
                        "Truncating sync point {} from {} words to {} words",
                        i, original, self.max_words
                    );
                }
                NarrationSegment::new(point.timestamp, text)
            })
            .collect()
    }

    /// Keep first, last and evenly spaced interior points once the list
    /// exceeds the configured maximum. Interior content is dropped, not merged.
    pub fn limit_count<T>(&self, points: Vec<T>) -> Vec<T> {
        let total = points.len();
        if total <= self.max_segments {
            return points;
        }

        warn!(
            "Limiting narration from {} to {} sync points for brevity",
            total,
            self.interior + 2
        );

        let keep = resample_indices(total, self.interior);
        points
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep.contains(i))
            .map(|(_, point)| point)
            .collect()
    }
}

/// Indices of first, last and `interior` points spaced across `1..total-1`.
fn resample_indices(total: usize, interior: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity(interior + 2);
    indices.push(0);

    let step = (total - 2) as f64 / interior as f64;
    for i in 1..=interior {
        let idx = ((i as f64 * step) as usize).clamp(1, total - 2);
        if !indices.contains(&idx) {
            indices.push(idx);
        }
    }

    indices.push(total - 1);
    indices
}

/// Keep the first `max_words` words. Returns the original word count when
/// truncation happened.
pub fn truncate_words(text: &str, max_words: usize) -> (String, Option<usize>) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max_words {
        (words[..max_words].join(" "), Some(words.len()))
    } else {
        (words.join(" "), None)
    }
}
