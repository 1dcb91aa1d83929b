pub mod budget;
pub mod clean;
pub mod markers;

pub use budget::SegmentBudgeter;
pub use clean::clean_text_for_speech;
pub use markers::extract_sync_points;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A timestamp-anchored narration beat, in the order it appears in the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPoint {
    pub timestamp: u32,
    pub raw_text: String,
}

/// A sync point after cleaning and word-count truncation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationSegment {
    pub timestamp: u32,
    pub cleaned_text: String,
    pub word_count: usize,
}

impl NarrationSegment {
    pub fn new(timestamp: u32, cleaned_text: String) -> Self {
        let word_count = cleaned_text.split_whitespace().count();
        Self {
            timestamp,
            cleaned_text,
            word_count,
        }
    }
}

/// One synthesized speech clip on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegmentFile {
    pub timestamp: u32,
    pub file_path: PathBuf,
    pub source_text: String,
}
