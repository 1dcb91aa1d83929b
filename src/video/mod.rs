pub mod assembler;
pub mod ffmpeg;
pub mod muxer;

pub use assembler::{AudioSegmentAssembler, Timeline, TimelineClip, TimelineEntry};
pub use ffmpeg::Ffmpeg;
pub use muxer::AudioVideoMuxer;
