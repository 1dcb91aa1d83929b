pub mod api;
pub mod config;
pub mod error;
pub mod narration;
pub mod pipeline;
pub mod scene;
pub mod speech;
pub mod video;

pub use error::{Result, VideoError};
pub use pipeline::{NarrationPipeline, NarrationRequest};
