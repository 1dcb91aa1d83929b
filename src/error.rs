use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("No sync markers found in narration script")]
    NoSyncMarkers,

    #[error("Invalid sync marker: {0}")]
    InvalidSyncMarker(String),

    #[error("Speech synthesis error: {0}")]
    SynthesisError(String),

    #[error("Scene analysis error: {0}")]
    AnalysisError(String),

    #[error("FFmpeg error: {message}")]
    FfmpegError { message: String, stderr: String },

    #[error("Could not determine duration of {0}")]
    DurationUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl VideoError {
    pub fn ffmpeg(message: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::FfmpegError {
            message: message.into(),
            stderr: stderr.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VideoError>;
