use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback speed must be a positive finite number, got {0}")]
    InvalidSpeed(f64),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
