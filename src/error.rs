use thiserror::Error;

/// The three fatal error kinds from the error-handling design: configuration
/// problems caught at startup, structural problems with the input format,
/// and I/O failures encountered mid-stream. Per-record classification
/// outcomes (unmatched, ambiguous) are never represented here -- they are
/// plain `Classification` variants, not errors.
#[derive(Debug, Error)]
pub enum DemuxError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("malformed input at offset {offset}: {message}")]
    Format { message: String, offset: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemuxError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DemuxError::Configuration(msg.into())
    }

    pub fn format<S: Into<String>>(msg: S, offset: u64) -> Self {
        DemuxError::Format {
            message: msg.into(),
            offset,
        }
    }
}
