use crate::registry::DatasetCode;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A read of `width` bytes at `offset` would run past the end of a buffer of `len` bytes.
    #[error("read of {width} bytes at offset {offset} exceeds buffer of {len} bytes")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// No frame marker within the search window. Fatal for the stream.
    #[error("frame marker not found within {searched} bytes")]
    MarkerNotFound { searched: usize },

    #[error("checksum mismatch: frame declares {expected:#06x}, computed {actual:#06x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Stream ended part way through a frame.
    #[error("incomplete frame: needed {needed} bytes, {available} available")]
    IncompleteFrame { needed: usize, available: usize },

    #[error("invalid frame header: {0}")]
    InvalidHeader(String),

    #[error("unknown dataset code {code} at offset {offset}")]
    UnknownDatasetCode { code: DatasetCode, offset: usize },

    /// A dataset needs a value from a leader dataset that is not in the frame.
    #[error("dataset {code} requires {needs}")]
    MissingCrossDependency {
        code: DatasetCode,
        needs: &'static str,
    },

    #[error("invalid dataset {code}: {reason}")]
    InvalidDataset { code: DatasetCode, reason: String },

    #[error("malformed NMEA sentence: {0}")]
    MalformedNmeaSentence(String),

    #[error("invalid beam count {0}; expected 1 to 4")]
    InvalidBeamCount(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fatal errors mean no further frames from the stream can be trusted without
    /// re-synchronizing. Everything else only affects a single frame or dataset.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MarkerNotFound { .. } | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
