use structures::SchemaError;

/// A record (or a slice of one) that could not be decoded. During a rebuild the
/// faulting record is skipped and logged.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed record at field `{field}`: {reason}")]
    MalformedRecord { field: String, reason: String },

    #[error("invalid value in `{field}` at byte {offset}: {reason}")]
    InvalidFieldValue {
        field: String,
        offset: usize,
        reason: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl DecodeError {
    pub(crate) fn malformed(field: &str, reason: impl Into<String>) -> Self {
        DecodeError::MalformedRecord {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// An edit set or socials bundle that cannot be packed into a record.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("nothing to submit: the edit set is empty")]
    EmptyEditSet,

    #[error("{count} pixels do not fit in one record (capacity {capacity})")]
    TooManyPixels { count: usize, capacity: usize },

    #[error("pixel index {index} is outside the canvas ({size} pixels)")]
    IndexOutOfBounds { index: u32, size: usize },

    #[error("invalid color `{0}`")]
    InvalidColor(String),

    #[error("invalid public key `{0}`")]
    InvalidPubkey(String),

    #[error("`{field}` is {len} bytes, the limit is {max}")]
    FieldTooLong {
        field: String,
        len: usize,
        max: usize,
    },

    #[error("`{0}` must not contain the string delimiter")]
    DelimiterInField(&'static str),

    #[error("record has no value for field `{0}`")]
    MissingValue(String),

    #[error("value for field `{0}` does not match its declared type")]
    TypeMismatch(String),

    #[error("could not encode field: {0}")]
    Bincode(#[from] bincode::error::EncodeError),
}

/// A decoded pixel that falls outside the canvas. Reported per pixel; the rest
/// of the record still applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pixel ({x}, {y}) is outside the {width}x{height} canvas")]
pub struct OutOfBounds {
    pub x: u8,
    pub y: u8,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("record source is unavailable: {0}")]
    EndpointUnavailable(String),

    #[error("transient record source failure: {0}")]
    Transient(String),

    #[error("record source closed")]
    Closed,
}

/// Why the last attempt at a chunk failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Rejected(String),
    Timeout,
    Source(SourceError),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Rejected(reason) => write!(f, "rejected: {}", reason),
            FailureReason::Timeout => write!(f, "timed out"),
            FailureReason::Source(err) => write!(f, "{}", err),
        }
    }
}

/// A chunk that exhausted its retries. Earlier chunks stay on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "chunk {chunk}/{total_chunks} failed after {attempts} attempts \
     ({succeeded} of {total_chunks} chunks accepted): {reason}"
)]
pub struct SubmissionFailure {
    /// One-based chunk number, as shown to the user.
    pub chunk: usize,
    pub total_chunks: usize,
    pub succeeded: usize,
    pub attempts: u32,
    pub reason: FailureReason,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Failed(#[from] SubmissionFailure),
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("could not access archive: {0}")]
    Mla(#[from] mla::errors::Error),

    #[error("archive is missing its meta file")]
    MissingMetaFile,

    #[error("archive has no canvas snapshot")]
    MissingSnapshot,

    #[error("archive is missing record {0}")]
    MissingRecord(u32),

    #[error("could not decode archive meta: {0}")]
    CouldNotDecodeMeta(#[from] bincode::error::DecodeError),

    #[error("could not encode archive meta: {0}")]
    CouldNotEncodeMeta(#[from] bincode::error::EncodeError),

    #[error("archive was written for a different record layout: {0}")]
    LayoutMismatch(String),

    #[error("could not encode canvas snapshot: {0}")]
    Image(#[from] image::ImageError),

    #[error("record is {len} bytes, archive holds {expected}-byte records")]
    RecordSize { len: usize, expected: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
