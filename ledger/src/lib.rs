mod archive_reader;
mod archive_writer;
pub mod canvas;
pub mod chunking;
pub mod codec;
mod config;
pub mod constants;
mod errors;
pub mod offsets;
pub mod session;
pub mod socials;
pub mod source;
pub mod structures;
pub mod submit;

pub use crate::archive_reader::LedgerArchiveReader;
pub use crate::archive_writer::LedgerArchiveWriter;
pub use crate::canvas::{ApplyReport, Canvas, Pixel, Rebuild};
pub use crate::config::WallConfig;
pub use crate::errors::{
    ArchiveError, DecodeError, EncodeError, FailureReason, OutOfBounds, SourceError,
    SubmissionFailure, SubmitError,
};
pub use crate::offsets::{ByteRange, Layout, RecordFilter};
pub use crate::session::{rebuild, RebuildSummary, WallSession};
pub use crate::socials::SocialLinks;
pub use crate::source::{MemorySource, RecordSource, ScriptedOutcome, SubmitOutcome, Subscription};
pub use crate::structures::{
    ArchiveMeta, Attribution, Color, DecodedRecord, EditSet, FieldValue, PixelEdit, Pubkey,
    Record, SocialBundle,
};
pub use crate::submit::{ChunkProgress, PreparedChunk, SubmissionReport, SubmitRequest, Submitter};
