//! Typed failure taxonomy for track decoding.

use thiserror::Error;
use track_proto::Tag;

/// Fatal format violations.
///
/// The directory is not self-healing: none of these are recoverable for the
/// affected track, and retrying the same bytes yields the same error. The
/// owner abandons the track and keeps other tracks playing. Tolerated
/// anomalies (a misaligned payload length) are corrected locally and never
/// surface here; insufficient buffered bytes are flow control, not errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The stream did not open with the outer container header.
    #[error("stream does not start with a {expected} container (got {got})")]
    BadContainer { expected: Tag, got: Tag },

    /// A record tag with no dispatch entry, inside or outside the directory.
    #[error("unknown record {tag} ({len} bytes)")]
    UnknownRecord { tag: Tag, len: u32 },

    /// A fixed-size record with the wrong declared length.
    #[error("invalid size for {tag} record: expected {expected} bytes, got {got}")]
    RecordSize { tag: Tag, expected: u32, got: u32 },

    /// A nested record overruns its enclosing directory payload.
    #[error("directory record overruns the directory payload")]
    TruncatedDirectory,

    #[error("invalid channel count {0} (must be 1 or 2)")]
    InvalidChannelCount(u32),

    #[error("invalid bit depth {0} (must be 8, 12 or 16)")]
    InvalidBitDepth(u32),

    #[error("invalid sample rate 0")]
    InvalidSampleRate,

    /// A second format declaration for a track that already has one.
    #[error("track format declared twice")]
    DuplicateFormat,

    /// Audio payload arrived before any format record.
    #[error("no format record before audio payload")]
    MissingFormat,

    /// Volume flags outside the ranges the mixer understands.
    #[error("bad volume flags: {0}")]
    InvalidFlags(i32),
}
