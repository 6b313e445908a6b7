//! The public track object: fragments in, 16-bit big-endian PCM out.

use crate::assembler::FragmentAssembler;
use crate::directory::{DirectoryTable, TrackFormat};
use crate::error::FormatError;

/// Lifecycle of a track, derived from decoder state rather than stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackState {
    /// No directory parsed yet.
    Empty,
    /// Format known, no payload record seen.
    FormatKnown,
    /// Payload bytes are being consumed.
    Streaming,
    /// Every declared payload byte decoded and the PCM buffer drained.
    Terminated,
}

/// One decodable audio channel within the container stream.
///
/// All operations run to completion on the calling thread with no internal
/// suspension point; a producer and a consumer on different threads must
/// serialize calls externally. Fragments are borrowed only for the duration
/// of [`Track::append_fragment`]; decoded PCM is owned by the track until
/// [`Track::extract_pcm`] moves it out.
pub struct Track {
    id: i32,
    assembler: FragmentAssembler,
    decoded: Vec<u8>,
    volume: i32,
    pan: i32,
}

impl Track {
    /// Create an empty track. The directory dispatch table is built once
    /// here and reused for the track's lifetime.
    pub fn new() -> Self {
        Self::with_id(0)
    }

    /// Create an empty track carrying the demultiplexer's track number.
    pub fn with_id(id: i32) -> Self {
        Self {
            id,
            assembler: FragmentAssembler::new(DirectoryTable::new()),
            decoded: Vec::new(),
            volume: 127,
            pan: 0,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Append one inbound fragment, resolving records and decoding payload.
    ///
    /// A fatal error leaves the offending record unconsumed: the track
    /// produces no further output and the owner should discard it. Other
    /// tracks are unaffected.
    pub fn append_fragment(&mut self, fragment: &[u8]) -> Result<(), FormatError> {
        self.assembler.append(fragment, &mut self.decoded)
    }

    /// Take ownership of all PCM decoded so far: interleaved 16-bit
    /// big-endian samples.
    ///
    /// Returns an empty buffer when nothing new has decoded since the last
    /// call; that is routine, not an error.
    pub fn extract_pcm(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.decoded)
    }

    /// True once every declared payload byte has decoded and the PCM buffer
    /// has been drained. A track never reverts to un-terminated.
    pub fn is_terminated(&self) -> bool {
        self.assembler.streaming_started()
            && self.assembler.pending() == 0
            && self.decoded.is_empty()
    }

    pub fn format(&self) -> Option<&TrackFormat> {
        self.assembler.format()
    }

    pub fn state(&self) -> TrackState {
        if self.is_terminated() {
            TrackState::Terminated
        } else if self.assembler.streaming_started() {
            TrackState::Streaming
        } else if self.assembler.format().is_some() {
            TrackState::FormatKnown
        } else {
            TrackState::Empty
        }
    }

    /// Map the demultiplexer's volume flags onto mixer volume and pan.
    pub fn set_parameters(&mut self, flags: i32) -> Result<(), FormatError> {
        self.volume = match flags {
            1..=3 => 127,
            100..=163 => flags * 2 - 200,
            200..=263 => flags * 2 - 400,
            300..=363 => flags * 2 - 600,
            _ => return Err(FormatError::InvalidFlags(flags)),
        };
        self.pan = 0;
        Ok(())
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    pub fn pan(&self) -> i32 {
        self.pan
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}
