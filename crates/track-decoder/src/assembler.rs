//! Fragment assembly: raw byte accumulation and record resolution.
//!
//! Fragments arrive with no alignment to record boundaries. They append at
//! the back of a deque-backed accumulator; resolved records and decoded
//! payload drain from the front, so memory stays bounded by the largest
//! unresolved record plus whatever payload has not decoded yet.

use std::collections::VecDeque;

use track_proto::{self as proto, Tag};

use crate::directory::{self, DirectoryTable, TrackFormat};
use crate::error::FormatError;
use crate::expander::SampleExpander;

/// Accumulates inbound fragments for one track and resolves records as they
/// complete.
pub(crate) struct FragmentAssembler {
    buf: VecDeque<u8>,
    table: DirectoryTable,
    format: Option<TrackFormat>,
    expander: Option<SampleExpander>,
    /// Raw payload bytes still expected, per the corrected data record length.
    pending: u64,
    saw_container: bool,
    in_payload: bool,
}

impl FragmentAssembler {
    pub(crate) fn new(table: DirectoryTable) -> Self {
        Self {
            buf: VecDeque::new(),
            table,
            format: None,
            expander: None,
            pending: 0,
            saw_container: false,
            in_payload: false,
        }
    }

    pub(crate) fn format(&self) -> Option<&TrackFormat> {
        self.format.as_ref()
    }

    /// Raw payload bytes not yet decoded into PCM. Non-increasing once the
    /// payload record resolves.
    pub(crate) fn pending(&self) -> u64 {
        self.pending
    }

    /// True once the payload record has resolved and streaming began.
    pub(crate) fn streaming_started(&self) -> bool {
        self.in_payload
    }

    pub(crate) fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Append one fragment and resolve as much as possible.
    ///
    /// Decoded PCM is appended to `pcm`. Unresolved trailing bytes stay
    /// buffered for the next call; fatal errors leave the offending record
    /// unconsumed, so a later call cannot resolve past it.
    pub(crate) fn append(&mut self, fragment: &[u8], pcm: &mut Vec<u8>) -> Result<(), FormatError> {
        self.buf.extend(fragment.iter().copied());
        self.resolve(pcm)
    }

    fn resolve(&mut self, pcm: &mut Vec<u8>) -> Result<(), FormatError> {
        loop {
            if self.in_payload {
                self.drain_payload(pcm);
                return Ok(());
            }

            let Some((tag, len)) = self.peek_header() else {
                return Ok(());
            };

            if !self.saw_container {
                if tag != proto::CONTAINER {
                    return Err(FormatError::BadContainer {
                        expected: proto::CONTAINER,
                        got: tag,
                    });
                }
                // The container's declared length spans the rest of the
                // stream; only its header is consumed.
                self.consume(proto::HEADER_LEN);
                self.saw_container = true;
                continue;
            }

            if tag == proto::DIRECTORY {
                if self.format.is_some() {
                    return Err(FormatError::DuplicateFormat);
                }
                let total = proto::HEADER_LEN + len as usize;
                if self.buf.len() < total {
                    // Wait for the rest of the directory.
                    return Ok(());
                }
                let payload = self.copy_range(proto::HEADER_LEN, total);
                self.format = Some(directory::parse_directory(&payload, &self.table)?);
                self.consume(total);
                continue;
            }

            if tag == proto::DATA {
                let format = *self.format.as_ref().ok_or(FormatError::MissingFormat)?;
                self.pending = corrected_payload_len(len, &format);
                self.expander = Some(SampleExpander::new(&format));
                self.in_payload = true;
                self.consume(proto::HEADER_LEN);
                continue;
            }

            return Err(FormatError::UnknownRecord { tag, len });
        }
    }

    /// Feed buffered payload bytes into the expander, up to the declared
    /// remainder. Bytes beyond the declared payload stay buffered and never
    /// decode, which keeps `pending` non-negative and termination monotone.
    fn drain_payload(&mut self, pcm: &mut Vec<u8>) {
        let Some(expander) = self.expander.as_mut() else {
            return;
        };

        let remaining = self.pending - expander.carry_len() as u64;
        let take = self.buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if take == 0 {
            return;
        }

        let chunk: Vec<u8> = self.buf.drain(..take).collect();
        let decoded = expander.expand(&chunk, pcm);
        self.pending -= decoded as u64;
    }

    fn peek_header(&self) -> Option<(Tag, u32)> {
        if self.buf.len() < proto::HEADER_LEN {
            return None;
        }
        let mut head = [0u8; proto::HEADER_LEN];
        for (slot, byte) in head.iter_mut().zip(self.buf.iter()) {
            *slot = *byte;
        }
        proto::read_chunk_header(&head)
    }

    fn copy_range(&self, start: usize, end: usize) -> Vec<u8> {
        self.buf.iter().skip(start).take(end - start).copied().collect()
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
    }
}

/// Round a declared payload length up to a whole number of frame units.
///
/// The upstream encoder occasionally emits slightly misaligned sizes; the
/// mismatch is corrected here and never reported as an error.
fn corrected_payload_len(declared: u32, format: &TrackFormat) -> u64 {
    let unit = format.frame_unit();
    let rem = declared % unit;
    if rem == 0 {
        return u64::from(declared);
    }
    let corrected = u64::from(declared) + u64::from(unit - rem);
    tracing::debug!(declared, corrected, unit, "payload length not frame-aligned, correcting");
    corrected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(bit_depth: u32, channels: u32) -> TrackFormat {
        TrackFormat {
            bit_depth,
            sample_rate: 11_025,
            channels,
        }
    }

    #[test]
    fn corrects_misaligned_payload_length() {
        assert_eq!(corrected_payload_len(10, &format(12, 1)), 12);
        assert_eq!(corrected_payload_len(12, &format(12, 1)), 12);
        assert_eq!(corrected_payload_len(10, &format(16, 2)), 12);
        assert_eq!(corrected_payload_len(7, &format(8, 2)), 8);
        assert_eq!(corrected_payload_len(0, &format(12, 1)), 0);
    }

    #[test]
    fn rejects_stream_without_container_header() {
        let mut asm = FragmentAssembler::new(DirectoryTable::new());
        let mut pcm = Vec::new();
        let err = asm.append(b"RIFF\x00\x00\x00\x04", &mut pcm).unwrap_err();
        assert!(matches!(err, FormatError::BadContainer { .. }));
    }

    #[test]
    fn short_header_is_retained_not_rejected() {
        let mut asm = FragmentAssembler::new(DirectoryTable::new());
        let mut pcm = Vec::new();
        asm.append(b"iMU", &mut pcm).unwrap();
        assert_eq!(asm.buffered_len(), 3);
        // Completing the header resolves the container.
        asm.append(b"S\x00\x00\x00\x00", &mut pcm).unwrap();
        assert_eq!(asm.buffered_len(), 0);
    }

    #[test]
    fn bytes_beyond_declared_payload_never_decode() {
        let mut asm = FragmentAssembler::new(DirectoryTable::new());
        asm.saw_container = true;
        asm.format = Some(format(12, 1));
        let mut pcm = Vec::new();

        let mut stream = Vec::new();
        proto::write_chunk_header(&mut stream, proto::DATA, 3);
        stream.extend_from_slice(&[0x12, 0x34, 0x56, 0xde, 0xad]);
        asm.append(&stream, &mut pcm).unwrap();

        assert_eq!(pcm.len(), 4);
        assert_eq!(asm.pending(), 0);
        assert_eq!(asm.buffered_len(), 2);
    }
}
