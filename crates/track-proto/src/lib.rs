//! Shared chunk framing primitives for the streaming track decoder.
//!
//! Every record in the container is framed the same way:
//! - tag: 4 ASCII bytes
//! - len: u32 BE, payload length in bytes, excluding this header
//! - payload: [u8; len]
//!
//! The outer container wraps a whole track in a single chunk whose length
//! spans the rest of the stream; the directory and payload records are nested
//! behind it with the same framing.

use std::fmt;
use std::io;

/// Chunk header size: 4-byte tag + 4-byte big-endian length.
///
/// A resolved header places the payload at exactly this offset.
pub const HEADER_LEN: usize = 8;

/// Outer container chunk wrapping one audio track.
pub const CONTAINER: Tag = Tag(*b"iMUS");
/// Directory chunk enumerating a track's format/lifetime records.
pub const DIRECTORY: Tag = Tag(*b"MAP ");
/// Format record inside the directory.
pub const FORMAT: Tag = Tag(*b"FRMT");
/// Free-form text record inside the directory; ignored by the decoder.
pub const TEXT: Tag = Tag(*b"TEXT");
/// Region record inside the directory; contents are opaque to the decoder.
pub const REGION: Tag = Tag(*b"REGN");
/// Advisory end-of-life record inside the directory.
pub const STOP: Tag = Tag(*b"STOP");
/// Raw audio payload chunk.
pub const DATA: Tag = Tag(*b"DATA");

/// A 4-byte ASCII chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

/// Read a chunk header from the front of `window`.
///
/// Returns `None` when fewer than [`HEADER_LEN`] bytes are available. Partial
/// input is expected while fragments are still arriving, so the caller retains
/// the bytes and waits for more. Never allocates, never mutates the input.
pub fn read_chunk_header(window: &[u8]) -> Option<(Tag, u32)> {
    if window.len() < HEADER_LEN {
        return None;
    }
    let tag = Tag([window[0], window[1], window[2], window[3]]);
    let len = u32::from_be_bytes([window[4], window[5], window[6], window[7]]);
    Some((tag, len))
}

/// Append a chunk header for a payload of `len` bytes.
pub fn write_chunk_header(out: &mut Vec<u8>, tag: Tag, len: u32) {
    out.extend_from_slice(&tag.0);
    out.extend_from_slice(&len.to_be_bytes());
}

/// Encode a chunk into a single buffer (header + payload).
pub fn encode_chunk(tag: Tag, payload: &[u8]) -> io::Result<Vec<u8>> {
    let len: u32 = payload
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "chunk payload too large"))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    write_chunk_header(&mut out, tag, len);
    out.extend_from_slice(payload);
    Ok(out)
}
