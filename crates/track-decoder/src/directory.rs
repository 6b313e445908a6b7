//! Directory parsing: the self-describing header block of one track.
//!
//! A directory payload is a run of nested records, each framed like every
//! other chunk. The format record pins the track's sample layout; region and
//! stop records are validated for size only, since their contents belong to
//! collaborators (layout consumers, the mixer) rather than the decoder.

use serde::{Deserialize, Serialize};
use track_proto::{self as proto, Tag};

use crate::error::FormatError;

/// Audio format declared by the directory's format record.
///
/// Set exactly once per track and immutable afterwards.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackFormat {
    /// Bits per sample in the raw payload: 8, 12 or 16.
    pub bit_depth: u32,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Interleaved channel count: 1 or 2.
    pub channels: u32,
}

impl TrackFormat {
    /// Byte size of the smallest indivisible unit of raw payload.
    ///
    /// For 12-bit audio the packed pair cannot be split, so the unit is 3
    /// bytes for mono (two frames) and stereo (one frame) alike.
    pub fn frame_unit(&self) -> u32 {
        match self.bit_depth {
            16 => 2 * self.channels,
            12 => 3,
            _ => self.channels,
        }
    }
}

/// What the decoder does with a directory record once its tag resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RecordKind {
    Format,
    Text,
    Region,
    Stop,
}

/// Tag → record-kind dispatch for directory records.
///
/// Constructed once per track and passed into the parser, rather than living
/// in a process-wide static table.
#[derive(Clone, Debug)]
pub struct DirectoryTable {
    entries: [(Tag, RecordKind); 4],
}

impl DirectoryTable {
    pub fn new() -> Self {
        Self {
            entries: [
                (proto::FORMAT, RecordKind::Format),
                (proto::TEXT, RecordKind::Text),
                (proto::REGION, RecordKind::Region),
                (proto::STOP, RecordKind::Stop),
            ],
        }
    }

    fn lookup(&self, tag: Tag) -> Option<RecordKind> {
        self.entries
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|&(_, kind)| kind)
    }
}

impl Default for DirectoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one complete directory payload into the track's format.
///
/// Unknown tags, fixed-size mismatches, and records overrunning the payload
/// are fatal: the directory has no resynchronization point.
pub(crate) fn parse_directory(
    payload: &[u8],
    table: &DirectoryTable,
) -> Result<TrackFormat, FormatError> {
    let mut offset = 0usize;
    let mut format = None;

    while offset < payload.len() {
        let Some((tag, len)) = proto::read_chunk_header(&payload[offset..]) else {
            return Err(FormatError::TruncatedDirectory);
        };
        let body_start = offset + proto::HEADER_LEN;
        let body_end = body_start + len as usize;
        if body_end > payload.len() {
            return Err(FormatError::TruncatedDirectory);
        }
        let body = &payload[body_start..body_end];

        match table.lookup(tag) {
            Some(RecordKind::Format) => {
                if format.is_some() {
                    return Err(FormatError::DuplicateFormat);
                }
                format = Some(parse_format_record(body)?);
            }
            Some(RecordKind::Text) => {}
            Some(RecordKind::Region) => expect_record_len(tag, 8, len)?,
            Some(RecordKind::Stop) => expect_record_len(tag, 4, len)?,
            None => return Err(FormatError::UnknownRecord { tag, len }),
        }

        offset = body_end;
    }

    format.ok_or(FormatError::MissingFormat)
}

fn expect_record_len(tag: Tag, expected: u32, got: u32) -> Result<(), FormatError> {
    if got != expected {
        return Err(FormatError::RecordSize { tag, expected, got });
    }
    Ok(())
}

/// Fixed 20-byte format record: a start offset and a reserved word the
/// decoder skips, then bit depth, sample rate and channel count, big-endian.
fn parse_format_record(body: &[u8]) -> Result<TrackFormat, FormatError> {
    if body.len() != 20 {
        return Err(FormatError::RecordSize {
            tag: proto::FORMAT,
            expected: 20,
            got: body.len() as u32,
        });
    }

    let be32 = |i: usize| u32::from_be_bytes([body[i], body[i + 1], body[i + 2], body[i + 3]]);
    let bit_depth = be32(8);
    let sample_rate = be32(12);
    let channels = be32(16);

    if !matches!(channels, 1 | 2) {
        return Err(FormatError::InvalidChannelCount(channels));
    }
    if !matches!(bit_depth, 8 | 12 | 16) {
        return Err(FormatError::InvalidBitDepth(bit_depth));
    }
    if sample_rate == 0 {
        return Err(FormatError::InvalidSampleRate);
    }

    Ok(TrackFormat {
        bit_depth,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_record(bit_depth: u32, sample_rate: u32, channels: u32) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_be_bytes()); // start offset, unused
        body.extend_from_slice(&0u32.to_be_bytes()); // reserved
        body.extend_from_slice(&bit_depth.to_be_bytes());
        body.extend_from_slice(&sample_rate.to_be_bytes());
        body.extend_from_slice(&channels.to_be_bytes());
        proto::encode_chunk(proto::FORMAT, &body).unwrap()
    }

    #[test]
    fn parses_format_region_and_stop() {
        let mut payload = format_record(12, 11_025, 1);
        payload.extend(proto::encode_chunk(proto::REGION, &[0u8; 8]).unwrap());
        payload.extend(proto::encode_chunk(proto::STOP, &[0u8; 4]).unwrap());

        let format = parse_directory(&payload, &DirectoryTable::new()).unwrap();
        assert_eq!(
            format,
            TrackFormat {
                bit_depth: 12,
                sample_rate: 11_025,
                channels: 1
            }
        );
    }

    #[test]
    fn text_records_are_ignored() {
        let mut payload = proto::encode_chunk(proto::TEXT, b"subtitle cue").unwrap();
        payload.extend(format_record(16, 22_050, 2));

        let format = parse_directory(&payload, &DirectoryTable::new()).unwrap();
        assert_eq!(format.channels, 2);
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let mut payload = format_record(8, 11_025, 1);
        payload.extend(proto::encode_chunk(Tag(*b"WHAT"), &[1, 2, 3]).unwrap());

        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownRecord {
                tag: Tag(*b"WHAT"),
                len: 3
            }
        );
    }

    #[test]
    fn wrong_region_size_is_fatal() {
        let mut payload = format_record(8, 11_025, 1);
        payload.extend(proto::encode_chunk(proto::REGION, &[0u8; 6]).unwrap());

        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(
            err,
            FormatError::RecordSize {
                tag: proto::REGION,
                expected: 8,
                got: 6
            }
        );
    }

    #[test]
    fn wrong_format_size_is_fatal() {
        let payload = proto::encode_chunk(proto::FORMAT, &[0u8; 16]).unwrap();
        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(
            err,
            FormatError::RecordSize {
                tag: proto::FORMAT,
                expected: 20,
                got: 16
            }
        );
    }

    #[test]
    fn bad_channel_count_is_fatal() {
        let payload = format_record(12, 11_025, 3);
        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(err, FormatError::InvalidChannelCount(3));
    }

    #[test]
    fn bad_bit_depth_is_fatal() {
        let payload = format_record(24, 11_025, 1);
        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(err, FormatError::InvalidBitDepth(24));
    }

    #[test]
    fn zero_sample_rate_is_fatal() {
        let payload = format_record(12, 0, 1);
        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(err, FormatError::InvalidSampleRate);
    }

    #[test]
    fn duplicate_format_is_fatal() {
        let mut payload = format_record(12, 11_025, 1);
        payload.extend(format_record(12, 11_025, 1));

        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(err, FormatError::DuplicateFormat);
    }

    #[test]
    fn directory_without_format_is_fatal() {
        let payload = proto::encode_chunk(proto::STOP, &[0u8; 4]).unwrap();
        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(err, FormatError::MissingFormat);
    }

    #[test]
    fn overrunning_record_is_fatal() {
        let mut payload = format_record(12, 11_025, 1);
        // Declares 8 payload bytes but the directory ends after 2.
        payload.extend(&proto::encode_chunk(proto::REGION, &[0u8; 8]).unwrap()[..proto::HEADER_LEN + 2]);

        let err = parse_directory(&payload, &DirectoryTable::new()).unwrap_err();
        assert_eq!(err, FormatError::TruncatedDirectory);
    }

    #[test]
    fn frame_unit_matches_layout() {
        let fmt = |bit_depth, channels| TrackFormat {
            bit_depth,
            sample_rate: 11_025,
            channels,
        };
        assert_eq!(fmt(8, 1).frame_unit(), 1);
        assert_eq!(fmt(8, 2).frame_unit(), 2);
        assert_eq!(fmt(12, 1).frame_unit(), 3);
        assert_eq!(fmt(12, 2).frame_unit(), 3);
        assert_eq!(fmt(16, 1).frame_unit(), 2);
        assert_eq!(fmt(16, 2).frame_unit(), 4);
    }
}
