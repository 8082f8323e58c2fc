//! Byte-level frame grammars
//!
//! The exact layout of the intercom bus is a pluggable unit. A grammar tells
//! the assembler where a frame begins and ends, validates the integrity tag
//! and encodes outgoing frames.

use heapless::Vec;

use crate::frame::{Frame, FramingError, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};

/// Result of scanning the assembly buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scan {
    /// The first byte cannot start a frame given what follows; drop it as
    /// line noise
    Skip,
    /// The buffer is a valid prefix, keep reading
    NeedMore,
    /// The first this many bytes form one complete frame
    Complete(usize),
    /// The candidate starting at the first byte can no longer become a frame
    Invalid(FramingError),
}

/// A frame layout on the bus
///
/// Implementations must keep two invariants the assembler relies on:
/// `scan` on a single byte returns only `Skip` or `NeedMore`, and `scan`
/// reports `Complete(n)` only with `0 < n <= buf.len()`. Bytes past the
/// candidate are ignored by `scan`; the assembler rescans them later.
pub trait FrameGrammar {
    /// Largest payload the grammar can carry
    const MAX_PAYLOAD: usize;

    /// Classify the bytes accumulated so far
    fn scan(&self, buf: &[u8]) -> Scan;

    /// Validate raw bytes and build a frame
    ///
    /// Called with a `Complete` buffer or, when the line goes quiet, with
    /// whatever has been collected. Short input is `Truncated`.
    fn parse(&self, raw: &[u8]) -> Result<Frame, FramingError>;

    /// Encode a frame into a byte buffer
    ///
    /// Returns the number of bytes written.
    fn encode(&self, frame: &Frame, buffer: &mut [u8]) -> Result<usize, FramingError>;

    /// Encode a frame into a heapless Vec
    fn encode_to_vec(&self, frame: &Frame) -> Result<Vec<u8, MAX_FRAME_SIZE>, FramingError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(frame, &mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FramingError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Preamble byte of the Golmar UNO bus, sent twice
pub const UNO_PREAMBLE: u8 = 0x00;

/// Length of every UNO frame
pub const UNO_FRAME_LEN: usize = 4;

/// Golmar UNO layout: `[0x00, 0x00, address, command]`
///
/// The double zero preamble is the only integrity check the bus offers on
/// top of UART parity. The bus carries no source address and no payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnoGrammar;

impl FrameGrammar for UnoGrammar {
    const MAX_PAYLOAD: usize = 0;

    fn scan(&self, buf: &[u8]) -> Scan {
        match buf.len() {
            0 => Scan::NeedMore,
            _ if buf[0] != UNO_PREAMBLE => Scan::Skip,
            1 => Scan::NeedMore,
            _ if buf[1] != UNO_PREAMBLE => Scan::Invalid(FramingError::BadPreamble),
            2 => Scan::NeedMore,
            // Address 0x00 is never a destination, so a third zero is
            // preamble slack and the frame starts one byte later
            _ if buf[2] == UNO_PREAMBLE => Scan::Skip,
            3 => Scan::NeedMore,
            _ => Scan::Complete(UNO_FRAME_LEN),
        }
    }

    fn parse(&self, raw: &[u8]) -> Result<Frame, FramingError> {
        if raw.len() < UNO_FRAME_LEN {
            return Err(FramingError::Truncated);
        }
        if raw.len() > UNO_FRAME_LEN {
            return Err(FramingError::Overflow);
        }
        if raw[0] != UNO_PREAMBLE || raw[1] != UNO_PREAMBLE || raw[2] == UNO_PREAMBLE {
            return Err(FramingError::BadPreamble);
        }

        Ok(Frame {
            source: 0x00,
            destination: raw[2],
            code: raw[3],
            payload: Vec::new(),
            integrity_tag: raw[1],
        })
    }

    fn encode(&self, frame: &Frame, buffer: &mut [u8]) -> Result<usize, FramingError> {
        if !frame.payload.is_empty() {
            return Err(FramingError::PayloadTooLarge);
        }
        if frame.destination == UNO_PREAMBLE {
            // would read back as preamble slack
            return Err(FramingError::BadPreamble);
        }
        if buffer.len() < UNO_FRAME_LEN {
            return Err(FramingError::BufferTooSmall);
        }

        buffer[0] = UNO_PREAMBLE;
        buffer[1] = UNO_PREAMBLE;
        buffer[2] = frame.destination;
        buffer[3] = frame.code;

        Ok(UNO_FRAME_LEN)
    }
}

/// Synchronization byte of the checksummed layout
pub const CHECKSUM_FRAME_START: u8 = 0xA5;

/// START + DST + SRC + CODE + LEN
const CHECKSUM_HEADER_LEN: usize = 5;

/// XOR-checked layout: `[0xA5, dst, src, code, len, payload.., xor]`
///
/// The checksum is the XOR of every byte from DST to the end of the payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChecksumGrammar;

impl ChecksumGrammar {
    /// Calculate checksum over frame data (everything between START and XOR)
    fn calculate_checksum(data: &[u8]) -> u8 {
        data.iter().fold(0, |acc, &byte| acc ^ byte)
    }
}

impl FrameGrammar for ChecksumGrammar {
    const MAX_PAYLOAD: usize = MAX_PAYLOAD_SIZE;

    fn scan(&self, buf: &[u8]) -> Scan {
        if buf.is_empty() {
            return Scan::NeedMore;
        }
        if buf[0] != CHECKSUM_FRAME_START {
            return Scan::Skip;
        }
        if buf.len() < CHECKSUM_HEADER_LEN {
            return Scan::NeedMore;
        }

        let payload_len = buf[4] as usize;
        if payload_len > Self::MAX_PAYLOAD {
            return Scan::Invalid(FramingError::BadLength);
        }

        let total = CHECKSUM_HEADER_LEN + payload_len + 1;
        if buf.len() < total {
            Scan::NeedMore
        } else {
            Scan::Complete(total)
        }
    }

    fn parse(&self, raw: &[u8]) -> Result<Frame, FramingError> {
        if raw.len() < CHECKSUM_HEADER_LEN + 1 {
            return Err(FramingError::Truncated);
        }
        if raw[0] != CHECKSUM_FRAME_START {
            return Err(FramingError::BadPreamble);
        }

        let payload_len = raw[4] as usize;
        if payload_len > Self::MAX_PAYLOAD {
            return Err(FramingError::BadLength);
        }

        let total = CHECKSUM_HEADER_LEN + payload_len + 1;
        if raw.len() < total {
            return Err(FramingError::Truncated);
        }
        if raw.len() > total {
            return Err(FramingError::Overflow);
        }

        let tag = raw[total - 1];
        if Self::calculate_checksum(&raw[1..total - 1]) != tag {
            return Err(FramingError::ChecksumMismatch);
        }

        let mut frame = Frame::new(
            raw[1],
            raw[2],
            raw[3],
            &raw[CHECKSUM_HEADER_LEN..total - 1],
        )?;
        frame.integrity_tag = tag;
        Ok(frame)
    }

    fn encode(&self, frame: &Frame, buffer: &mut [u8]) -> Result<usize, FramingError> {
        let payload_len = frame.payload.len();
        let frame_len = CHECKSUM_HEADER_LEN + payload_len + 1;
        if buffer.len() < frame_len {
            return Err(FramingError::BufferTooSmall);
        }

        buffer[0] = CHECKSUM_FRAME_START;
        buffer[1] = frame.destination;
        buffer[2] = frame.source;
        buffer[3] = frame.code;
        buffer[4] = payload_len as u8;
        buffer[CHECKSUM_HEADER_LEN..CHECKSUM_HEADER_LEN + payload_len]
            .copy_from_slice(&frame.payload);
        buffer[frame_len - 1] = Self::calculate_checksum(&buffer[1..frame_len - 1]);

        Ok(frame_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uno_encode() {
        let frame = Frame::empty(0x10, 0x00, 0x37);
        let mut buffer = [0u8; 8];
        let len = UnoGrammar.encode(&frame, &mut buffer).unwrap();

        assert_eq!(len, 4);
        assert_eq!(&buffer[..4], &[0x00, 0x00, 0x10, 0x37]);
    }

    #[test]
    fn test_uno_rejects_payload() {
        let frame = Frame::new(0x10, 0x00, 0x37, &[1]).unwrap();
        assert_eq!(
            UnoGrammar.encode_to_vec(&frame),
            Err(FramingError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_uno_scan() {
        assert_eq!(UnoGrammar.scan(&[0x42]), Scan::Skip);
        assert_eq!(UnoGrammar.scan(&[0x00]), Scan::NeedMore);
        assert_eq!(
            UnoGrammar.scan(&[0x00, 0x07]),
            Scan::Invalid(FramingError::BadPreamble)
        );
        assert_eq!(UnoGrammar.scan(&[0x00, 0x00, 0x10]), Scan::NeedMore);
        assert_eq!(UnoGrammar.scan(&[0x00, 0x00, 0x10, 0x37]), Scan::Complete(4));
        // trailing bytes belong to the next candidate
        assert_eq!(UnoGrammar.scan(&[0x00, 0x00, 0x10, 0x37, 0x00]), Scan::Complete(4));
    }

    #[test]
    fn test_uno_extra_preamble_zero_is_noise() {
        assert_eq!(UnoGrammar.scan(&[0x00, 0x00, 0x00]), Scan::Skip);
        assert_eq!(
            UnoGrammar.parse(&[0x00, 0x00, 0x00, 0x10]),
            Err(FramingError::BadPreamble)
        );
    }

    #[test]
    fn test_uno_rejects_zero_destination() {
        let frame = Frame::empty(0x00, 0x00, 0x37);
        assert_eq!(UnoGrammar.encode_to_vec(&frame), Err(FramingError::BadPreamble));
    }

    #[test]
    fn test_uno_parse_truncated() {
        assert_eq!(UnoGrammar.parse(&[0x00, 0x00, 0x10]), Err(FramingError::Truncated));
    }

    #[test]
    fn test_checksum_encode_empty_payload() {
        let frame = Frame::empty(0x10, 0x01, 0x37);
        let mut buffer = [0u8; 16];
        let len = ChecksumGrammar.encode(&frame, &mut buffer).unwrap();

        assert_eq!(len, 6);
        assert_eq!(buffer[0], CHECKSUM_FRAME_START);
        assert_eq!(buffer[4], 0); // length
        assert_eq!(buffer[5], 0x10 ^ 0x01 ^ 0x37);
    }

    #[test]
    fn test_checksum_parse_encoded() {
        let original = Frame::new(0x10, 0x01, 0x90, &[1, 2, 3]).unwrap();
        let encoded = ChecksumGrammar.encode_to_vec(&original).unwrap();

        assert_eq!(ChecksumGrammar.scan(&encoded), Scan::Complete(encoded.len()));
        let parsed = ChecksumGrammar.parse(&encoded).unwrap();
        assert!(parsed.same_message(&original));
        assert_eq!(parsed.integrity_tag, encoded[encoded.len() - 1]);
    }

    #[test]
    fn test_checksum_invalid_tag() {
        let frame = Frame::empty(0x10, 0x01, 0x37);
        let mut encoded = ChecksumGrammar.encode_to_vec(&frame).unwrap();
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0xFF;

        assert_eq!(
            ChecksumGrammar.parse(&encoded),
            Err(FramingError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_checksum_bad_length() {
        let buf = [CHECKSUM_FRAME_START, 0x10, 0x01, 0x37, 200];
        assert_eq!(
            ChecksumGrammar.scan(&buf),
            Scan::Invalid(FramingError::BadLength)
        );
    }
}
