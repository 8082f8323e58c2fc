//! Bus frames and framing errors
//!
//! A [`Frame`] only exists once its bytes have passed the grammar's integrity
//! check. Outgoing frames are built with [`Frame::new`] and given their
//! integrity tag by the grammar at encode time.

use heapless::Vec;

/// Maximum payload size in bytes, across all grammars
pub const MAX_PAYLOAD_SIZE: usize = 8;

/// Maximum raw frame size on the wire, across all grammars
pub const MAX_FRAME_SIZE: usize = 16;

/// Errors that can occur while assembling or encoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramingError {
    /// Fixed preamble bytes did not match
    BadPreamble,
    /// Integrity tag did not validate against the frame bytes
    ChecksumMismatch,
    /// Line went quiet before the frame was complete
    Truncated,
    /// Raw bytes exceeded the assembly buffer
    Overflow,
    /// Length field out of range for the grammar
    BadLength,
    /// Payload does not fit the grammar
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// UART reported a parity or line fault mid-frame
    Parity,
}

/// One validated protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Sender address (0x00 on grammars that do not carry one)
    pub source: u8,
    /// Receiver address, possibly the broadcast address
    pub destination: u8,
    /// Event or command code
    pub code: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    /// Integrity tag as read off the wire; recomputed by the grammar on encode
    pub integrity_tag: u8,
}

impl Frame {
    /// Create a new frame with the given addressing, code and payload
    pub fn new(destination: u8, source: u8, code: u8, payload: &[u8]) -> Result<Self, FramingError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FramingError::PayloadTooLarge)?;

        Ok(Self {
            source,
            destination,
            code,
            payload: payload_vec,
            integrity_tag: 0,
        })
    }

    /// Create a frame with no payload
    pub fn empty(destination: u8, source: u8, code: u8) -> Self {
        Self {
            source,
            destination,
            code,
            payload: Vec::new(),
            integrity_tag: 0,
        }
    }

    /// True if addressing, code and payload match, ignoring the integrity tag
    pub fn same_message(&self, other: &Frame) -> bool {
        self.source == other.source
            && self.destination == other.destination
            && self.code == other.code
            && self.payload == other.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = Frame::new(0x10, 0x01, 0x37, &[1, 2]).unwrap();
        assert_eq!(frame.destination, 0x10);
        assert_eq!(frame.source, 0x01);
        assert_eq!(frame.code, 0x37);
        assert_eq!(&frame.payload[..], &[1, 2]);
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let result = Frame::new(0x10, 0x00, 0x21, &large_payload);
        assert_eq!(result, Err(FramingError::PayloadTooLarge));
    }

    #[test]
    fn test_same_message_ignores_tag() {
        let a = Frame::empty(0x10, 0x00, 0x90);
        let mut b = a.clone();
        b.integrity_tag = 0x5A;
        assert!(a.same_message(&b));

        b.code = 0x11;
        assert!(!a.same_message(&b));
    }
}
