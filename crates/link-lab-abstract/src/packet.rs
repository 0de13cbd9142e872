//! Wire-format definitions for link-layer frames.
//!
//! Every frame exchanged over the physical medium has a fixed layout:
//! a 14-byte header followed by a [`MAX_PAYLOAD`]-byte payload region of
//! which only the first `payload_len` bytes are meaningful (the rest is
//! zero-padded). All multi-byte integers are big-endian.
//!
//! ```text
//!  offset  0        4        8          10            14
//!          +--------+--------+----------+-------------+----------------+
//!          | seq u32| ack u32| cksum u16| pay_len u32 | payload region |
//!          +--------+--------+----------+-------------+----------------+
//! ```
//!
//! This module is pure data transformation; no I/O happens here.

use bytes::{Buf, BufMut};

use crate::error::LinkError;

/// Maximum number of payload bytes carried by a single frame.
pub const MAX_PAYLOAD: usize = 256;

/// Byte length of the fixed header on the wire:
/// seq(4) + ack(4) + checksum(2) + payload_len(4).
pub const HEADER_LEN: usize = 14;

/// Total on-wire size of every frame (header plus the padded payload region).
pub const FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

/// Fixed-size frame header.
///
/// `seq` and `ack` live in the configured sequence-number space (mod N);
/// `checksum` is the Internet checksum computed by [`crate::checksum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    /// Sequence number of this frame.
    pub seq: u32,
    /// Cumulative acknowledgment: last in-order sequence number received.
    pub ack: u32,
    /// Internet checksum over header (field zeroed) + live payload bytes.
    pub checksum: u16,
    /// Number of meaningful payload bytes, `<= MAX_PAYLOAD`.
    pub payload_len: u32,
}

/// A complete frame: header plus a fixed-capacity payload buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: [u8; MAX_PAYLOAD],
}

impl Frame {
    /// Build a data frame carrying `payload`.
    ///
    /// Fails with [`LinkError::InvalidArgument`] when `payload` is empty or
    /// longer than [`MAX_PAYLOAD`]. The checksum field is left at zero; the
    /// sender stamps it once the ack field is final.
    pub fn data(seq: u32, ack: u32, payload: &[u8]) -> Result<Self, LinkError> {
        if payload.is_empty() {
            return Err(LinkError::InvalidArgument("payload must not be empty"));
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(LinkError::InvalidArgument("payload exceeds MAX_PAYLOAD"));
        }
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            header: FrameHeader {
                seq,
                ack,
                checksum: 0,
                payload_len: payload.len() as u32,
            },
            payload: buf,
        })
    }

    /// Build a zero-payload frame carrying only a cumulative ack.
    pub fn standalone_ack(seq: u32, ack: u32) -> Self {
        Self {
            header: FrameHeader {
                seq,
                ack,
                checksum: 0,
                payload_len: 0,
            },
            payload: [0u8; MAX_PAYLOAD],
        }
    }

    /// The meaningful payload bytes.
    pub fn data_bytes(&self) -> &[u8] {
        &self.payload[..self.header.payload_len as usize]
    }

    /// `true` when this frame carries no payload (pure ack).
    pub fn is_ack_only(&self) -> bool {
        self.header.payload_len == 0
    }

    /// Serialize into a fixed [`FRAME_LEN`] buffer, zero-padding the payload
    /// region past `payload_len`. The stored checksum field is written as-is.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_LEN);
        buf.put_u32(self.header.seq);
        buf.put_u32(self.header.ack);
        buf.put_u16(self.header.checksum);
        buf.put_u32(self.header.payload_len);
        buf.put_slice(&self.payload);
        buf
    }

    /// Parse a frame from raw bytes.
    ///
    /// Only structural validity is checked here (length fields); checksum
    /// verification is the receive sequencer's decision so that the ack
    /// field of a corrupted frame can still be observed.
    pub fn decode(mut buf: &[u8]) -> Result<Self, LinkError> {
        if buf.len() < HEADER_LEN {
            return Err(LinkError::InvalidPacket("frame shorter than header"));
        }
        let header = FrameHeader {
            seq: buf.get_u32(),
            ack: buf.get_u32(),
            checksum: buf.get_u16(),
            payload_len: buf.get_u32(),
        };
        if header.payload_len as usize > MAX_PAYLOAD {
            return Err(LinkError::InvalidPacket("payload_len exceeds MAX_PAYLOAD"));
        }
        if buf.len() < header.payload_len as usize {
            return Err(LinkError::InvalidPacket("frame truncated mid-payload"));
        }
        let mut payload = [0u8; MAX_PAYLOAD];
        let take = buf.len().min(MAX_PAYLOAD);
        payload[..take].copy_from_slice(&buf[..take]);
        Ok(Self { header, payload })
    }
}
