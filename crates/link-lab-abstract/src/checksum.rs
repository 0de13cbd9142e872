//! 16-bit Internet checksum (ones' complement) over a frame.
//!
//! The checksum covers the serialized header with its checksum field zeroed,
//! concatenated with the first `payload_len` payload bytes. This layout is a
//! wire contract and must stay bit-exact.

use crate::error::LinkError;
use crate::packet::{Frame, HEADER_LEN, MAX_PAYLOAD};

/// Compute the checksum for `frame`, ignoring the stored checksum field.
///
/// Fails with [`LinkError::InvalidPacket`] when the frame claims more than
/// [`MAX_PAYLOAD`] payload bytes.
pub fn compute(frame: &Frame) -> Result<u16, LinkError> {
    let payload_len = frame.header.payload_len as usize;
    if payload_len > MAX_PAYLOAD {
        return Err(LinkError::InvalidPacket("payload_len exceeds MAX_PAYLOAD"));
    }

    let mut copy = frame.clone();
    copy.header.checksum = 0;
    let bytes = copy.encode();
    Ok(fold(&bytes[..HEADER_LEN + payload_len]))
}

/// Recompute and compare against the stored checksum field.
///
/// A frame whose `payload_len` is structurally invalid never verifies.
pub fn verify(frame: &Frame) -> bool {
    match compute(frame) {
        Ok(sum) => sum == frame.header.checksum,
        Err(_) => false,
    }
}

/// Ones'-complement sum of big-endian 16-bit words with end-around carry
/// folding; an odd trailing byte is padded on the right with zero.
fn fold(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);

    for chunk in &mut chunks {
        let value = u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
        sum = sum.wrapping_add(value);
    }

    if let Some(&byte) = chunks.remainder().first() {
        sum = sum.wrapping_add((byte as u32) << 8);
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}
