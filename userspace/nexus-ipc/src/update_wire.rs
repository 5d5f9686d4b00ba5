// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Update-control wire frames (post-update request and acknowledgement)
//!
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Internal (updates library + host tests)
//! TEST_COVERAGE: Unit tests (host)
//!
//! FRAME:
//!   - `[b'U', b'P', VERSION, type, len: u32 LE, payload[len]]`
//!
//! INVARIANTS:
//!   - Never panics on malformed/truncated input
//!   - Payload bounded by `MAX_PAYLOAD`

#![forbid(unsafe_code)]

/// Frame magic (byte 0).
pub const MAGIC0: u8 = b'U';
/// Frame magic (byte 1).
pub const MAGIC1: u8 = b'P';
/// Protocol version.
pub const VERSION: u8 = 1;
/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 8;
/// Maximum payload size in bytes.
pub const MAX_PAYLOAD: usize = 4096;

/// Message tag carried in byte 3 of every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    /// Agent asks the daemon to run post-update actions.
    PostUpdate = 1,
    /// Request accepted.
    Ack = 2,
    /// Request refused.
    Nack = 3,
}

impl MsgType {
    /// Maps a raw tag to a known message type.
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::PostUpdate),
            2 => Some(Self::Ack),
            3 => Some(Self::Nack),
            _ => None,
        }
    }
}

/// Errors when encoding or decoding update-control frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireError {
    /// Buffer is too short for the header or the declared payload.
    Truncated,
    /// Magic bytes were incorrect.
    BadMagic,
    /// Unsupported protocol version.
    BadVersion(u8),
    /// Unknown message tag.
    BadType(u8),
    /// Payload exceeds `MAX_PAYLOAD`.
    TooLarge,
    /// Bytes follow the declared payload.
    TrailingBytes,
}

impl core::fmt::Display for WireError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated frame"),
            Self::BadMagic => write!(f, "bad frame magic"),
            Self::BadVersion(v) => write!(f, "unsupported frame version {v}"),
            Self::BadType(t) => write!(f, "unknown message type {t}"),
            Self::TooLarge => write!(f, "payload too large"),
            Self::TrailingBytes => write!(f, "trailing bytes after payload"),
        }
    }
}

/// Decoded update-control message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Message tag.
    pub kind: MsgType,
    /// Opaque payload; empty for the post-update request.
    pub payload: Vec<u8>,
}

/// Encodes a frame of type `kind` carrying `payload`.
pub fn encode(kind: MsgType, payload: &[u8]) -> Result<Vec<u8>, WireError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(WireError::TooLarge);
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&[MAGIC0, MAGIC1, VERSION, kind as u8]);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Encodes the empty-payload post-update request.
pub fn encode_post_update() -> Vec<u8> {
    vec![MAGIC0, MAGIC1, VERSION, MsgType::PostUpdate as u8, 0, 0, 0, 0]
}

/// Decodes one complete frame.
pub fn decode(frame: &[u8]) -> Result<Message, WireError> {
    if frame.len() < HEADER_LEN {
        return Err(WireError::Truncated);
    }
    if frame[0] != MAGIC0 || frame[1] != MAGIC1 {
        return Err(WireError::BadMagic);
    }
    if frame[2] != VERSION {
        return Err(WireError::BadVersion(frame[2]));
    }
    let kind = MsgType::from_u8(frame[3]).ok_or(WireError::BadType(frame[3]))?;
    let len = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]) as usize;
    if len > MAX_PAYLOAD {
        return Err(WireError::TooLarge);
    }
    let body = &frame[HEADER_LEN..];
    if body.len() < len {
        return Err(WireError::Truncated);
    }
    if body.len() > len {
        return Err(WireError::TrailingBytes);
    }
    Ok(Message { kind, payload: body.to_vec() })
}
