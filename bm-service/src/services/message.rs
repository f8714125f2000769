//! Request and reply framing.
//!
//! Both messages are a packed little-endian header followed by an opaque payload.
//!
//! ```text
//! Request:
//! ┌──────────────────┬──────────────────┬──────────────────────┐
//! │ request_id (u32) │ data_size (u32)  │ payload (data_size)  │
//! └──────────────────┴──────────────────┴──────────────────────┘
//!
//! Reply:
//! ┌───────────────────────┬──────────────────┬──────────────────┬──────────────────────┐
//! │ target_node_id (u64)  │ request_id (u32) │ data_size (u32)  │ payload (data_size)  │
//! └───────────────────────┴──────────────────┴──────────────────┴──────────────────────┘
//! ```

use crate::error::{Result, ServiceError};

/// Size of the request header in bytes
pub const REQUEST_HEADER_SIZE: usize = 8;

/// Size of the reply header in bytes
pub const REPLY_HEADER_SIZE: usize = 16;

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub request_id: u32,
    pub data_size: u32,
}

impl RequestHeader {
    pub fn encode(&self) -> [u8; REQUEST_HEADER_SIZE] {
        let mut out = [0u8; REQUEST_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.request_id.to_le_bytes());
        out[4..8].copy_from_slice(&self.data_size.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < REQUEST_HEADER_SIZE {
            return Err(ServiceError::Validation(format!(
                "request of {} bytes is shorter than its {REQUEST_HEADER_SIZE} byte header",
                bytes.len()
            )));
        }
        Ok(Self {
            request_id: read_u32(bytes, 0),
            data_size: read_u32(bytes, 4),
        })
    }
}

/// A validated view over a request message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestMessage<'a> {
    pub header: RequestHeader,
    pub data: &'a [u8],
}

impl<'a> RequestMessage<'a> {
    /// Parse a request, requiring the message length to equal header + declared data size.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let header = RequestHeader::decode(bytes)?;
        let expected = REQUEST_HEADER_SIZE as u64 + u64::from(header.data_size);
        if bytes.len() as u64 != expected {
            return Err(ServiceError::Validation(format!(
                "request data length {} does not match header (expected {expected})",
                bytes.len()
            )));
        }
        Ok(Self {
            header,
            data: &bytes[REQUEST_HEADER_SIZE..],
        })
    }

    /// Encode a request with the given id and payload
    pub fn encode(request_id: u32, data: &[u8]) -> Result<Vec<u8>> {
        let data_size = u32::try_from(data.len()).map_err(|_| {
            ServiceError::InvalidArgument(format!("request payload of {} bytes", data.len()))
        })?;
        let mut out = Vec::new();
        out.try_reserve_exact(REQUEST_HEADER_SIZE + data.len())?;
        out.extend_from_slice(
            &RequestHeader {
                request_id,
                data_size,
            }
            .encode(),
        );
        out.extend_from_slice(data);
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub target_node_id: u64,
    pub request_id: u32,
    pub data_size: u32,
}

impl ReplyHeader {
    pub fn encode(&self) -> [u8; REPLY_HEADER_SIZE] {
        let mut out = [0u8; REPLY_HEADER_SIZE];
        out[0..8].copy_from_slice(&self.target_node_id.to_le_bytes());
        out[8..12].copy_from_slice(&self.request_id.to_le_bytes());
        out[12..16].copy_from_slice(&self.data_size.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < REPLY_HEADER_SIZE {
            return Err(ServiceError::Validation(format!(
                "reply of {} bytes is shorter than its {REPLY_HEADER_SIZE} byte header",
                bytes.len()
            )));
        }
        Ok(Self {
            target_node_id: read_u64(bytes, 0),
            request_id: read_u32(bytes, 8),
            data_size: read_u32(bytes, 12),
        })
    }
}

/// A validated view over a reply message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyMessage<'a> {
    pub header: ReplyHeader,
    pub data: &'a [u8],
}

impl<'a> ReplyMessage<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let header = ReplyHeader::decode(bytes)?;
        let expected = REPLY_HEADER_SIZE as u64 + u64::from(header.data_size);
        if bytes.len() as u64 != expected {
            return Err(ServiceError::Validation(format!(
                "reply data length {} does not match header (expected {expected})",
                bytes.len()
            )));
        }
        Ok(Self {
            header,
            data: &bytes[REPLY_HEADER_SIZE..],
        })
    }
}

/// Fixed-capacity, zero-filled reply buffer owned by a single dispatch.
///
/// The payload region starts right after the reply header.
#[derive(Debug)]
pub struct ReplyBuffer {
    buf: Vec<u8>,
}

impl ReplyBuffer {
    /// Allocate a zeroed buffer of `capacity` bytes, header included
    pub fn allocate(capacity: usize) -> Result<Self> {
        if capacity < REPLY_HEADER_SIZE {
            return Err(ServiceError::InvalidArgument(format!(
                "reply capacity {capacity} is smaller than the reply header"
            )));
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)?;
        buf.resize(capacity, 0);
        Ok(Self { buf })
    }

    /// Bytes available to the handler for the reply payload
    pub fn payload_capacity(&self) -> usize {
        self.buf.len() - REPLY_HEADER_SIZE
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[REPLY_HEADER_SIZE..]
    }

    /// Write the header and return the bytes to publish (header + payload).
    pub fn finish(
        &mut self,
        target_node_id: u64,
        request_id: u32,
        data_len: usize,
    ) -> Result<&[u8]> {
        if data_len > self.payload_capacity() {
            return Err(ServiceError::Validation(format!(
                "reply length {data_len} exceeds capacity {}",
                self.payload_capacity()
            )));
        }
        let header = ReplyHeader {
            target_node_id,
            request_id,
            data_size: u32::try_from(data_len).map_err(|_| {
                ServiceError::Validation(format!("reply length {data_len} overflows u32"))
            })?,
        };
        self.buf[..REPLY_HEADER_SIZE].copy_from_slice(&header.encode());
        Ok(&self.buf[..REPLY_HEADER_SIZE + data_len])
    }
}
