use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Default number of bytes requested per socket read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

const LENGTH_SEPARATOR: u8 = b':';
const TERMINATOR: u8 = b',';

/// Encode a payload as a standalone netstring.
///
/// ```text
/// <len>:<payload>,
/// ```
///
/// `len` is the payload byte count in ASCII decimal. The payload is copied
/// verbatim; it may contain any bytes, including `:` and `,`.
pub fn encode(payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::new();
    encode_frame(payload, &mut dst);
    dst.freeze()
}

/// Append the netstring encoding of `payload` to `dst`.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) {
    let len = payload.len().to_string();
    dst.reserve(len.len() + payload.len() + 2);
    dst.put_slice(len.as_bytes());
    dst.put_u8(LENGTH_SEPARATOR);
    dst.put_slice(payload);
    dst.put_u8(TERMINATOR);
}

/// Decode one frame from the head of a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Errors leave the
/// buffer untouched; the stream cannot be resynchronized after one.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Bytes>> {
    let mut len: usize = 0;
    let mut separator = None;

    for (idx, &byte) in src.iter().enumerate() {
        match byte {
            b'0'..=b'9' => {
                // Netstring lengths have no leading zeros.
                if idx == 1 && src[0] == b'0' {
                    return Err(FrameError::InvalidLength { byte });
                }
                len = len
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(usize::from(byte - b'0')))
                    .ok_or(FrameError::PayloadTooLarge {
                        size: usize::MAX,
                        max: max_payload,
                    })?;
                if len > max_payload {
                    return Err(FrameError::PayloadTooLarge {
                        size: len,
                        max: max_payload,
                    });
                }
            }
            LENGTH_SEPARATOR if idx > 0 => {
                separator = Some(idx);
                break;
            }
            _ => return Err(FrameError::InvalidLength { byte }),
        }
    }

    let Some(separator) = separator else {
        return Ok(None); // Need more of the length prefix
    };

    let header = separator + 1;
    let total = header + len + 1;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let found = src[total - 1];
    if found != TERMINATOR {
        return Err(FrameError::MissingTerminator { found });
    }

    src.advance(header);
    let payload = src.split_to(len).freeze();
    src.advance(1);

    Ok(Some(payload))
}

/// Stateful streaming netstring decoder.
///
/// Bytes go in through [`FrameDecoder::feed`] in whatever chunks the
/// transport delivers; complete payloads come out in arrival order. A frame
/// cut anywhere, including inside its length prefix, stays buffered until
/// the rest arrives.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_payload_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with the default payload limit.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Create a decoder that rejects payloads longer than `max_payload_size`.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_payload_size,
        }
    }

    /// Append `chunk` and extract every frame that is now complete.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = decode_frame(&mut self.buf, self.max_payload_size)? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Number of buffered bytes not yet delivered as a frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partially received frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Update maximum payload size for subsequent decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.max_payload_size = max_payload_size;
    }
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Bytes requested per read. Default: 8 KiB.
    pub read_chunk_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(chunks: &[&[u8]]) -> Vec<Bytes> {
        let mut decoder = FrameDecoder::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(decoder.feed(chunk).unwrap());
        }
        assert_eq!(decoder.buffered_len(), 0);
        out
    }

    #[test]
    fn encode_wire_format() {
        assert_eq!(encode(b"hello").as_ref(), b"5:hello,");
        assert_eq!(encode(b"").as_ref(), b"0:,");
        assert_eq!(encode(b"a:b,c").as_ref(), b"5:a:b,c,");
    }

    #[test]
    fn encode_frame_appends() {
        let mut buf = BytesMut::from(&b"1:x,"[..]);
        encode_frame(b"yz", &mut buf);
        assert_eq!(buf.as_ref(), b"1:x,2:yz,");
    }

    #[test]
    fn single_chunk_roundtrip() {
        let payload = br#"{"method":"ping","id":"1"}"#;
        let frames = feed_all(&[&encode(payload)]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), payload);
    }

    #[test]
    fn every_split_point_yields_same_frames() {
        let payload = br#"{"event":"running","data":{"pid":42}}"#;
        let wire = encode(payload);

        for split in 0..=wire.len() {
            let (head, tail) = wire.split_at(split);
            let frames = feed_all(&[head, tail]);
            assert_eq!(frames.len(), 1, "split at {split}");
            assert_eq!(frames[0].as_ref(), payload, "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time() {
        let payload = vec![b'z'; 1234];
        let wire = encode(&payload);
        let chunks: Vec<&[u8]> = wire.chunks(1).collect();
        let frames = feed_all(&chunks);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), payload.as_slice());
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut wire = BytesMut::new();
        encode_frame(b"first", &mut wire);
        encode_frame(b"second", &mut wire);
        encode_frame(b"third", &mut wire);

        let frames = feed_all(&[&wire]);
        let frames: Vec<&[u8]> = frames.iter().map(|f| f.as_ref()).collect();
        assert_eq!(frames, vec![&b"first"[..], &b"second"[..], &b"third"[..]]);
    }

    #[test]
    fn trailing_partial_frame_is_kept() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(b"3:one,5:tw").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), b"one");
        assert_eq!(decoder.buffered_len(), 4);

        let frames = decoder.feed(b"o!!,").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), b"two!!");
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn binary_payload() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let frames = feed_all(&[&encode(&payload)]);
        assert_eq!(frames[0].as_ref(), payload.as_slice());
    }

    #[test]
    fn empty_payload() {
        let frames = feed_all(&[b"0:,"]);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_empty());
    }

    #[test]
    fn incomplete_prefix_needs_more() {
        let mut buf = BytesMut::from(&b"12"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn incomplete_payload_needs_more() {
        let mut buf = BytesMut::from(&b"5:hel"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());

        let mut buf = BytesMut::from(&b"5:hello"[..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn non_digit_prefix_rejected() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.feed(b"x5:hello,").unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength { byte: b'x' }));

        let mut decoder = FrameDecoder::new();
        let err = decoder.feed(b"1a:").unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength { byte: b'a' }));
    }

    #[test]
    fn empty_prefix_rejected() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.feed(b":abc,").unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength { byte: b':' }));
    }

    #[test]
    fn leading_zero_rejected() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.feed(b"05:hello,").unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength { byte: b'5' }));
    }

    #[test]
    fn missing_terminator_rejected() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.feed(b"5:hello;").unwrap_err();
        assert!(matches!(err, FrameError::MissingTerminator { found: b';' }));
        assert!(err.is_framing());
    }

    #[test]
    fn error_after_good_frame_in_same_chunk() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.feed(b"2:ok,?").unwrap_err();
        assert!(matches!(err, FrameError::InvalidLength { byte: b'?' }));
    }

    #[test]
    fn oversized_length_rejected_before_payload_arrives() {
        let mut decoder = FrameDecoder::with_max_payload(16);
        let err = decoder.feed(b"17").unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 17, max: 16 }
        ));
    }

    #[test]
    fn endless_digits_rejected() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.feed(&[b'9'; 64]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn clear_drops_partial_frame() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"4:ab").unwrap().is_empty());
        decoder.clear();
        assert_eq!(decoder.buffered_len(), 0);
        let frames = decoder.feed(b"2:cd,").unwrap();
        assert_eq!(frames[0].as_ref(), b"cd");
    }

    #[test]
    fn config_defaults() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.max_payload_size, DEFAULT_MAX_PAYLOAD);
        assert_eq!(cfg.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
        assert!(cfg.read_timeout.is_none());
        assert!(cfg.write_timeout.is_none());
    }
}
