/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Frame splitting over a byte stream.
//!
//! [`FrameCodec`] cuts complete `8=FIX.4.4|9=len|...|10=NNN|` frames out of
//! an accumulating buffer, discarding junk between frames. It validates only
//! the framing (head, BodyLength plausibility, trailer position); message
//! content and checksums are the tag=value codec's concern. Implements the
//! `tokio_util` codec traits, so it works both under `Framed` and as a plain
//! buffer splitter.

use bytes::{BufMut, BytesMut};
use memchr::memmem;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

const FRAME_HEAD: &[u8] = b"8=FIX.4.4\x01";
const SOH: u8 = 0x01;
const CHECKSUM_FIELD_LEN: usize = 7;

/// Errors while splitting frames off the stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A frame declares more bytes than the configured maximum.
    #[error("frame too large: {size} bytes exceeds maximum {max_size}")]
    TooLarge {
        /// Declared frame size.
        size: usize,
        /// Configured maximum.
        max_size: usize,
    },

    /// I/O error from the underlying stream.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Splits SOH frames by BodyLength.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Creates a codec with a 1 MiB frame bound.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame_size: 1024 * 1024,
        }
    }

    /// Sets the maximum frame size.
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            // resynchronize on the frame head, dropping junk in between
            match memmem::find(src, FRAME_HEAD) {
                None => {
                    let keep = FRAME_HEAD.len() - 1;
                    if src.len() > keep {
                        let drop = src.len() - keep;
                        let _ = src.split_to(drop);
                    }
                    return Ok(None);
                }
                Some(0) => {}
                Some(pos) => {
                    let _ = src.split_to(pos);
                }
            }

            let len_tag_at = FRAME_HEAD.len();
            if src.len() < len_tag_at + 3 {
                return Ok(None);
            }
            if &src[len_tag_at..len_tag_at + 2] != b"9=" {
                // not a real frame, skip this head and rescan
                let _ = src.split_to(len_tag_at);
                continue;
            }

            let len_start = len_tag_at + 2;
            let Some(len_soh) = src[len_start..].iter().position(|&b| b == SOH) else {
                if src.len() - len_start > 9 {
                    let _ = src.split_to(len_tag_at);
                    continue;
                }
                return Ok(None);
            };
            let len_text = &src[len_start..len_start + len_soh];
            let Some(body_length) = parse_len(len_text) else {
                let _ = src.split_to(len_tag_at);
                continue;
            };

            let total = len_start + len_soh + 1 + body_length + CHECKSUM_FIELD_LEN;
            if total > self.max_frame_size {
                return Err(FrameError::TooLarge {
                    size: total,
                    max_size: self.max_frame_size,
                });
            }
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            return Ok(Some(src.split_to(total)));
        }
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(item);
        Ok(())
    }
}

fn parse_len(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() || bytes.len() > 9 {
        return None;
    }
    let mut value: usize = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + usize::from(b - b'0');
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &str) -> Vec<u8> {
        let mut out = format!("8=FIX.4.4\x019={}\x01{}", body.len(), body).into_bytes();
        let sum: u32 = out.iter().map(|&b| u32::from(b)).sum();
        out.extend_from_slice(format!("10={:03}\x01", sum % 256).as_bytes());
        out
    }

    #[test]
    fn test_split_complete_frame() {
        let mut codec = FrameCodec::new();
        let bytes = frame("35=0\x01");
        let mut buf = BytesMut::from(&bytes[..]);
        let out = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&out[..], &bytes[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_incomplete_frame_waits() {
        let mut codec = FrameCodec::new();
        let bytes = frame("35=0\x01");
        let mut buf = BytesMut::from(&bytes[..bytes.len() - 3]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), bytes.len() - 3);
    }

    #[test]
    fn test_junk_between_frames_dropped() {
        let mut codec = FrameCodec::new();
        let f = frame("35=0\x01");
        let mut stream = b"garbage".to_vec();
        stream.extend_from_slice(&f);
        let mut buf = BytesMut::from(&stream[..]);

        let out = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&out[..], &f[..]);
    }

    #[test]
    fn test_two_frames_split_one_at_a_time() {
        let mut codec = FrameCodec::new();
        let f1 = frame("35=0\x01");
        let f2 = frame("35=1\x01112=TR\x01");
        let mut stream = f1.clone();
        stream.extend_from_slice(&f2);
        let mut buf = BytesMut::from(&stream[..]);

        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], &f1[..]);
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], &f2[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_bad_body_length_resyncs() {
        let mut codec = FrameCodec::new();
        let good = frame("35=0\x01");
        let mut stream = b"8=FIX.4.4\x019=xx\x01".to_vec();
        stream.extend_from_slice(&good);
        let mut buf = BytesMut::from(&stream[..]);

        let out = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&out[..], &good[..]);
    }

    #[test]
    fn test_frame_too_large() {
        let mut codec = FrameCodec::new().with_max_frame_size(32);
        let bytes = frame("35=0\x0158=a-long-text-field\x01");
        let mut buf = BytesMut::from(&bytes[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(FrameError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_encoder_passthrough() {
        let mut codec = FrameCodec::new();
        let bytes = frame("35=0\x01");
        let mut dst = BytesMut::new();
        codec.encode(&bytes[..], &mut dst).unwrap();
        assert_eq!(&dst[..], &bytes[..]);
    }
}
