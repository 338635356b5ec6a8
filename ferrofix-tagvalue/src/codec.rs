/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Wire codec: [`FixMessage`] to SOH-delimited frames and back.
//!
//! Encoding owns the framing tags: it writes the standard header
//! (`8=FIX.4.4|9=len|35=type|49=sender|56=target|34=seq|52=time|`), expands
//! repeating groups in insertion order, and closes the frame with the
//! checksum trailer. Sequence numbers are allocated from the session unless
//! the message is a session-class frame sent with `raw_seq_num`, or an
//! application replay marked `PossDupFlag=Y`.
//!
//! Decoding scans a byte buffer that may hold junk, partial frames or
//! several concatenated frames, and consumes at most one frame per call.
//! Which `No*` tags open repeating groups comes from the protocol profile.

use crate::checksum::{calculate_checksum, format_checksum, parse_checksum};
use bytes::{BufMut, Bytes, BytesMut};
use ferrofix_core::error::{DecodeError, EncodeError, FixError};
use ferrofix_core::message::{FieldEntry, FixContainer, FixMessage};
use ferrofix_core::tags;
use ferrofix_core::types::Timestamp;
use ferrofix_protocol::Fix44Protocol;
use ferrofix_session::FixSession;
use memchr::{memchr, memmem};
use std::sync::Arc;
use tracing::warn;

/// SOH field separator.
pub const SOH: u8 = 0x01;

/// Frame head every FIX 4.4 frame starts with.
const FRAME_HEAD: &[u8] = b"8=FIX.4.4\x01";

/// Wire size of the checksum trailer `10=NNN|`.
const CHECKSUM_FIELD_LEN: usize = 7;

/// Result of one decode call.
#[derive(Debug)]
pub struct Decoded {
    /// The decoded message, when a complete valid frame was consumed.
    pub message: Option<FixMessage>,
    /// Bytes consumed from the front of the buffer. Zero means "wait for
    /// more data" with the buffer intact.
    pub consumed: usize,
    /// The consumed frame's raw bytes, for journaling.
    pub raw: Option<Bytes>,
}

enum DecodeStep {
    Frame {
        message: FixMessage,
        consumed: usize,
        raw: Bytes,
    },
    /// Bytes before any plausible frame head; consume and retry.
    Junk { consumed: usize },
    NeedMore,
    Bad {
        consumed: usize,
        error: DecodeError,
    },
}

/// FIX 4.4 tag=value codec.
#[derive(Debug, Clone)]
pub struct Codec {
    protocol: Arc<Fix44Protocol>,
    max_frame_size: usize,
}

impl Codec {
    /// Creates a codec over the given protocol profile.
    #[must_use]
    pub fn new(protocol: Arc<Fix44Protocol>) -> Self {
        Self {
            protocol,
            max_frame_size: 1024 * 1024,
        }
    }

    /// Sets the maximum accepted frame size.
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Returns the protocol profile this codec frames for.
    #[must_use]
    pub fn protocol(&self) -> &Arc<Fix44Protocol> {
        &self.protocol
    }

    /// Encodes a message into a complete frame, allocating the sequence
    /// number from the session.
    ///
    /// # Arguments
    /// * `msg` - The message to serialize
    /// * `session` - Source of comp ids and the outbound counter
    /// * `raw_seq_num` - Trust the MsgSeqNum already on a session-class
    ///   message instead of allocating one
    ///
    /// # Errors
    /// [`EncodeError`] on sequence-policy violations or repeated-tag markers.
    pub fn encode(
        &self,
        msg: &FixMessage,
        session: &mut FixSession,
        raw_seq_num: bool,
    ) -> Result<Bytes, FixError> {
        let msg_type = msg.msg_type();

        let seq_no: u64 = if msg_type.is_admin() {
            if raw_seq_num {
                msg.get_parsed(tags::MSG_SEQ_NUM).map_err(|_| {
                    FixError::from(EncodeError::MissingSeqNum {
                        reason: "raw_seq_num requested".to_string(),
                    })
                })?
            } else {
                session.allocate_next_num_out()
            }
        } else {
            if raw_seq_num {
                return Err(EncodeError::RawSeqNumNotAllowed {
                    msg_type: msg_type.as_str().to_string(),
                }
                .into());
            }
            if msg.get_or(tags::POSS_DUP_FLAG, "N")? == "Y" {
                // replay keeps its original sequence number
                msg.get_parsed(tags::MSG_SEQ_NUM).map_err(|_| {
                    FixError::from(EncodeError::MissingSeqNum {
                        reason: "PossDupFlag=Y without prior MsgSeqNum".to_string(),
                    })
                })?
            } else if msg.contains(tags::MSG_SEQ_NUM) {
                let seq = msg.get_parsed(tags::MSG_SEQ_NUM).unwrap_or(0);
                return Err(EncodeError::PresetSeqNum { seq }.into());
            } else {
                session.allocate_next_num_out()
            }
        };

        let mut body = BytesMut::with_capacity(256);
        put_str(&mut body, tags::SENDER_COMP_ID, &session.sender_comp_id);
        put_str(&mut body, tags::TARGET_COMP_ID, &session.target_comp_id);
        put_uint(&mut body, tags::MSG_SEQ_NUM, seq_no);
        put_str(&mut body, tags::SENDING_TIME, &Timestamp::now().to_fix());

        for (tag, entry) in msg.entries() {
            if is_framing_tag(tag) {
                continue;
            }
            put_entry(&mut body, tag, entry)?;
        }

        // BodyLength spans from after its own SOH through the SOH before 10=
        let type_str = msg_type.as_str();
        let body_length = 3 + type_str.len() + 1 + body.len();

        let mut frame = BytesMut::with_capacity(FRAME_HEAD.len() + body_length + 32);
        frame.put_slice(FRAME_HEAD);
        frame.put_slice(b"9=");
        let mut len_buf = itoa::Buffer::new();
        frame.put_slice(len_buf.format(body_length).as_bytes());
        frame.put_u8(SOH);
        frame.put_slice(b"35=");
        frame.put_slice(type_str.as_bytes());
        frame.put_u8(SOH);
        frame.put_slice(&body);

        let checksum = calculate_checksum(&frame);
        frame.put_slice(b"10=");
        frame.put_slice(&format_checksum(checksum));
        frame.put_u8(SOH);

        Ok(frame.freeze())
    }

    /// Decodes at most one frame from the front of `raw`, silently skipping
    /// junk and bad frames.
    ///
    /// Returns `(None, 0, None)` when more bytes are needed, `(None, n, None)`
    /// when `n` bytes of junk or a bad frame were discarded, and a message
    /// with its raw bytes on success.
    #[must_use]
    pub fn decode(&self, raw: &[u8]) -> Decoded {
        match self.decode_step(raw) {
            DecodeStep::Frame {
                message,
                consumed,
                raw,
            } => Decoded {
                message: Some(message),
                consumed,
                raw: Some(raw),
            },
            DecodeStep::Junk { consumed } => Decoded {
                message: None,
                consumed,
                raw: None,
            },
            DecodeStep::NeedMore => Decoded {
                message: None,
                consumed: 0,
                raw: None,
            },
            DecodeStep::Bad { consumed, error } => {
                warn!(%error, consumed, "skipping undecodable frame");
                Decoded {
                    message: None,
                    consumed,
                    raw: None,
                }
            }
        }
    }

    /// Decodes one frame, raising on any malformed input.
    ///
    /// # Errors
    /// [`DecodeError`] for junk, truncated buffers, framing or checksum
    /// violations.
    pub fn decode_strict(&self, raw: &[u8]) -> Result<Decoded, FixError> {
        match self.decode_step(raw) {
            DecodeStep::Frame {
                message,
                consumed,
                raw,
            } => Ok(Decoded {
                message: Some(message),
                consumed,
                raw: Some(raw),
            }),
            DecodeStep::Junk { .. } => Err(DecodeError::InvalidBeginString.into()),
            DecodeStep::NeedMore => Err(DecodeError::NeedMoreData.into()),
            DecodeStep::Bad { error, .. } => Err(error.into()),
        }
    }

    fn decode_step(&self, raw: &[u8]) -> DecodeStep {
        let Some(start) = memmem::find(raw, FRAME_HEAD) else {
            // keep a partial head that may complete with the next read
            let keep = FRAME_HEAD.len() - 1;
            if raw.len() <= keep {
                return DecodeStep::NeedMore;
            }
            return DecodeStep::Junk {
                consumed: raw.len() - keep,
            };
        };
        if start > 0 {
            return DecodeStep::Junk { consumed: start };
        }

        // BodyLength must be the second field
        let len_tag_at = FRAME_HEAD.len();
        if raw.len() < len_tag_at + 2 {
            return DecodeStep::NeedMore;
        }
        if &raw[len_tag_at..len_tag_at + 2] != b"9=" {
            return DecodeStep::Bad {
                consumed: raw.len(),
                error: DecodeError::MissingBodyLength,
            };
        }
        let len_start = len_tag_at + 2;
        let Some(len_soh) = memchr(SOH, &raw[len_start..]) else {
            if raw.len() - len_start > 9 {
                return DecodeStep::Bad {
                    consumed: raw.len(),
                    error: DecodeError::InvalidBodyLength {
                        value: String::from_utf8_lossy(&raw[len_start..]).into_owned(),
                    },
                };
            }
            return DecodeStep::NeedMore;
        };
        let len_text = &raw[len_start..len_start + len_soh];
        let body_length = match parse_ascii_usize(len_text) {
            Some(n) => n,
            None => {
                return DecodeStep::Bad {
                    consumed: raw.len(),
                    error: DecodeError::InvalidBodyLength {
                        value: String::from_utf8_lossy(len_text).into_owned(),
                    },
                };
            }
        };

        let body_start = len_start + len_soh + 1;
        let total = body_start + body_length + CHECKSUM_FIELD_LEN;
        if total > self.max_frame_size {
            return DecodeStep::Bad {
                consumed: raw.len(),
                error: DecodeError::FrameTooLarge {
                    size: total,
                    max_size: self.max_frame_size,
                },
            };
        }
        if raw.len() < total {
            return DecodeStep::NeedMore;
        }

        let frame = &raw[..total];
        if &frame[total - CHECKSUM_FIELD_LEN..total - 4] != b"10=" || frame[total - 1] != SOH {
            return DecodeStep::Bad {
                consumed: total,
                error: DecodeError::MissingChecksum,
            };
        }
        let Some(declared) = parse_checksum(&frame[total - 4..total - 1]) else {
            return DecodeStep::Bad {
                consumed: total,
                error: DecodeError::MissingChecksum,
            };
        };
        let calculated = calculate_checksum(&frame[..total - CHECKSUM_FIELD_LEN]);
        if calculated != declared {
            return DecodeStep::Bad {
                consumed: total,
                error: DecodeError::ChecksumMismatch {
                    calculated,
                    declared,
                },
            };
        }

        match self.build_message(frame, body_start) {
            Ok(message) => DecodeStep::Frame {
                message,
                consumed: total,
                raw: Bytes::copy_from_slice(frame),
            },
            Err(error) => DecodeStep::Bad {
                consumed: total,
                error,
            },
        }
    }

    fn build_message(&self, frame: &[u8], body_start: usize) -> Result<FixMessage, DecodeError> {
        // the first body field must be MsgType
        let (first_tag, type_value) = split_field(&frame[body_start..])?;
        if first_tag != tags::MSG_TYPE {
            return Err(DecodeError::MissingMsgType);
        }

        let mut msg = FixMessage::new(type_value);
        let groups = self.protocol.repeating_groups();
        let mut stack: Vec<GroupCtx<'_>> = Vec::new();

        let mut offset = 0;
        while offset < frame.len() {
            let rest = &frame[offset..];
            let (tag, value) = split_field(rest)?;
            let field_len = field_wire_len(rest);
            offset += field_len;

            if let Some(members) = groups.get(&tag) {
                // a group counter opens a fresh entry context
                while let Some(top) = stack.last() {
                    if top.members.contains(&tag) {
                        break;
                    }
                    pop_attach(&mut stack, &mut msg)?;
                }
                stack.push(GroupCtx {
                    tag,
                    members: members.as_slice(),
                    container: FixContainer::new(),
                });
            } else if !stack.is_empty() {
                while let Some(top) = stack.last() {
                    if top.members.contains(&tag) {
                        break;
                    }
                    pop_attach(&mut stack, &mut msg)?;
                }
                if let Some(top) = stack.last() {
                    if top.container.contains(tag) {
                        // the member repeated: close this entry, open the next
                        let next = GroupCtx {
                            tag: top.tag,
                            members: top.members,
                            container: FixContainer::new(),
                        };
                        pop_attach(&mut stack, &mut msg)?;
                        stack.push(next);
                    }
                }
                match stack.last_mut() {
                    Some(top) => top
                        .container
                        .set(tag, value)
                        .map_err(|_| garbled(tag, value))?,
                    None => set_or_mark(&mut msg, tag, value),
                }
            } else {
                set_or_mark(&mut msg, tag, value);
            }
        }

        while !stack.is_empty() {
            pop_attach(&mut stack, &mut msg)?;
        }

        Ok(msg)
    }
}

struct GroupCtx<'p> {
    tag: u32,
    members: &'p [u32],
    container: FixContainer,
}

fn pop_attach(stack: &mut Vec<GroupCtx<'_>>, msg: &mut FixMessage) -> Result<(), DecodeError> {
    let Some(done) = stack.pop() else {
        return Ok(());
    };
    let result = match stack.last_mut() {
        Some(parent) => parent.container.add_group(done.tag, done.container),
        None => msg.add_group(done.tag, done.container),
    };
    result.map_err(|_| garbled(done.tag, ""))
}

fn set_or_mark(msg: &mut FixMessage, tag: u32, value: &str) {
    if msg.contains(tag) {
        // repeated plain tag: mark it so scalar reads fail loudly
        msg.mark_repeated(tag);
    } else {
        msg.set_raw(tag, value);
    }
}

fn garbled(tag: u32, value: &str) -> DecodeError {
    DecodeError::GarbledField {
        text: format!("{tag}={value}"),
    }
}

/// Splits the leading `tag=value\x01` of `rest`.
fn split_field(rest: &[u8]) -> Result<(u32, &str), DecodeError> {
    let eq = memchr(b'=', rest).ok_or_else(|| DecodeError::GarbledField {
        text: String::from_utf8_lossy(rest).into_owned(),
    })?;
    let soh = memchr(SOH, &rest[eq + 1..]).ok_or_else(|| DecodeError::GarbledField {
        text: String::from_utf8_lossy(rest).into_owned(),
    })?;
    let tag = parse_ascii_u32(&rest[..eq]).ok_or_else(|| DecodeError::GarbledField {
        text: String::from_utf8_lossy(&rest[..eq]).into_owned(),
    })?;
    let value = std::str::from_utf8(&rest[eq + 1..eq + 1 + soh]).map_err(|_| {
        DecodeError::GarbledField {
            text: format!("{tag}=<non-utf8>"),
        }
    })?;
    Ok((tag, value))
}

/// Wire length of the leading field of `rest`, including its SOH.
fn field_wire_len(rest: &[u8]) -> usize {
    match memchr(SOH, rest) {
        Some(pos) => pos + 1,
        None => rest.len(),
    }
}

fn parse_ascii_u32(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > 9 {
        return None;
    }
    let mut value: u32 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(u32::from(b - b'0'))?;
    }
    Some(value)
}

fn parse_ascii_usize(bytes: &[u8]) -> Option<usize> {
    parse_ascii_u32(bytes).map(|v| v as usize)
}

fn is_framing_tag(tag: u32) -> bool {
    matches!(
        tag,
        tags::BEGIN_STRING
            | tags::BODY_LENGTH
            | tags::CHECK_SUM
            | tags::MSG_TYPE
            | tags::MSG_SEQ_NUM
            | tags::SENDING_TIME
            | tags::SENDER_COMP_ID
            | tags::TARGET_COMP_ID
    )
}

fn put_str(buf: &mut BytesMut, tag: u32, value: &str) {
    let mut tag_buf = itoa::Buffer::new();
    buf.put_slice(tag_buf.format(tag).as_bytes());
    buf.put_u8(b'=');
    buf.put_slice(value.as_bytes());
    buf.put_u8(SOH);
}

fn put_uint(buf: &mut BytesMut, tag: u32, value: u64) {
    let mut val_buf = itoa::Buffer::new();
    put_str(buf, tag, val_buf.format(value));
}

fn put_entry(buf: &mut BytesMut, tag: u32, entry: &FieldEntry) -> Result<(), FixError> {
    match entry {
        FieldEntry::Value(v) => {
            put_str(buf, tag, v);
            Ok(())
        }
        FieldEntry::Repeated => Err(EncodeError::RepeatedMarker { tag }.into()),
        FieldEntry::Group(entries) => {
            put_uint(buf, tag, entries.len() as u64);
            for entry in entries {
                for (t, e) in entry.entries() {
                    put_entry(buf, t, e)?;
                }
            }
            Ok(())
        }
    }
}
