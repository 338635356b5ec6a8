/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Error types for the ferrofix FIX protocol engine.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across all ferrofix operations.

use thiserror::Error;

/// Result type alias using [`FixError`] as the error type.
pub type Result<T> = std::result::Result<T, FixError>;

/// Top-level error type for all ferrofix operations.
#[derive(Debug, Error)]
pub enum FixError {
    /// Error in in-memory message construction or access.
    #[error("message error: {0}")]
    Message(#[from] MessageError),

    /// Error during message encoding.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error during message decoding.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error in session layer operations.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Error in journal operations.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// Error during schema validation or loading.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// I/O error from the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the in-memory message container.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Tag already set and `replace` was not requested.
    #[error("tag={tag} already exists")]
    DuplicatedTag {
        /// The duplicated tag number.
        tag: u32,
    },

    /// Requested tag is not present in the message.
    #[error("tag={tag} not found in message")]
    TagNotFound {
        /// The missing tag number.
        tag: u32,
    },

    /// Tag was repeated after decoding, indicates a mishandled fix group.
    #[error("tag={tag} was repeated, possible undefined repeating group or malformed message")]
    RepeatingTag {
        /// The repeated tag number.
        tag: u32,
    },

    /// Scalar read attempted on a repeating group tag.
    #[error("tag={tag} is a repeating group, use the group accessors")]
    NotAScalar {
        /// The group tag number.
        tag: u32,
    },

    /// Group read attempted on a tag that is not a repeating group.
    #[error("tag={tag} exists but is not a repeating group")]
    NotAGroup {
        /// The scalar tag number.
        tag: u32,
    },

    /// Group present in the message but not declared in the protocol profile.
    #[error("tag={tag} group is not mapped in the protocol profile")]
    UnmappedGroup {
        /// The unmapped group tag number.
        tag: u32,
    },

    /// Framing tag owned by the encoder was set manually.
    #[error("tag={tag} is a reserved framing tag owned by the encoder")]
    ReservedTag {
        /// The reserved tag number.
        tag: u32,
    },

    /// Field value could not be interpreted as the requested type.
    #[error("invalid value for tag={tag}: {reason}")]
    InvalidValue {
        /// The tag number of the field.
        tag: u32,
        /// Description of why the value is invalid.
        reason: String,
    },
}

/// Errors that occur during FIX message encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// `raw_seq_num` requested for a non-session message type.
    #[error("raw sequence number is only allowed on session messages, got msg_type={msg_type}")]
    RawSeqNumNotAllowed {
        /// The offending message type.
        msg_type: String,
    },

    /// MsgSeqNum required on the message but absent.
    #[error("message requires a populated MsgSeqNum (tag 34): {reason}")]
    MissingSeqNum {
        /// Why the sequence number was required.
        reason: String,
    },

    /// MsgSeqNum pre-set on an application message without PossDupFlag.
    #[error("application message carries a pre-set MsgSeqNum={seq} without PossDupFlag")]
    PresetSeqNum {
        /// The pre-set sequence number.
        seq: u64,
    },

    /// A repeated-tag marker cannot be serialized.
    #[error("tag={tag} carries a repeated-tag marker and cannot be encoded")]
    RepeatedMarker {
        /// The marked tag number.
        tag: u32,
    },
}

/// Errors that occur during FIX message decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is incomplete, more bytes are required.
    #[error("incomplete frame, need more data")]
    NeedMoreData,

    /// No valid `8=FIX.4.4` frame head found in the buffer.
    #[error("no valid begin string in buffer")]
    InvalidBeginString,

    /// BodyLength (tag 9) missing or not the second field.
    #[error("body length (tag 9) missing or misplaced")]
    MissingBodyLength,

    /// BodyLength value is not a plausible number.
    #[error("invalid body length value: {value}")]
    InvalidBodyLength {
        /// The raw BodyLength text.
        value: String,
    },

    /// Declared frame exceeds the maximum allowed size.
    #[error("frame too large: {size} bytes exceeds maximum {max_size}")]
    FrameTooLarge {
        /// Declared total frame size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max_size: usize,
    },

    /// Checksum mismatch between calculated and declared values.
    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Calculated checksum value.
        calculated: u8,
        /// Declared checksum value in the frame.
        declared: u8,
    },

    /// Checksum field (tag 10) missing where the body length says it should be.
    #[error("checksum field (tag 10) missing at frame trailer")]
    MissingChecksum,

    /// MsgType (tag 35) missing or not the first body field.
    #[error("msg type (tag 35) missing or not first in body")]
    MissingMsgType,

    /// A field could not be split into tag and value.
    #[error("garbled field: {text}")]
    GarbledField {
        /// The unparseable field text.
        text: String,
    },
}

/// Errors in FIX session and connection operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation not permitted in the current connection state.
    #[error("operation `{operation}` not allowed in state {state}")]
    InvalidState {
        /// The attempted operation.
        operation: String,
        /// The current connection state.
        state: String,
    },

    /// Comp-id identity of the peer does not match the session.
    #[error("comp id mismatch: expected sender={expected_sender} target={expected_target}, got sender={sender} target={target}")]
    CompIdMismatch {
        /// Sender comp id configured on the session.
        expected_sender: String,
        /// Target comp id configured on the session.
        expected_target: String,
        /// Sender comp id received on the wire.
        sender: String,
        /// Target comp id received on the wire.
        target: String,
    },

    /// Inbound sequence number lower than expected without PossDupFlag.
    #[error("sequence too low: expected {expected}, received {received}")]
    SequenceTooLow {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },

    /// A TestRequest is already awaiting its Heartbeat response.
    #[error("test request already pending: {test_req_id}")]
    TestRequestPending {
        /// The outstanding TestReqID.
        test_req_id: String,
    },

    /// No response to an outstanding TestRequest within the allowed window.
    #[error("test request timed out after {elapsed_ms} milliseconds")]
    TestRequestTimeout {
        /// Elapsed milliseconds since the TestRequest was sent.
        elapsed_ms: u64,
    },

    /// Order state machine received a message type it does not consume.
    #[error("incorrect message type for order processing: {msg_type}")]
    UnexpectedMsgType {
        /// The offending message type.
        msg_type: String,
    },

    /// Report ClOrdID does not belong to this order.
    #[error("clord id mismatch: order has {expected} (orig {orig:?}), report has {received}")]
    ClOrdIdMismatch {
        /// Current ClOrdID of the order.
        expected: String,
        /// Previous ClOrdID in the cancel/replace chain.
        orig: Option<String>,
        /// ClOrdID carried by the report.
        received: String,
    },

    /// Transition not present in the order state table.
    #[error("illegal order transition: status={status} msg_type={msg_type} report_status={report_status}")]
    IllegalTransition {
        /// Current order status character.
        status: char,
        /// Driving message type.
        msg_type: String,
        /// Reported order status character.
        report_status: char,
    },

    /// Order operation not permitted for the current order status.
    #[error("order operation `{operation}` not allowed in status {status}")]
    InvalidOrderState {
        /// The attempted operation.
        operation: String,
        /// The current order status character.
        status: char,
    },
}

/// Errors in journal operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// Duplicate (session, direction, seq) primary key. Critical and
    /// unrecoverable for the session.
    #[error("duplicate seq no {seq_no} for session key {session_key}")]
    DuplicateSeqNo {
        /// Session key of the violated row.
        session_key: i64,
        /// Sequence number of the violated row.
        seq_no: u64,
    },

    /// Tag 34 could not be located in an encoded frame.
    #[error("tag 34 not found or invalid in encoded frame")]
    SeqNumNotFound,

    /// Session is not registered in the journal.
    #[error("unknown session key {session_key}")]
    UnknownSession {
        /// The unknown session key.
        session_key: i64,
    },

    /// Sequence numbers must be positive.
    #[error("invalid sequence number {seq_no}, must be >= 1")]
    InvalidSeqNum {
        /// The rejected sequence number.
        seq_no: u64,
    },
}

/// Errors raised during schema loading and message validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Schema XML could not be parsed.
    #[error("schema parse error: {reason}")]
    Parse {
        /// Description of the parse failure.
        reason: String,
    },

    /// Required section missing from the schema document.
    #[error("schema section `{section}` missing")]
    MissingSection {
        /// The missing section name.
        section: String,
    },

    /// A member references a field name that is not defined.
    #[error("unknown field `{name}` referenced by schema")]
    UnknownFieldName {
        /// The unresolved field name.
        name: String,
    },

    /// A group field must be NUMINGROUP/INT with a `No`/`Num` name.
    #[error("field `{name}` is not usable as a group counter")]
    BadGroupField {
        /// The offending field name.
        name: String,
    },

    /// Components with circular references that never resolve.
    #[error("unresolvable component references: {names:?}")]
    UnresolvedComponents {
        /// Names of the components that failed to resolve.
        names: Vec<String>,
    },

    /// Message type not defined by the schema.
    #[error("msg_type `{msg_type}` not in schema")]
    UnknownMsgType {
        /// The unknown message type value.
        msg_type: String,
    },

    /// Required field absent from the message.
    #[error("missing required field {name}|{tag}")]
    MissingRequiredField {
        /// Field name.
        name: String,
        /// Field tag.
        tag: u32,
    },

    /// Tag present in the message but not defined by the schema.
    #[error("tag={tag} not in schema")]
    UnknownTag {
        /// The undefined tag number.
        tag: u32,
    },

    /// Tag defined by the schema but not a member of this message.
    #[error("field {name}|{tag} is not allowed in message `{msg}`")]
    FieldNotAllowed {
        /// Field name.
        name: String,
        /// Field tag.
        tag: u32,
        /// Message name.
        msg: String,
    },

    /// Value failed the field's type or enum validation.
    #[error("field {name}|{tag} validation failed (value={value}): {reason}")]
    InvalidValue {
        /// Field name.
        name: String,
        /// Field tag.
        tag: u32,
        /// The rejected value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Message shape mismatch: a group where a scalar is expected, or the
    /// reverse.
    #[error("tag={tag} group/scalar mismatch: {reason}")]
    GroupMismatch {
        /// The offending tag number.
        tag: u32,
        /// Description of the mismatch.
        reason: String,
    },

    /// A repeating group entry violated its schema.
    #[error("group {name}|{tag} entry invalid: {reason}")]
    InvalidGroupEntry {
        /// Group name.
        name: String,
        /// Group counter tag.
        tag: u32,
        /// Description of the violation.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_error_display() {
        let err = MessageError::DuplicatedTag { tag: 11 };
        assert_eq!(err.to_string(), "tag=11 already exists");
    }

    #[test]
    fn test_fix_error_from_decode() {
        let err: FixError = DecodeError::NeedMoreData.into();
        assert!(matches!(err, FixError::Decode(DecodeError::NeedMoreData)));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = DecodeError::ChecksumMismatch {
            calculated: 17,
            declared: 42,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: calculated 17, declared 42"
        );
    }

    #[test]
    fn test_journal_error_display() {
        let err = JournalError::DuplicateSeqNo {
            session_key: 1,
            seq_no: 5,
        };
        assert_eq!(err.to_string(), "duplicate seq no 5 for session key 1");
    }

    #[test]
    fn test_session_error_into_fix_error() {
        let err: FixError = SessionError::SequenceTooLow {
            expected: 5,
            received: 3,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "session error: sequence too low: expected 5, received 3"
        );
    }
}
