/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Journal trait: the persistent message log of the session layer.
//!
//! Every transmitted and received frame is stored under the primary key
//! (session, direction, sequence number). The journal also owns the
//! persisted sessions with their last-seen counters, which is why sessions
//! are created and loaded through it. Inserting a duplicate key is a
//! critical integrity violation and terminates the session.

use async_trait::async_trait;
use bytes::Bytes;
use ferrofix_core::error::{FixError, JournalError};
use ferrofix_session::FixSession;
use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction of a journaled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Frame received from the peer.
    Inbound,
    /// Frame sent to the peer.
    Outbound,
}

/// Keyed store for encoded frames and session counters.
#[async_trait]
pub trait Journal: Send + Sync {
    /// Loads every persisted session, keyed by (target, sender) comp ids.
    ///
    /// # Errors
    /// Backend failures.
    async fn sessions(&self) -> Result<HashMap<(String, String), FixSession>, FixError>;

    /// Loads the session for the comp-id pair, creating it with counters at
    /// 1 when unknown.
    ///
    /// # Errors
    /// Backend failures.
    async fn create_or_load(
        &self,
        target_comp_id: &str,
        sender_comp_id: &str,
    ) -> Result<FixSession, FixError>;

    /// Updates the session's counters in memory and in the store. Message
    /// rows at or above the new values are destroyed: resetting to 1 wipes
    /// the session's log.
    ///
    /// # Errors
    /// [`JournalError::InvalidSeqNum`] for zero values, backend failures.
    async fn set_seq_num(
        &self,
        session: &mut FixSession,
        next_num_out: Option<u64>,
        next_num_in: Option<u64>,
    ) -> Result<(), FixError>;

    /// Stores an encoded frame under (session, direction, seq), where seq is
    /// parsed out of the frame.
    ///
    /// # Errors
    /// [`JournalError::DuplicateSeqNo`] when the key exists (critical),
    /// [`JournalError::SeqNumNotFound`] when tag 34 cannot be located.
    async fn persist_msg(
        &self,
        msg: &[u8],
        session: &FixSession,
        direction: Direction,
    ) -> Result<(), FixError>;

    /// Recovers one frame, or `None` when the key holds nothing.
    ///
    /// # Errors
    /// Backend failures.
    async fn recover_msg(
        &self,
        session: &FixSession,
        direction: Direction,
        seq_no: u64,
    ) -> Result<Option<Bytes>, FixError>;

    /// Recovers the frames in `[start_seq_no, end_seq_no]` in sequence
    /// order. `end_seq_no == 0` means "through the highest stored".
    ///
    /// # Errors
    /// Backend failures.
    async fn recover_messages(
        &self,
        session: &FixSession,
        direction: Direction,
        start_seq_no: u64,
        end_seq_no: u64,
    ) -> Result<Vec<Bytes>, FixError>;
}

/// Parses MsgSeqNum (34) out of an encoded frame without a full decode.
///
/// # Errors
/// [`JournalError::SeqNumNotFound`] when `\x0134=` is absent or the value is
/// not numeric.
pub fn find_seq_no(msg: &[u8]) -> Result<u64, FixError> {
    let start = memmem::find(msg, b"\x0134=").ok_or(JournalError::SeqNumNotFound)?;
    let value_start = start + 4;
    let rest = &msg[value_start..];
    let end = memchr::memchr(0x01, rest).ok_or(JournalError::SeqNumNotFound)?;
    let text = std::str::from_utf8(&rest[..end]).map_err(|_| JournalError::SeqNumNotFound)?;
    let seq = text.parse().map_err(|_| JournalError::SeqNumNotFound)?;
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_seq_no() {
        let frame = b"8=FIX.4.4\x019=20\x0135=0\x0149=A\x0156=B\x0134=17\x0110=000\x01";
        assert_eq!(find_seq_no(frame).unwrap(), 17);
    }

    #[test]
    fn test_find_seq_no_missing() {
        assert!(find_seq_no(b"8=FIX.4.4\x019=5\x0135=0\x01").is_err());
        assert!(find_seq_no(b"").is_err());
    }

    #[test]
    fn test_find_seq_no_not_numeric() {
        assert!(find_seq_no(b"8=FIX.4.4\x0134=xy\x01").is_err());
    }

    #[test]
    fn test_find_seq_no_ignores_similar_tags() {
        // 134= must not match as tag 34
        let frame = b"8=FIX.4.4\x01134=9\x0134=3\x0110=000\x01";
        assert_eq!(find_seq_no(frame).unwrap(), 3);
    }
}
