/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! FIX session identity and sequence counters.
//!
//! A [`FixSession`] pairs the comp-id identity (SenderCompID/TargetCompID)
//! with the two monotonic sequence counters of a FIX session. Sequence
//! numbers start at 1, are allocated on send and advanced on accept of an
//! in-order inbound message. Sessions are created and persisted by the
//! journal; the connection engine drives the counters.

use ferrofix_core::message::FixMessage;
use ferrofix_core::tags::{self, MsgType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of checking an inbound MsgSeqNum against the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqCheck {
    /// Sequence number is the expected one.
    InOrder(u64),
    /// Sequence number is lower than expected (possible duplicate or
    /// expected resend); upstream decides what to do.
    Duplicate {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
    /// Sequence number is higher than expected; upstream triggers a resend
    /// request.
    Gap {
        /// Expected sequence number.
        expected: u64,
        /// Received sequence number.
        received: u64,
    },
}

impl SeqCheck {
    /// Returns true when the sequence number was the expected one.
    #[must_use]
    pub const fn is_in_order(&self) -> bool {
        matches!(self, Self::InOrder(_))
    }

    /// Returns true when a gap was detected.
    #[must_use]
    pub const fn is_gap(&self) -> bool {
        matches!(self, Self::Gap { .. })
    }
}

/// Per-peer FIX session: identity plus sequence counters.
///
/// Identity is the (sender, target) comp-id pair; `key` is the journal's
/// storage id for this session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSession {
    /// Journal storage key.
    pub key: i64,
    /// Our comp id (tag 49 on outbound frames).
    pub sender_comp_id: String,
    /// Peer comp id (tag 56 on outbound frames).
    pub target_comp_id: String,
    /// Next sequence number to allocate for an outbound frame.
    pub next_num_out: u64,
    /// Next sequence number expected on an inbound frame.
    pub next_num_in: u64,
}

impl FixSession {
    /// Creates a session with counters at 1.
    ///
    /// # Arguments
    /// * `key` - Journal storage key
    /// * `target_comp_id` - Peer comp id
    /// * `sender_comp_id` - Our comp id
    #[must_use]
    pub fn new(key: i64, target_comp_id: impl Into<String>, sender_comp_id: impl Into<String>) -> Self {
        Self {
            key,
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            next_num_out: 1,
            next_num_in: 1,
        }
    }

    /// Allocates the next outbound sequence number and advances the counter.
    pub fn allocate_next_num_out(&mut self) -> u64 {
        let n = self.next_num_out;
        self.next_num_out += 1;
        n
    }

    /// Checks an inbound sequence number against the expected value without
    /// advancing anything.
    #[must_use]
    pub fn check_seq_num(&self, received: u64) -> SeqCheck {
        let expected = self.next_num_in;
        if received == expected {
            SeqCheck::InOrder(received)
        } else if received < expected {
            SeqCheck::Duplicate { expected, received }
        } else {
            SeqCheck::Gap { expected, received }
        }
    }

    /// Accepts an in-order inbound sequence number, advancing the counter.
    pub fn accept_seq_num(&mut self, seq_no: u64) {
        self.next_num_in = seq_no + 1;
    }

    /// Applies an inbound message to the inbound counter.
    ///
    /// SequenceReset adopts NewSeqNo (36) directly; any other message is
    /// checked against the expected value and accepted when in order.
    #[must_use]
    pub fn set_next_num_in(&mut self, msg: &FixMessage) -> SeqCheck {
        if msg.msg_type() == &MsgType::SequenceReset {
            let Ok(new_seq_no) = msg.get_parsed::<u64>(tags::NEW_SEQ_NO) else {
                // garbled reset, leave the counter alone
                return SeqCheck::Duplicate {
                    expected: self.next_num_in,
                    received: 0,
                };
            };
            self.next_num_in = new_seq_no;
            return SeqCheck::InOrder(new_seq_no);
        }

        let Ok(seq_no) = msg.get_parsed::<u64>(tags::MSG_SEQ_NUM) else {
            return SeqCheck::Duplicate {
                expected: self.next_num_in,
                received: 0,
            };
        };
        let check = self.check_seq_num(seq_no);
        if let SeqCheck::InOrder(n) = check {
            self.accept_seq_num(n);
        }
        check
    }

    /// Checks the comp-id identity carried by an inbound frame: the peer's
    /// sender must be our target and its target our sender.
    ///
    /// # Arguments
    /// * `msg_sender` - SenderCompID (49) received on the wire
    /// * `msg_target` - TargetCompID (56) received on the wire
    #[must_use]
    pub fn validate_comp_ids(&self, msg_sender: &str, msg_target: &str) -> bool {
        msg_sender == self.target_comp_id && msg_target == self.sender_comp_id
    }

    /// Resets both counters to 1. Destroys replay ability; the journal wipes
    /// the message log alongside.
    pub fn reset_seq_nums(&mut self) {
        self.next_num_out = 1;
        self.next_num_in = 1;
    }
}

impl fmt::Display for FixSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FixSession(key={}, sender={}, target={}, out={}, in={})",
            self.key, self.sender_comp_id, self.target_comp_id, self.next_num_out, self.next_num_in
        )
    }
}
