/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! FIX 4.4 protocol profile.
//!
//! The profile carries what is version-specific and message-type independent:
//! the begin string, the session-message classification, the repeating-group
//! composition the decoder needs, and builders for the administrative
//! messages of the session layer.

use ferrofix_core::message::FixMessage;
use ferrofix_core::tags::{self, MsgType};
use std::collections::HashMap;

/// FIX 4.4 protocol profile.
#[derive(Debug)]
pub struct Fix44Protocol {
    repeating_groups: HashMap<u32, Vec<u32>>,
}

impl Fix44Protocol {
    /// BeginString (tag 8) value for this protocol version.
    pub const BEGIN_STRING: &'static str = "FIX.4.4";

    /// Builds the profile with its repeating-group composition.
    #[must_use]
    pub fn new() -> Self {
        let mut groups: HashMap<u32, Vec<u32>> = HashMap::new();

        groups.insert(
            tags::NO_SECURITY_ALT_ID,
            vec![tags::SECURITY_ALT_ID, tags::SECURITY_ALT_ID_SOURCE],
        );
        groups.insert(
            tags::NO_MISC_FEES,
            vec![
                tags::MISC_FEE_AMT,
                tags::MISC_FEE_CURR,
                tags::MISC_FEE_TYPE,
                tags::MISC_FEE_BASIS,
            ],
        );
        groups.insert(tags::NO_CLEARING_INSTRUCTIONS, vec![tags::CLEARING_INSTRUCTION]);
        groups.insert(
            tags::NO_EVENTS,
            vec![
                tags::EVENT_TYPE,
                tags::EVENT_DATE,
                tags::EVENT_PX,
                tags::EVENT_TEXT,
            ],
        );
        groups.insert(
            tags::NO_PARTY_IDS,
            vec![
                tags::PARTY_ID,
                tags::PARTY_ID_SOURCE,
                tags::PARTY_ROLE,
                tags::NO_PARTY_SUB_IDS,
            ],
        );
        groups.insert(
            tags::NO_PARTY_SUB_IDS,
            vec![tags::PARTY_SUB_ID, tags::PARTY_SUB_ID_TYPE],
        );
        groups.insert(
            tags::NO_NESTED_PARTY_IDS,
            vec![
                tags::NESTED_PARTY_ID,
                tags::NESTED_PARTY_ID_SOURCE,
                tags::NESTED_PARTY_ROLE,
                tags::NO_NESTED_PARTY_SUB_IDS,
            ],
        );
        groups.insert(
            tags::NO_NESTED_PARTY_SUB_IDS,
            vec![tags::NESTED_PARTY_SUB_ID, tags::NESTED_PARTY_SUB_ID_TYPE],
        );
        groups.insert(
            tags::NO_STIPULATIONS,
            vec![tags::STIPULATION_TYPE, tags::STIPULATION_VALUE],
        );
        groups.insert(
            tags::NO_TRD_REG_TIMESTAMPS,
            vec![
                tags::TRD_REG_TIMESTAMP,
                tags::TRD_REG_TIMESTAMP_TYPE,
                tags::TRD_REG_TIMESTAMP_ORIGIN,
            ],
        );
        groups.insert(
            tags::NO_CONTRA_BROKERS,
            vec![
                tags::CONTRA_BROKER,
                tags::CONTRA_TRADER,
                tags::CONTRA_TRADE_QTY,
                tags::CONTRA_TRADE_TIME,
            ],
        );
        groups.insert(
            tags::NO_ALLOCS,
            vec![
                tags::ALLOC_ID,
                tags::ALLOC_ACCOUNT,
                tags::ALLOC_ACCT_ID_SOURCE,
                tags::MATCH_STATUS,
                tags::ALLOC_QTY,
                tags::ALLOC_AVG_PX,
                tags::COMMISSION,
                tags::COMM_TYPE,
                tags::NO_NESTED_PARTY_IDS,
                tags::NO_MISC_FEES,
                tags::NO_CLEARING_INSTRUCTIONS,
            ],
        );

        Self {
            repeating_groups: groups,
        }
    }

    /// Repeating-group composition: group counter tag to member tags.
    #[must_use]
    pub fn repeating_groups(&self) -> &HashMap<u32, Vec<u32>> {
        &self.repeating_groups
    }

    /// Member tags of one repeating group, when declared.
    #[must_use]
    pub fn group_members(&self, tag: u32) -> Option<&[u32]> {
        self.repeating_groups.get(&tag).map(Vec::as_slice)
    }

    /// Returns true for session-level message types (0, 1, 2, 3, 4, 5, A).
    #[must_use]
    pub fn is_session_message(&self, msg_type: &MsgType) -> bool {
        msg_type.is_admin()
    }

    /// Builds a Logon (35=A).
    ///
    /// # Arguments
    /// * `heart_bt_int` - Heartbeat interval in seconds (tag 108)
    /// * `reset_seq_num` - Whether to request a sequence reset (tag 141)
    #[must_use]
    pub fn logon(&self, heart_bt_int: u64, reset_seq_num: bool) -> FixMessage {
        let mut msg = FixMessage::new(MsgType::Logon);
        msg.set_raw(tags::ENCRYPT_METHOD, 0);
        msg.set_raw(tags::HEART_BT_INT, heart_bt_int);
        if reset_seq_num {
            msg.set_raw(tags::RESET_SEQ_NUM_FLAG, "Y");
        }
        msg
    }

    /// Builds a Logout (35=5) with an optional Text (58) reason.
    #[must_use]
    pub fn logout(&self, text: Option<&str>) -> FixMessage {
        let mut msg = FixMessage::new(MsgType::Logout);
        if let Some(text) = text {
            msg.set_raw(tags::TEXT, text);
        }
        msg
    }

    /// Builds a Heartbeat (35=0), echoing a TestReqID (112) when answering a
    /// TestRequest.
    #[must_use]
    pub fn heartbeat(&self, test_req_id: Option<&str>) -> FixMessage {
        let mut msg = FixMessage::new(MsgType::Heartbeat);
        if let Some(id) = test_req_id {
            msg.set_raw(tags::TEST_REQ_ID, id);
        }
        msg
    }

    /// Builds a TestRequest (35=1) with the given TestReqID (112).
    #[must_use]
    pub fn test_request(&self, test_req_id: &str) -> FixMessage {
        let mut msg = FixMessage::new(MsgType::TestRequest);
        msg.set_raw(tags::TEST_REQ_ID, test_req_id);
        msg
    }

    /// Builds a ResendRequest (35=2) for `[begin_seq_no, end_seq_no]`.
    /// `end_seq_no == 0` means "through the last message sent".
    #[must_use]
    pub fn resend_request(&self, begin_seq_no: u64, end_seq_no: u64) -> FixMessage {
        let mut msg = FixMessage::new(MsgType::ResendRequest);
        msg.set_raw(tags::BEGIN_SEQ_NO, begin_seq_no);
        msg.set_raw(tags::END_SEQ_NO, end_seq_no);
        msg
    }

    /// Builds a SequenceReset (35=4).
    ///
    /// # Arguments
    /// * `msg_seq_num` - Raw MsgSeqNum (34) the frame is sent under
    /// * `new_seq_no` - NewSeqNo (36): next sequence number the peer expects
    /// * `gap_fill` - GapFillFlag (123): gap-fill vs. reset mode
    #[must_use]
    pub fn sequence_reset(&self, msg_seq_num: u64, new_seq_no: u64, gap_fill: bool) -> FixMessage {
        let mut msg = FixMessage::new(MsgType::SequenceReset);
        msg.set_raw(tags::MSG_SEQ_NUM, msg_seq_num);
        msg.set_raw(tags::GAP_FILL_FLAG, if gap_fill { "Y" } else { "N" });
        msg.set_raw(tags::NEW_SEQ_NO, new_seq_no);
        msg
    }
}

impl Default for Fix44Protocol {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_members() {
        let p = Fix44Protocol::new();
        let allocs = p.group_members(tags::NO_ALLOCS).unwrap();
        assert!(allocs.contains(&tags::ALLOC_ID));
        assert!(allocs.contains(&tags::ALLOC_AVG_PX));
        assert!(p.group_members(9999).is_none());
    }

    #[test]
    fn test_nested_group_membership() {
        let p = Fix44Protocol::new();
        let parties = p.group_members(tags::NO_PARTY_IDS).unwrap();
        assert!(parties.contains(&tags::NO_PARTY_SUB_IDS));
        assert!(p.group_members(tags::NO_PARTY_SUB_IDS).is_some());
    }

    #[test]
    fn test_session_message_classification() {
        let p = Fix44Protocol::new();
        assert!(p.is_session_message(&MsgType::Logon));
        assert!(p.is_session_message(&MsgType::SequenceReset));
        assert!(!p.is_session_message(&MsgType::NewOrderSingle));
    }

    #[test]
    fn test_logon_builder() {
        let p = Fix44Protocol::new();
        let msg = p.logon(30, true);
        assert_eq!(msg.msg_type(), &MsgType::Logon);
        assert_eq!(msg.get(tags::ENCRYPT_METHOD).unwrap(), "0");
        assert_eq!(msg.get(tags::HEART_BT_INT).unwrap(), "30");
        assert_eq!(msg.get(tags::RESET_SEQ_NUM_FLAG).unwrap(), "Y");

        let plain = p.logon(30, false);
        assert!(!plain.contains(tags::RESET_SEQ_NUM_FLAG));
    }

    #[test]
    fn test_resend_request_builder() {
        let p = Fix44Protocol::new();
        let msg = p.resend_request(5, 0);
        assert_eq!(msg.get(tags::BEGIN_SEQ_NO).unwrap(), "5");
        assert_eq!(msg.get(tags::END_SEQ_NO).unwrap(), "0");
    }

    #[test]
    fn test_sequence_reset_builder() {
        let p = Fix44Protocol::new();
        let msg = p.sequence_reset(3, 5, true);
        assert_eq!(msg.get(tags::MSG_SEQ_NUM).unwrap(), "3");
        assert_eq!(msg.get(tags::NEW_SEQ_NO).unwrap(), "5");
        assert_eq!(msg.get(tags::GAP_FILL_FLAG).unwrap(), "Y");
    }

    #[test]
    fn test_heartbeat_echoes_test_req_id() {
        let p = Fix44Protocol::new();
        let msg = p.heartbeat(Some("TR1"));
        assert_eq!(msg.get(tags::TEST_REQ_ID).unwrap(), "TR1");
        assert!(!p.heartbeat(None).contains(tags::TEST_REQ_ID));
    }
}
