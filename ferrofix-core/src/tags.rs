/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Tag and message type catalog.
//!
//! Process-wide FIX 4.4 constants: well-known tag numbers as named `u32`
//! constants and [`MsgType`] for tag 35 values. These are fixed protocol
//! vocabulary, not a mutable registry; schema-derived enumerations live in
//! the dictionary crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account (1).
pub const ACCOUNT: u32 = 1;
/// AvgPx (6).
pub const AVG_PX: u32 = 6;
/// BeginSeqNo (7).
pub const BEGIN_SEQ_NO: u32 = 7;
/// BeginString (8).
pub const BEGIN_STRING: u32 = 8;
/// BodyLength (9).
pub const BODY_LENGTH: u32 = 9;
/// CheckSum (10).
pub const CHECK_SUM: u32 = 10;
/// ClOrdID (11).
pub const CL_ORD_ID: u32 = 11;
/// Commission (12).
pub const COMMISSION: u32 = 12;
/// CommType (13).
pub const COMM_TYPE: u32 = 13;
/// CumQty (14).
pub const CUM_QTY: u32 = 14;
/// EndSeqNo (16).
pub const END_SEQ_NO: u32 = 16;
/// ExecID (17).
pub const EXEC_ID: u32 = 17;
/// LastPx (31).
pub const LAST_PX: u32 = 31;
/// LastQty (32).
pub const LAST_QTY: u32 = 32;
/// MsgSeqNum (34).
pub const MSG_SEQ_NUM: u32 = 34;
/// MsgType (35).
pub const MSG_TYPE: u32 = 35;
/// NewSeqNo (36).
pub const NEW_SEQ_NO: u32 = 36;
/// OrderID (37).
pub const ORDER_ID: u32 = 37;
/// OrderQty (38).
pub const ORDER_QTY: u32 = 38;
/// OrdStatus (39).
pub const ORD_STATUS: u32 = 39;
/// OrdType (40).
pub const ORD_TYPE: u32 = 40;
/// OrigClOrdID (41).
pub const ORIG_CL_ORD_ID: u32 = 41;
/// PossDupFlag (43).
pub const POSS_DUP_FLAG: u32 = 43;
/// Price (44).
pub const PRICE: u32 = 44;
/// RefSeqNum (45).
pub const REF_SEQ_NUM: u32 = 45;
/// SenderCompID (49).
pub const SENDER_COMP_ID: u32 = 49;
/// SendingTime (52).
pub const SENDING_TIME: u32 = 52;
/// Side (54).
pub const SIDE: u32 = 54;
/// Symbol (55).
pub const SYMBOL: u32 = 55;
/// TargetCompID (56).
pub const TARGET_COMP_ID: u32 = 56;
/// Text (58).
pub const TEXT: u32 = 58;
/// TransactTime (60).
pub const TRANSACT_TIME: u32 = 60;
/// AllocID (70).
pub const ALLOC_ID: u32 = 70;
/// NoAllocs (78).
pub const NO_ALLOCS: u32 = 78;
/// AllocAccount (79).
pub const ALLOC_ACCOUNT: u32 = 79;
/// AllocQty (80).
pub const ALLOC_QTY: u32 = 80;
/// PossResend (97).
pub const POSS_RESEND: u32 = 97;
/// EncryptMethod (98).
pub const ENCRYPT_METHOD: u32 = 98;
/// CxlRejReason (102).
pub const CXL_REJ_REASON: u32 = 102;
/// OrdRejReason (103).
pub const ORD_REJ_REASON: u32 = 103;
/// HeartBtInt (108).
pub const HEART_BT_INT: u32 = 108;
/// TestReqID (112).
pub const TEST_REQ_ID: u32 = 112;
/// OrigSendingTime (122).
pub const ORIG_SENDING_TIME: u32 = 122;
/// GapFillFlag (123).
pub const GAP_FILL_FLAG: u32 = 123;
/// NoMiscFees (136).
pub const NO_MISC_FEES: u32 = 136;
/// MiscFeeAmt (137).
pub const MISC_FEE_AMT: u32 = 137;
/// MiscFeeCurr (138).
pub const MISC_FEE_CURR: u32 = 138;
/// MiscFeeType (139).
pub const MISC_FEE_TYPE: u32 = 139;
/// ResetSeqNumFlag (141).
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
/// ExecType (150).
pub const EXEC_TYPE: u32 = 150;
/// LeavesQty (151).
pub const LEAVES_QTY: u32 = 151;
/// AllocAvgPx (153).
pub const ALLOC_AVG_PX: u32 = 153;
/// NoStipulations (232).
pub const NO_STIPULATIONS: u32 = 232;
/// StipulationType (233).
pub const STIPULATION_TYPE: u32 = 233;
/// StipulationValue (234).
pub const STIPULATION_VALUE: u32 = 234;
/// ContraTrader (337).
pub const CONTRA_TRADER: u32 = 337;
/// ContraBroker (375).
pub const CONTRA_BROKER: u32 = 375;
/// NoContraBrokers (382).
pub const NO_CONTRA_BROKERS: u32 = 382;
/// CxlRejResponseTo (434).
pub const CXL_REJ_RESPONSE_TO: u32 = 434;
/// ContraTradeQty (437).
pub const CONTRA_TRADE_QTY: u32 = 437;
/// ContraTradeTime (438).
pub const CONTRA_TRADE_TIME: u32 = 438;
/// PartyIDSource (447).
pub const PARTY_ID_SOURCE: u32 = 447;
/// PartyID (448).
pub const PARTY_ID: u32 = 448;
/// PartyRole (452).
pub const PARTY_ROLE: u32 = 452;
/// NoPartyIDs (453).
pub const NO_PARTY_IDS: u32 = 453;
/// SecurityAltID (455).
pub const SECURITY_ALT_ID: u32 = 455;
/// SecurityAltIDSource (456).
pub const SECURITY_ALT_ID_SOURCE: u32 = 456;
/// NoSecurityAltID (454).
pub const NO_SECURITY_ALT_ID: u32 = 454;
/// PartySubID (523).
pub const PARTY_SUB_ID: u32 = 523;
/// NestedPartyID (524).
pub const NESTED_PARTY_ID: u32 = 524;
/// NestedPartyIDSource (525).
pub const NESTED_PARTY_ID_SOURCE: u32 = 525;
/// NestedPartyRole (538).
pub const NESTED_PARTY_ROLE: u32 = 538;
/// NoNestedPartyIDs (539).
pub const NO_NESTED_PARTY_IDS: u32 = 539;
/// MatchStatus (573).
pub const MATCH_STATUS: u32 = 573;
/// NoClearingInstructions (576).
pub const NO_CLEARING_INSTRUCTIONS: u32 = 576;
/// ClearingInstruction (577).
pub const CLEARING_INSTRUCTION: u32 = 577;
/// AllocAcctIDSource (661).
pub const ALLOC_ACCT_ID_SOURCE: u32 = 661;
/// TrdRegTimestamp (769).
pub const TRD_REG_TIMESTAMP: u32 = 769;
/// TrdRegTimestampType (770).
pub const TRD_REG_TIMESTAMP_TYPE: u32 = 770;
/// TrdRegTimestampOrigin (771).
pub const TRD_REG_TIMESTAMP_ORIGIN: u32 = 771;
/// NoTrdRegTimestamps (768).
pub const NO_TRD_REG_TIMESTAMPS: u32 = 768;
/// NoPartySubIDs (802).
pub const NO_PARTY_SUB_IDS: u32 = 802;
/// PartySubIDType (803).
pub const PARTY_SUB_ID_TYPE: u32 = 803;
/// NoNestedPartySubIDs (804).
pub const NO_NESTED_PARTY_SUB_IDS: u32 = 804;
/// NestedPartySubID (545).
pub const NESTED_PARTY_SUB_ID: u32 = 545;
/// NestedPartySubIDType (805).
pub const NESTED_PARTY_SUB_ID_TYPE: u32 = 805;
/// EventType (865).
pub const EVENT_TYPE: u32 = 865;
/// EventDate (866).
pub const EVENT_DATE: u32 = 866;
/// EventPx (867).
pub const EVENT_PX: u32 = 867;
/// EventText (868).
pub const EVENT_TEXT: u32 = 868;
/// NoEvents (864).
pub const NO_EVENTS: u32 = 864;
/// MiscFeeBasis (891).
pub const MISC_FEE_BASIS: u32 = 891;

/// FIX message type (tag 35).
///
/// Covers the session layer and the single-order management surface this
/// engine speaks; anything else round-trips through [`MsgType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgType {
    /// Heartbeat (0), session level.
    Heartbeat,
    /// Test Request (1), session level.
    TestRequest,
    /// Resend Request (2), session level.
    ResendRequest,
    /// Reject (3), session level.
    Reject,
    /// Sequence Reset (4), session level.
    SequenceReset,
    /// Logout (5), session level.
    Logout,
    /// Execution Report (8).
    ExecutionReport,
    /// Order Cancel Reject (9).
    OrderCancelReject,
    /// Logon (A), session level.
    Logon,
    /// News (B).
    News,
    /// New Order Single (D).
    NewOrderSingle,
    /// Order Cancel Request (F).
    OrderCancelRequest,
    /// Order Cancel/Replace Request (G).
    OrderCancelReplaceRequest,
    /// Order Status Request (H).
    OrderStatusRequest,
    /// Business Message Reject (j).
    BusinessMessageReject,
    /// Any other message type, carried verbatim.
    Other(String),
}

impl MsgType {
    /// Returns the wire string of this message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::ExecutionReport => "8",
            Self::OrderCancelReject => "9",
            Self::Logon => "A",
            Self::News => "B",
            Self::NewOrderSingle => "D",
            Self::OrderCancelRequest => "F",
            Self::OrderCancelReplaceRequest => "G",
            Self::OrderStatusRequest => "H",
            Self::BusinessMessageReject => "j",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Returns true for session-level (administrative) message types.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::TestRequest
                | Self::ResendRequest
                | Self::Reject
                | Self::SequenceReset
                | Self::Logout
                | Self::Logon
        )
    }

    /// Returns true for application message types.
    #[must_use]
    pub fn is_app(&self) -> bool {
        !self.is_admin()
    }
}

impl From<&str> for MsgType {
    fn from(s: &str) -> Self {
        match s {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "8" => Self::ExecutionReport,
            "9" => Self::OrderCancelReject,
            "A" => Self::Logon,
            "B" => Self::News,
            "D" => Self::NewOrderSingle,
            "F" => Self::OrderCancelRequest,
            "G" => Self::OrderCancelReplaceRequest,
            "H" => Self::OrderStatusRequest,
            "j" => Self::BusinessMessageReject,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_roundtrip() {
        for s in ["0", "1", "2", "3", "4", "5", "8", "9", "A", "D", "F", "G"] {
            assert_eq!(MsgType::from(s).as_str(), s);
        }
    }

    #[test]
    fn test_msg_type_other() {
        let mt = MsgType::from("AB");
        assert!(matches!(mt, MsgType::Other(_)));
        assert_eq!(mt.as_str(), "AB");
        assert!(mt.is_app());
    }

    #[test]
    fn test_msg_type_is_admin() {
        assert!(MsgType::Logon.is_admin());
        assert!(MsgType::Heartbeat.is_admin());
        assert!(MsgType::SequenceReset.is_admin());
        assert!(!MsgType::NewOrderSingle.is_admin());
        assert!(!MsgType::ExecutionReport.is_admin());
    }

    #[test]
    fn test_tag_constants() {
        assert_eq!(CL_ORD_ID, 11);
        assert_eq!(MSG_SEQ_NUM, 34);
        assert_eq!(NO_ALLOCS, 78);
        assert_eq!(EXEC_TYPE, 150);
    }
}
