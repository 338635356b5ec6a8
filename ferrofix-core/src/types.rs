/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Core value types for FIX protocol operations.
//!
//! This module provides:
//! - [`Timestamp`]: UTC timestamp with FIX wire rendering
//! - [`CompId`]: bounded component identifier (SenderCompID, TargetCompID)
//! - [`Side`], [`OrdType`], [`OrdStatus`], [`ExecType`]: order enumerations

use arrayvec::ArrayString;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for CompID strings in bytes.
pub const COMP_ID_MAX_LEN: usize = 32;

/// Wire format of SendingTime / TransactTime with millisecond precision.
pub const FIX_TIMESTAMP_FMT: &str = "%Y%m%d-%H:%M:%S%.3f";

/// UTC timestamp rendered in FIX `YYYYMMDD-HH:MM:SS.sss` format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Renders the timestamp in FIX wire format with millisecond precision.
    #[must_use]
    pub fn to_fix(&self) -> String {
        self.0.format(FIX_TIMESTAMP_FMT).to_string()
    }

    /// Parses a FIX wire timestamp, with or without the fractional part.
    ///
    /// # Arguments
    /// * `value` - Text in `YYYYMMDD-HH:MM:SS[.sss]` form
    #[must_use]
    pub fn parse_fix(value: &str) -> Option<Self> {
        let fmt = if value.contains('.') {
            "%Y%m%d-%H:%M:%S%.f"
        } else {
            "%Y%m%d-%H:%M:%S"
        };
        NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .map(|dt| Self(dt.and_utc()))
    }

    /// Returns the inner chrono value.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fix())
    }
}

/// Component identifier for FIX sessions.
///
/// Used for SenderCompID (tag 49) and TargetCompID (tag 56). Bounded to
/// [`COMP_ID_MAX_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct CompId(ArrayString<COMP_ID_MAX_LEN>);

impl CompId {
    /// Creates a new CompId, or `None` when the string exceeds the bound.
    #[must_use]
    pub fn new(s: &str) -> Option<Self> {
        ArrayString::from(s).ok().map(Self)
    }

    /// Returns the CompId as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for CompId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CompId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompId {
    type Err = arrayvec::CapacityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ArrayString::from(s)
            .map(Self)
            .map_err(|e| e.simplify())
    }
}

/// Order side (tag 54), FIX 4.4 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
    /// Buy minus.
    BuyMinus,
    /// Sell plus.
    SellPlus,
    /// Sell short.
    SellShort,
    /// Sell short exempt.
    SellShortExempt,
    /// Undisclosed.
    Undisclosed,
    /// Cross.
    Cross,
    /// Cross short.
    CrossShort,
}

impl Side {
    /// Creates a Side from its FIX character value.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::Buy),
            '2' => Some(Self::Sell),
            '3' => Some(Self::BuyMinus),
            '4' => Some(Self::SellPlus),
            '5' => Some(Self::SellShort),
            '6' => Some(Self::SellShortExempt),
            '7' => Some(Self::Undisclosed),
            '8' => Some(Self::Cross),
            '9' => Some(Self::CrossShort),
            _ => None,
        }
    }

    /// Returns the FIX character value of this side.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Buy => '1',
            Self::Sell => '2',
            Self::BuyMinus => '3',
            Self::SellPlus => '4',
            Self::SellShort => '5',
            Self::SellShortExempt => '6',
            Self::Undisclosed => '7',
            Self::Cross => '8',
            Self::CrossShort => '9',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Order type (tag 40), FIX 4.4 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrdType {
    /// Market order.
    Market,
    /// Limit order.
    Limit,
    /// Stop order.
    Stop,
    /// Stop limit order.
    StopLimit,
    /// Market with left over as limit.
    MarketWithLeftOverAsLimit,
    /// Pegged order.
    Pegged,
}

impl OrdType {
    /// Creates an OrdType from its FIX character value.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::Market),
            '2' => Some(Self::Limit),
            '3' => Some(Self::Stop),
            '4' => Some(Self::StopLimit),
            'K' => Some(Self::MarketWithLeftOverAsLimit),
            'P' => Some(Self::Pegged),
            _ => None,
        }
    }

    /// Returns the FIX character value of this order type.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Market => '1',
            Self::Limit => '2',
            Self::Stop => '3',
            Self::StopLimit => '4',
            Self::MarketWithLeftOverAsLimit => 'K',
            Self::Pegged => 'P',
        }
    }
}

impl fmt::Display for OrdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Order status (tag 39), FIX 4.4 values plus the non-wire [`Created`].
///
/// [`Created`]: OrdStatus::Created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrdStatus {
    /// Order constructed by the application, nothing sent yet. Internal
    /// status, never present on the wire.
    Created,
    /// New.
    New,
    /// Partially filled.
    PartiallyFilled,
    /// Filled.
    Filled,
    /// Done for day.
    DoneForDay,
    /// Canceled.
    Canceled,
    /// Pending cancel.
    PendingCancel,
    /// Stopped.
    Stopped,
    /// Rejected.
    Rejected,
    /// Suspended.
    Suspended,
    /// Pending new.
    PendingNew,
    /// Calculated.
    Calculated,
    /// Expired.
    Expired,
    /// Accepted for bidding.
    AcceptedForBidding,
    /// Pending replace.
    PendingReplace,
}

impl OrdStatus {
    /// Creates an OrdStatus from its FIX character value.
    ///
    /// `'Z'` maps to the internal [`OrdStatus::Created`].
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'Z' => Some(Self::Created),
            '0' => Some(Self::New),
            '1' => Some(Self::PartiallyFilled),
            '2' => Some(Self::Filled),
            '3' => Some(Self::DoneForDay),
            '4' => Some(Self::Canceled),
            '6' => Some(Self::PendingCancel),
            '7' => Some(Self::Stopped),
            '8' => Some(Self::Rejected),
            '9' => Some(Self::Suspended),
            'A' => Some(Self::PendingNew),
            'B' => Some(Self::Calculated),
            'C' => Some(Self::Expired),
            'D' => Some(Self::AcceptedForBidding),
            'E' => Some(Self::PendingReplace),
            _ => None,
        }
    }

    /// Returns the FIX character value of this status.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Created => 'Z',
            Self::New => '0',
            Self::PartiallyFilled => '1',
            Self::Filled => '2',
            Self::DoneForDay => '3',
            Self::Canceled => '4',
            Self::PendingCancel => '6',
            Self::Stopped => '7',
            Self::Rejected => '8',
            Self::Suspended => '9',
            Self::PendingNew => 'A',
            Self::Calculated => 'B',
            Self::Expired => 'C',
            Self::AcceptedForBidding => 'D',
            Self::PendingReplace => 'E',
        }
    }

    /// Returns true for statuses from which the order cannot move again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired
        )
    }

    /// Returns true for the pending acknowledgement statuses.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(
            self,
            Self::PendingNew | Self::PendingCancel | Self::PendingReplace
        )
    }
}

impl fmt::Display for OrdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Execution type (tag 150), FIX 4.4 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecType {
    /// New.
    New,
    /// Done for day.
    DoneForDay,
    /// Canceled.
    Canceled,
    /// Replaced.
    Replaced,
    /// Pending cancel.
    PendingCancel,
    /// Stopped.
    Stopped,
    /// Rejected.
    Rejected,
    /// Suspended.
    Suspended,
    /// Pending new.
    PendingNew,
    /// Calculated.
    Calculated,
    /// Expired.
    Expired,
    /// Restated.
    Restated,
    /// Pending replace.
    PendingReplace,
    /// Trade (partial fill or fill).
    Trade,
    /// Trade correct.
    TradeCorrect,
    /// Trade cancel.
    TradeCancel,
    /// Order status.
    OrderStatus,
}

impl ExecType {
    /// Creates an ExecType from its FIX character value.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::New),
            '3' => Some(Self::DoneForDay),
            '4' => Some(Self::Canceled),
            '5' => Some(Self::Replaced),
            '6' => Some(Self::PendingCancel),
            '7' => Some(Self::Stopped),
            '8' => Some(Self::Rejected),
            '9' => Some(Self::Suspended),
            'A' => Some(Self::PendingNew),
            'B' => Some(Self::Calculated),
            'C' => Some(Self::Expired),
            'D' => Some(Self::Restated),
            'E' => Some(Self::PendingReplace),
            'F' => Some(Self::Trade),
            'G' => Some(Self::TradeCorrect),
            'H' => Some(Self::TradeCancel),
            'I' => Some(Self::OrderStatus),
            _ => None,
        }
    }

    /// Returns the FIX character value of this execution type.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::New => '0',
            Self::DoneForDay => '3',
            Self::Canceled => '4',
            Self::Replaced => '5',
            Self::PendingCancel => '6',
            Self::Stopped => '7',
            Self::Rejected => '8',
            Self::Suspended => '9',
            Self::PendingNew => 'A',
            Self::Calculated => 'B',
            Self::Expired => 'C',
            Self::Restated => 'D',
            Self::PendingReplace => 'E',
            Self::Trade => 'F',
            Self::TradeCorrect => 'G',
            Self::TradeCancel => 'H',
            Self::OrderStatus => 'I',
        }
    }
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip() {
        let ts = Timestamp::parse_fix("20260802-12:30:45.123").unwrap();
        assert_eq!(ts.to_fix(), "20260802-12:30:45.123");
    }

    #[test]
    fn test_timestamp_no_fraction() {
        let ts = Timestamp::parse_fix("20260802-12:30:45").unwrap();
        assert_eq!(ts.to_fix(), "20260802-12:30:45.000");
    }

    #[test]
    fn test_timestamp_invalid() {
        assert!(Timestamp::parse_fix("2026-08-02").is_none());
        assert!(Timestamp::parse_fix("garbage").is_none());
    }

    #[test]
    fn test_comp_id() {
        let id = CompId::new("SENDER").unwrap();
        assert_eq!(id.as_str(), "SENDER");
        assert!(CompId::new(&"A".repeat(COMP_ID_MAX_LEN + 1)).is_none());
    }

    #[test]
    fn test_side_chars() {
        assert_eq!(Side::from_char('1'), Some(Side::Buy));
        assert_eq!(Side::from_char('2'), Some(Side::Sell));
        assert_eq!(Side::from_char('X'), None);
        assert_eq!(Side::Sell.as_char(), '2');
        assert_eq!(Side::Buy.to_string(), "1");
    }

    #[test]
    fn test_ord_status_chars() {
        assert_eq!(OrdStatus::from_char('Z'), Some(OrdStatus::Created));
        assert_eq!(OrdStatus::from_char('A'), Some(OrdStatus::PendingNew));
        assert_eq!(OrdStatus::PendingReplace.as_char(), 'E');
        for c in ['0', '1', '2', '4', '6', '8', '9', 'A', 'C', 'E'] {
            let st = OrdStatus::from_char(c).unwrap();
            assert_eq!(st.as_char(), c);
        }
    }

    #[test]
    fn test_ord_status_terminal() {
        assert!(OrdStatus::Filled.is_terminal());
        assert!(OrdStatus::Canceled.is_terminal());
        assert!(OrdStatus::Rejected.is_terminal());
        assert!(OrdStatus::Expired.is_terminal());
        assert!(!OrdStatus::New.is_terminal());
        assert!(!OrdStatus::PendingCancel.is_terminal());
    }

    #[test]
    fn test_ord_status_pending() {
        assert!(OrdStatus::PendingNew.is_pending());
        assert!(OrdStatus::PendingCancel.is_pending());
        assert!(OrdStatus::PendingReplace.is_pending());
        assert!(!OrdStatus::New.is_pending());
    }

    #[test]
    fn test_exec_type_chars() {
        assert_eq!(ExecType::from_char('F'), Some(ExecType::Trade));
        assert_eq!(ExecType::from_char('5'), Some(ExecType::Replaced));
        assert_eq!(ExecType::Rejected.as_char(), '8');
    }

    #[test]
    fn test_ord_type_chars() {
        assert_eq!(OrdType::from_char('1'), Some(OrdType::Market));
        assert_eq!(OrdType::from_char('2'), Some(OrdType::Limit));
        assert_eq!(OrdType::Limit.as_char(), '2');
    }
}
