/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Client-side single-order lifecycle.
//!
//! [`NewOrderSingle`] owns one order through its request/acknowledge cycle:
//! it emits NewOrderSingle (35=D), OrderCancelRequest (35=F) and
//! OrderCancelReplaceRequest (35=G) messages, and consumes ExecutionReport
//! (35=8) and OrderCancelReject (35=9) messages against the FIX 4.4
//! order-state-change matrix.
//!
//! Wire ClOrdID values are derived from the order's root id as
//! `root--counter`; the counter advances on every new/cancel/replace request.

use ferrofix_core::error::{FixError, SessionError};
use ferrofix_core::message::FixMessage;
use ferrofix_core::tags::{self, MsgType};
use ferrofix_core::types::{ExecType, OrdStatus, OrdType, Side, Timestamp};

/// Default account (tag 1) used when none is given.
const DEFAULT_ACCOUNT: &str = "000000";

/// Client-side state of a single order.
#[derive(Debug, Clone)]
pub struct NewOrderSingle {
    /// Current wire ClOrdID (`root--counter` once a request was emitted).
    clord_id: String,
    /// Root the ClOrdID chain is derived from.
    clord_id_root: String,
    /// Previous ClOrdID during a cancel/replace cycle.
    orig_clord_id: Option<String>,
    clord_id_counter: u64,
    /// Instrument ticker placed into Symbol (55).
    pub ticker: String,
    /// Order side (54).
    pub side: Side,
    /// Limit price (44).
    pub price: f64,
    /// Order quantity (38).
    pub qty: f64,
    /// Order type (40).
    pub ord_type: OrdType,
    /// Account (1).
    pub account: String,
    /// Decision price the order was placed against (defaults to `price`).
    pub target_price: f64,
    status: OrdStatus,
    /// Quantity still working at the counterparty (151).
    pub leaves_qty: f64,
    /// Cumulative executed quantity (14).
    pub cum_qty: f64,
    /// Average fill price (6); NaN until the first report.
    pub avg_px: f64,
    /// Counterparty OrderID (37) once assigned.
    pub order_id: Option<String>,
}

impl NewOrderSingle {
    /// Creates an order in the internal `Created` status.
    ///
    /// # Arguments
    /// * `clord_id_root` - Root for the ClOrdID chain
    /// * `ticker` - Instrument ticker (Symbol, 55)
    /// * `side` - Order side
    /// * `price` - Limit price
    /// * `qty` - Order quantity
    #[must_use]
    pub fn new(
        clord_id_root: impl Into<String>,
        ticker: impl Into<String>,
        side: Side,
        price: f64,
        qty: f64,
    ) -> Self {
        let root = clord_id_root.into();
        Self {
            clord_id: root.clone(),
            clord_id_root: root,
            orig_clord_id: None,
            clord_id_counter: 0,
            ticker: ticker.into(),
            side,
            price,
            qty,
            ord_type: OrdType::Limit,
            account: DEFAULT_ACCOUNT.to_string(),
            target_price: price,
            status: OrdStatus::Created,
            leaves_qty: 0.0,
            cum_qty: 0.0,
            avg_px: f64::NAN,
            order_id: None,
        }
    }

    /// Sets the order type (defaults to Limit).
    #[must_use]
    pub fn with_ord_type(mut self, ord_type: OrdType) -> Self {
        self.ord_type = ord_type;
        self
    }

    /// Sets the account (defaults to "000000").
    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Sets the decision price (defaults to the limit price).
    #[must_use]
    pub fn with_target_price(mut self, target_price: f64) -> Self {
        self.target_price = target_price;
        self
    }

    /// Current order status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> OrdStatus {
        self.status
    }

    /// Current wire ClOrdID.
    #[inline]
    #[must_use]
    pub fn clord_id(&self) -> &str {
        &self.clord_id
    }

    /// Root of the ClOrdID chain.
    #[inline]
    #[must_use]
    pub fn clord_id_root(&self) -> &str {
        &self.clord_id_root
    }

    /// Previous ClOrdID while a cancel/replace is pending.
    #[inline]
    #[must_use]
    pub fn orig_clord_id(&self) -> Option<&str> {
        self.orig_clord_id.as_deref()
    }

    /// Derives the next ClOrdID in the chain and advances the counter.
    pub fn clord_next(&mut self) -> String {
        self.clord_id_counter += 1;
        format!("{}--{}", self.clord_id_root, self.clord_id_counter)
    }

    /// Strips the `--counter` suffix from a wire ClOrdID.
    #[must_use]
    pub fn clord_root(clord_id: &str) -> &str {
        if let Some(pos) = clord_id.rfind("--") {
            let suffix = &clord_id[pos + 2..];
            if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
                return &clord_id[..pos];
            }
        }
        clord_id
    }

    /// Returns true when the order reached a terminal status.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true when a cancel request may be issued.
    #[must_use]
    pub fn can_cancel(&self) -> bool {
        matches!(
            self.status,
            OrdStatus::New | OrdStatus::PartiallyFilled | OrdStatus::Suspended
        )
    }

    /// Returns true when a cancel/replace request may be issued.
    #[must_use]
    pub fn can_replace(&self) -> bool {
        self.can_cancel()
    }

    /// Emits the NewOrderSingle (35=D) request and moves to PendingNew.
    ///
    /// # Errors
    /// [`SessionError::InvalidOrderState`] unless the order is in `Created`.
    pub fn new_req(&mut self) -> Result<FixMessage, FixError> {
        if self.status != OrdStatus::Created {
            return Err(SessionError::InvalidOrderState {
                operation: "new_req".to_string(),
                status: self.status.as_char(),
            }
            .into());
        }

        self.clord_id = self.clord_next();

        let mut msg = FixMessage::new(MsgType::NewOrderSingle);
        msg.set(tags::CL_ORD_ID, &self.clord_id)?;
        msg.set(tags::ACCOUNT, &self.account)?;
        msg.set(tags::SYMBOL, &self.ticker)?;
        msg.set(tags::SIDE, self.side.as_char())?;
        msg.set(tags::TRANSACT_TIME, Timestamp::now().to_fix())?;
        msg.set(tags::ORD_TYPE, self.ord_type.as_char())?;
        msg.set(tags::PRICE, self.price)?;
        msg.set(tags::ORDER_QTY, self.qty)?;

        self.status = OrdStatus::PendingNew;
        Ok(msg)
    }

    /// Emits an OrderCancelRequest (35=F) and moves to PendingCancel.
    ///
    /// # Errors
    /// [`SessionError::InvalidOrderState`] unless [`Self::can_cancel`].
    pub fn cancel_req(&mut self) -> Result<FixMessage, FixError> {
        if !self.can_cancel() {
            return Err(SessionError::InvalidOrderState {
                operation: "cancel_req".to_string(),
                status: self.status.as_char(),
            }
            .into());
        }

        self.orig_clord_id = Some(self.clord_id.clone());
        self.clord_id = self.clord_next();

        let mut msg = FixMessage::new(MsgType::OrderCancelRequest);
        msg.set(tags::CL_ORD_ID, &self.clord_id)?;
        msg.set(tags::ORIG_CL_ORD_ID, self.orig_clord_id.as_deref().unwrap_or_default())?;
        msg.set(tags::SYMBOL, &self.ticker)?;
        msg.set(tags::SIDE, self.side.as_char())?;
        msg.set(tags::TRANSACT_TIME, Timestamp::now().to_fix())?;
        msg.set(tags::ORDER_QTY, self.qty)?;

        self.status = OrdStatus::PendingCancel;
        Ok(msg)
    }

    /// Emits an OrderCancelReplaceRequest (35=G) and moves to PendingReplace.
    ///
    /// At least one of `price` / `qty` must change.
    ///
    /// # Errors
    /// [`SessionError::InvalidOrderState`] unless [`Self::can_replace`] and a
    /// change was requested.
    pub fn replace_req(
        &mut self,
        price: Option<f64>,
        qty: Option<f64>,
    ) -> Result<FixMessage, FixError> {
        if !self.can_replace() {
            return Err(SessionError::InvalidOrderState {
                operation: "replace_req".to_string(),
                status: self.status.as_char(),
            }
            .into());
        }
        let new_price = price.unwrap_or(self.price);
        let new_qty = qty.unwrap_or(self.qty);
        if new_price == self.price && new_qty == self.qty {
            return Err(SessionError::InvalidOrderState {
                operation: "replace_req without changes".to_string(),
                status: self.status.as_char(),
            }
            .into());
        }

        self.orig_clord_id = Some(self.clord_id.clone());
        self.clord_id = self.clord_next();

        let mut msg = FixMessage::new(MsgType::OrderCancelReplaceRequest);
        msg.set(tags::CL_ORD_ID, &self.clord_id)?;
        msg.set(tags::ORIG_CL_ORD_ID, self.orig_clord_id.as_deref().unwrap_or_default())?;
        msg.set(tags::SYMBOL, &self.ticker)?;
        msg.set(tags::SIDE, self.side.as_char())?;
        msg.set(tags::TRANSACT_TIME, Timestamp::now().to_fix())?;
        msg.set(tags::ORD_TYPE, self.ord_type.as_char())?;
        msg.set(tags::PRICE, new_price)?;
        msg.set(tags::ORDER_QTY, new_qty)?;

        self.status = OrdStatus::PendingReplace;
        Ok(msg)
    }

    /// Pure transition function over the order-state table.
    ///
    /// # Arguments
    /// * `status` - Current order status
    /// * `msg_type` - Driving message type (35=8 or 35=9)
    /// * `exec_type` - ExecType (150) for execution reports
    /// * `report_status` - OrdStatus (39) carried by the report
    ///
    /// # Returns
    /// - `Ok(Some(status))` - transition applies
    /// - `Ok(None)` - report is absorbed without a status change
    ///
    /// # Errors
    /// [`SessionError::IllegalTransition`] for pairs outside the table,
    /// [`SessionError::UnexpectedMsgType`] for other message types.
    pub fn change_status(
        status: OrdStatus,
        msg_type: &MsgType,
        exec_type: Option<ExecType>,
        report_status: OrdStatus,
    ) -> Result<Option<OrdStatus>, FixError> {
        use OrdStatus::*;

        let illegal = || -> FixError {
            SessionError::IllegalTransition {
                status: status.as_char(),
                msg_type: msg_type.as_str().to_string(),
                report_status: report_status.as_char(),
            }
            .into()
        };

        match msg_type {
            MsgType::ExecutionReport => {
                let next = match status {
                    Created => match report_status {
                        PendingNew | Rejected => Some(report_status),
                        _ => return Err(illegal()),
                    },
                    PendingNew => match report_status {
                        New | PartiallyFilled | Filled | Canceled | Rejected | Suspended => {
                            Some(report_status)
                        }
                        // duplicate PendingNew ack is absorbed
                        PendingNew => None,
                        _ => return Err(illegal()),
                    },
                    New => match report_status {
                        New => None,
                        PartiallyFilled | Filled | DoneForDay | Canceled | PendingCancel
                        | Stopped | Rejected | Suspended | Calculated | Expired
                        | PendingReplace => Some(report_status),
                        _ => return Err(illegal()),
                    },
                    PartiallyFilled => match report_status {
                        PartiallyFilled | Filled | Canceled | PendingCancel | Stopped
                        | Suspended | Expired | PendingReplace => Some(report_status),
                        _ => return Err(illegal()),
                    },
                    Suspended => match report_status {
                        New | PartiallyFilled | Canceled => Some(report_status),
                        Suspended => None,
                        _ => return Err(illegal()),
                    },
                    PendingCancel => match report_status {
                        Canceled => Some(Canceled),
                        Created => return Err(illegal()),
                        // cancel pending: everything else waits for the ack
                        _ => None,
                    },
                    PendingReplace => {
                        if exec_type == Some(ExecType::Replaced) {
                            match report_status {
                                New | PartiallyFilled | Filled | Canceled => Some(report_status),
                                _ => return Err(illegal()),
                            }
                        } else {
                            match report_status {
                                Created | AcceptedForBidding => return Err(illegal()),
                                // replace pending: wait for the matching ack
                                _ => None,
                            }
                        }
                    }
                    // terminal and dormant statuses ignore late reports
                    Filled | Canceled | Rejected | Expired | DoneForDay | Stopped
                    | Calculated | AcceptedForBidding => None,
                };
                Ok(next)
            }
            MsgType::OrderCancelReject => match report_status {
                Created | AcceptedForBidding => Err(illegal()),
                s => Ok(Some(s)),
            },
            other => Err(SessionError::UnexpectedMsgType {
                msg_type: other.as_str().to_string(),
            }
            .into()),
        }
    }

    /// Applies an ExecutionReport (35=8) to the order.
    ///
    /// Updates order_id (37), leaves_qty (151), cum_qty (14) and avg_px (6);
    /// a Replaced report also adopts the confirmed price/qty and collapses
    /// the ClOrdID chain.
    ///
    /// # Returns
    /// `1` when the status changed, `0` when the report was absorbed.
    ///
    /// # Errors
    /// Message-type, ClOrdID and transition violations.
    pub fn process_execution_report(&mut self, msg: &FixMessage) -> Result<i32, FixError> {
        if msg.msg_type() != &MsgType::ExecutionReport {
            return Err(SessionError::UnexpectedMsgType {
                msg_type: msg.msg_type().as_str().to_string(),
            }
            .into());
        }

        let clord_id = msg.get(tags::CL_ORD_ID)?;
        if clord_id != self.clord_id && Some(clord_id) != self.orig_clord_id.as_deref() {
            return Err(SessionError::ClOrdIdMismatch {
                expected: self.clord_id.clone(),
                orig: self.orig_clord_id.clone(),
                received: clord_id.to_string(),
            }
            .into());
        }

        let exec_type = ExecType::from_char(msg.get_char(tags::EXEC_TYPE)?).ok_or_else(|| {
            SessionError::UnexpectedMsgType {
                msg_type: format!("unknown ExecType in {}", msg),
            }
        })?;
        let report_status =
            OrdStatus::from_char(msg.get_char(tags::ORD_STATUS)?).ok_or_else(|| {
                SessionError::UnexpectedMsgType {
                    msg_type: format!("unknown OrdStatus in {}", msg),
                }
            })?;

        let new_status =
            Self::change_status(self.status, msg.msg_type(), Some(exec_type), report_status)?;

        if let Ok(order_id) = msg.get(tags::ORDER_ID) {
            self.order_id = Some(order_id.to_string());
        }

        if exec_type == ExecType::Replaced {
            // replace confirmed: adopt the new terms and collapse the chain
            if let Ok(price) = msg.get_parsed::<f64>(tags::PRICE) {
                self.price = price;
            }
            if let Ok(qty) = msg.get_parsed::<f64>(tags::ORDER_QTY) {
                self.qty = qty;
            }
            self.clord_id = clord_id.to_string();
            self.orig_clord_id = None;
        }

        self.leaves_qty = msg.get_parsed(tags::LEAVES_QTY)?;
        self.cum_qty = msg.get_parsed(tags::CUM_QTY)?;
        if let Ok(avg_px) = msg.get_parsed::<f64>(tags::AVG_PX) {
            self.avg_px = avg_px;
        }

        match new_status {
            Some(status) => {
                tracing::debug!(clord_id = %self.clord_id, from = %self.status, to = %status, "order status change");
                self.status = status;
                if !status.is_pending() {
                    self.orig_clord_id = None;
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Applies an OrderCancelReject (35=9), reverting a pending cancel or
    /// replace to the OrdStatus (39) the reject reports.
    ///
    /// # Returns
    /// `1` when the status changed, `0` when nothing changed.
    ///
    /// # Errors
    /// Message-type, ClOrdID and transition violations.
    pub fn process_cancel_reject(&mut self, msg: &FixMessage) -> Result<i32, FixError> {
        if msg.msg_type() != &MsgType::OrderCancelReject {
            return Err(SessionError::UnexpectedMsgType {
                msg_type: msg.msg_type().as_str().to_string(),
            }
            .into());
        }

        let clord_id = msg.get(tags::CL_ORD_ID)?;
        if clord_id != self.clord_id {
            return Err(SessionError::ClOrdIdMismatch {
                expected: self.clord_id.clone(),
                orig: self.orig_clord_id.clone(),
                received: clord_id.to_string(),
            }
            .into());
        }

        let report_status =
            OrdStatus::from_char(msg.get_char(tags::ORD_STATUS)?).ok_or_else(|| {
                SessionError::UnexpectedMsgType {
                    msg_type: format!("unknown OrdStatus in {}", msg),
                }
            })?;

        let new_status = Self::change_status(self.status, msg.msg_type(), None, report_status)?;

        match new_status {
            Some(status) => {
                let changed = status != self.status;
                self.status = status;
                if !status.is_pending() {
                    self.orig_clord_id = None;
                }
                Ok(i32::from(changed))
            }
            None => Ok(0),
        }
    }
}
