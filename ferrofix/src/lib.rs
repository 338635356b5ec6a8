/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! # ferrofix
//!
//! A FIX 4.4 protocol engine for Rust.
//!
//! ferrofix implements the four coupled subsystems of a FIX session stack:
//! the tag=value message model and wire codec (with nested repeating
//! groups, checksum and BodyLength framing), a QuickFIX-dictionary schema
//! validator, the logon/heartbeat/resend/disconnect session engine with
//! journaled sequence numbers, and the client-side single-order state
//! machine.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ferrofix::prelude::*;
//! use std::sync::Arc;
//!
//! let config = SessionConfig::new(
//!     CompId::new("ME").unwrap(),
//!     CompId::new("BROKER").unwrap(),
//! );
//! let journal = Arc::new(MemoryJournal::new());
//! let transport = Box::new(IoTransport::connect("broker:9876").await?);
//! let mut conn =
//!     FixConnection::initiator(config, journal, transport, NullEvents).await?;
//! conn.run().await?;
//! ```
//!
//! ## Crate organization
//!
//! - [`core`]: message containers, tag catalog, value types, errors
//! - [`protocol`]: FIX 4.4 profile and the order state machine
//! - [`session`]: session identity, sequence counters, heartbeat timing
//! - [`tagvalue`]: the wire codec and checksum helpers
//! - [`dictionary`]: schema loading and message validation
//! - [`store`]: the message journal
//! - [`transport`]: the byte-channel seam and frame splitting
//! - [`engine`]: the connection state machine

pub mod core {
    //! Message containers, tag catalog, value types and errors.
    pub use ferrofix_core::*;
}

pub mod protocol {
    //! FIX 4.4 profile and order management.
    pub use ferrofix_protocol::*;
}

pub mod session {
    //! Session identity, sequence counters and heartbeat timing.
    pub use ferrofix_session::*;
}

pub mod tagvalue {
    //! Tag=value wire codec and checksum helpers.
    pub use ferrofix_tagvalue::*;
}

pub mod dictionary {
    //! Schema loading and message validation.
    pub use ferrofix_dictionary::*;
}

pub mod store {
    //! Message journaling.
    pub use ferrofix_store::*;
}

pub mod transport {
    //! Byte transport seam and frame splitting.
    pub use ferrofix_transport::*;
}

pub mod engine {
    //! The connection state machine.
    pub use ferrofix_engine::*;
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use ferrofix_core::{
        CompId, ExecType, FieldEntry, FixContainer, FixError, FixMessage, MsgType, OrdStatus,
        OrdType, Result, Side, Timestamp, tags,
    };
    pub use ferrofix_dictionary::{FixSchema, load_schema};
    pub use ferrofix_engine::{
        ConnectionEvents, ConnectionRole, ConnectionState, FixConnection, NullEvents,
    };
    pub use ferrofix_protocol::{Fix44Protocol, NewOrderSingle};
    pub use ferrofix_session::{FixSession, HeartbeatMonitor, SeqCheck, SessionConfig};
    pub use ferrofix_store::{Direction, Journal, MemoryJournal, find_seq_no};
    pub use ferrofix_tagvalue::{Codec, Decoded, calculate_checksum};
    pub use ferrofix_transport::{FrameCodec, IoTransport, Transport};
}
