/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! # ferrofix-engine
//!
//! The connection engine of the ferrofix FIX 4.4 stack.
//!
//! This crate provides:
//! - [`FixConnection`]: the per-connection state machine wiring transport
//!   bytes, the wire codec, session rules, the journal and the application
//! - [`ConnectionEvents`]: the async callback seam with no-op defaults
//! - [`ConnectionState`] / [`ConnectionRole`]: the observable lifecycle

pub mod connection;
pub mod events;
pub mod state;

pub use connection::FixConnection;
pub use events::{ConnectionEvents, NullEvents};
pub use state::{ConnectionRole, ConnectionState};
