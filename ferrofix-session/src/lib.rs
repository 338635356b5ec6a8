/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! # ferrofix-session
//!
//! FIX session layer state for the ferrofix engine.
//!
//! This crate provides:
//! - [`FixSession`]: comp-id identity and monotonic sequence counters
//! - [`SeqCheck`]: inbound sequence classification (in order / duplicate / gap)
//! - [`HeartbeatMonitor`]: heartbeat and TestRequest timing
//! - [`SessionConfig`]: per-session configuration

pub mod config;
pub mod heartbeat;
pub mod session;

pub use config::SessionConfig;
pub use heartbeat::{HeartbeatMonitor, generate_test_req_id};
pub use session::{FixSession, SeqCheck};
