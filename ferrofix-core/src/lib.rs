/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! # ferrofix-core
//!
//! Core building blocks for the ferrofix FIX 4.4 engine.
//!
//! This crate provides:
//! - **Message containers**: [`FixMessage`]/[`FixContainer`] with nested
//!   repeating groups
//! - **Catalog**: tag constants and [`MsgType`] in [`tags`]
//! - **Value types**: [`Timestamp`], [`CompId`] and the order enumerations
//! - **Errors**: the unified [`FixError`] hierarchy

pub mod error;
pub mod message;
pub mod tags;
pub mod types;

pub use error::{
    DecodeError, EncodeError, FixError, JournalError, MessageError, Result, SchemaError,
    SessionError,
};
pub use message::{FieldEntry, FixContainer, FixMessage};
pub use tags::MsgType;
pub use types::{CompId, ExecType, OrdStatus, OrdType, Side, Timestamp};
