/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! # ferrofix-store
//!
//! Message journaling for the ferrofix engine.
//!
//! This crate provides:
//! - [`Journal`]: async trait over keyed storage with insert-if-absent rows
//!   (session, direction, sequence number)
//! - [`MemoryJournal`]: the in-process implementation
//! - [`find_seq_no`]: MsgSeqNum extraction from encoded frames

pub mod journal;
pub mod memory;

pub use journal::{Direction, Journal, find_seq_no};
pub use memory::MemoryJournal;
