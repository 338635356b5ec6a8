/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! # ferrofix-tagvalue
//!
//! Tag=value wire codec for the ferrofix engine.
//!
//! This crate provides:
//! - [`Codec`]: encode with framing/sequence ownership, group-aware decode
//! - [`checksum`]: sum-mod-256 checksum helpers
//! - [`Decoded`]: one-frame decode result (message, consumed, raw bytes)

pub mod checksum;
pub mod codec;

pub use checksum::{calculate_checksum, format_checksum, parse_checksum};
pub use codec::{Codec, Decoded, SOH};
