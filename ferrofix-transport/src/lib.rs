/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! # ferrofix-transport
//!
//! Byte transport seam and frame splitting for the ferrofix engine.
//!
//! This crate provides:
//! - [`Transport`]: the duplex byte-channel trait the engine drives
//! - [`IoTransport`]: adapter over any tokio `AsyncRead + AsyncWrite`
//! - [`FrameCodec`]: `tokio_util` codec cutting complete FIX frames

pub mod codec;
pub mod transport;

pub use codec::{FrameCodec, FrameError};
pub use transport::{IoTransport, Transport};
