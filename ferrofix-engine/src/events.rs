/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Application callback seam.
//!
//! The connection engine reports its lifecycle and delivers business
//! messages through [`ConnectionEvents`]. Callbacks run inline on the
//! connection's reader task; long work belongs on a separate task.

use crate::state::ConnectionState;
use async_trait::async_trait;
use ferrofix_core::message::FixMessage;

/// Callbacks from the connection engine into the application.
///
/// All methods default to no-ops; `should_replay` defaults to replaying
/// every application message.
#[async_trait]
pub trait ConnectionEvents: Send + Sync {
    /// The network connection is established, before any Logon.
    async fn on_connect(&self) {}

    /// The connection is gone, cleanly or not; see the state for which.
    async fn on_disconnect(&self) {}

    /// Logon handshake finished. `is_healthy` is false when the session had
    /// to chase an inbound gap before reaching the active state.
    async fn on_logon(&self, is_healthy: bool) {
        let _ = is_healthy;
    }

    /// Peer Logout (35=5) arrived.
    async fn on_logout(&self, msg: &FixMessage) {
        let _ = msg;
    }

    /// An application message arrived in order and was journaled.
    async fn on_message(&self, msg: &FixMessage) {
        let _ = msg;
    }

    /// The connection state changed.
    async fn on_state_change(&self, state: ConnectionState) {
        let _ = state;
    }

    /// Decides whether a journaled application message is rebroadcast for a
    /// peer ResendRequest; returning false substitutes a gap fill.
    async fn should_replay(&self, msg: &FixMessage) -> bool {
        let _ = msg;
        true
    }
}

/// Events sink that keeps every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

#[async_trait]
impl ConnectionEvents for NullEvents {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_events_defaults() {
        let events = NullEvents;
        events.on_connect().await;
        events.on_logon(true).await;
        let msg = FixMessage::new("D");
        assert!(events.should_replay(&msg).await);
        events.on_state_change(ConnectionState::Active).await;
    }
}
