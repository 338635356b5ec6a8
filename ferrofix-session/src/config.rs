/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Session configuration.

use ferrofix_core::types::CompId;
use std::time::Duration;

/// Configuration for one FIX session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Our comp id (SenderCompID, tag 49).
    pub sender_comp_id: CompId,
    /// Peer comp id (TargetCompID, tag 56).
    pub target_comp_id: CompId,
    /// Heartbeat interval offered on Logon (HeartBtInt, tag 108).
    pub heartbeat_interval: Duration,
    /// Request a sequence reset (ResetSeqNumFlag, tag 141) on Logon.
    pub reset_seq_num_on_logon: bool,
    /// How long to wait for the peer's Logon before giving up.
    pub logon_timeout: Duration,
    /// How long to wait for the peer's Logout confirmation.
    pub logout_timeout: Duration,
    /// Maximum accepted frame size in bytes.
    pub max_message_size: usize,
}

impl SessionConfig {
    /// Creates a configuration with defaults (30s heartbeat, 10s logon and
    /// logout timeouts, 1 MiB frames, no sequence reset).
    #[must_use]
    pub fn new(sender_comp_id: CompId, target_comp_id: CompId) -> Self {
        Self {
            sender_comp_id,
            target_comp_id,
            heartbeat_interval: Duration::from_secs(30),
            reset_seq_num_on_logon: false,
            logon_timeout: Duration::from_secs(10),
            logout_timeout: Duration::from_secs(10),
            max_message_size: 1024 * 1024,
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets whether Logon requests a sequence reset.
    #[must_use]
    pub const fn with_reset_seq_num_on_logon(mut self, reset: bool) -> Self {
        self.reset_seq_num_on_logon = reset;
        self
    }

    /// Sets the logon timeout.
    #[must_use]
    pub fn with_logon_timeout(mut self, timeout: Duration) -> Self {
        self.logon_timeout = timeout;
        self
    }

    /// Sets the logout timeout.
    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    /// Sets the maximum accepted frame size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Heartbeat interval in whole seconds, as carried on the wire.
    #[must_use]
    pub fn heartbeat_interval_secs(&self) -> u64 {
        self.heartbeat_interval.as_secs()
    }
}
