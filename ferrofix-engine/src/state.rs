/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Connection states and roles.

use std::fmt;

/// Lifecycle state of one FIX connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connection object exists, nothing has happened yet.
    Unknown,
    /// Disconnected, never connected during this trading day.
    DisconnectedNoConnToday,
    /// Disconnected cleanly after a connection earlier today.
    DisconnectedWConnToday,
    /// Disconnected by an unexpected drop or protocol violation.
    DisconnectedBrokenConn,
    /// Network connection is being established.
    NetworkConnInitiated,
    /// Network connection is up, no Logon exchanged yet.
    NetworkConnEstablished,
    /// Initiator sent its Logon and awaits the response.
    LogonInitialSent,
    /// Acceptor received the initiating Logon.
    LogonInitialRecv,
    /// Initiator received the Logon response.
    LogonResponse,
    /// Inbound gap detected; awaiting the peer's resend.
    ResendReqAwaiting,
    /// Session fully established.
    Active,
    /// TestRequest unanswered; connection presumed lost.
    AwaitingConnectionRestore,
    /// Our Logout is out; awaiting the peer's confirmation.
    LogoutPending,
}

impl ConnectionState {
    /// Returns true for the disconnected terminal states.
    #[must_use]
    pub const fn is_disconnected(self) -> bool {
        matches!(
            self,
            Self::DisconnectedNoConnToday
                | Self::DisconnectedWConnToday
                | Self::DisconnectedBrokenConn
        )
    }

    /// Returns true while the Logon handshake is in flight.
    #[must_use]
    pub const fn is_logon_phase(self) -> bool {
        matches!(
            self,
            Self::LogonInitialSent | Self::LogonInitialRecv | Self::LogonResponse
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "UNKNOWN",
            Self::DisconnectedNoConnToday => "DISCONNECTED_NOCONN_TODAY",
            Self::DisconnectedWConnToday => "DISCONNECTED_WCONN_TODAY",
            Self::DisconnectedBrokenConn => "DISCONNECTED_BROKEN_CONN",
            Self::NetworkConnInitiated => "NETWORK_CONN_INITIATED",
            Self::NetworkConnEstablished => "NETWORK_CONN_ESTABLISHED",
            Self::LogonInitialSent => "LOGON_INITIAL_SENT",
            Self::LogonInitialRecv => "LOGON_INITIAL_RECV",
            Self::LogonResponse => "LOGON_RESPONSE",
            Self::ResendReqAwaiting => "RESENDREQ_AWAITING",
            Self::Active => "ACTIVE",
            Self::AwaitingConnectionRestore => "AWAITING_CONNECTION_RESTORE",
            Self::LogoutPending => "LOGOUT_PENDING",
        };
        write!(f, "{name}")
    }
}

/// Which side of the Logon handshake this connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Sends the Logon first.
    Initiator,
    /// Waits for the Logon and mirrors it.
    Acceptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_classification() {
        assert!(ConnectionState::DisconnectedBrokenConn.is_disconnected());
        assert!(ConnectionState::DisconnectedWConnToday.is_disconnected());
        assert!(!ConnectionState::Active.is_disconnected());
        assert!(!ConnectionState::Unknown.is_disconnected());
    }

    #[test]
    fn test_logon_phase_classification() {
        assert!(ConnectionState::LogonInitialSent.is_logon_phase());
        assert!(ConnectionState::LogonInitialRecv.is_logon_phase());
        assert!(!ConnectionState::Active.is_logon_phase());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ConnectionState::Active.to_string(), "ACTIVE");
        assert_eq!(
            ConnectionState::ResendReqAwaiting.to_string(),
            "RESENDREQ_AWAITING"
        );
    }
}
