/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Heartbeat and TestRequest timing.
//!
//! The monitor tracks when frames were last exchanged and decides when the
//! connection engine should emit a Heartbeat, escalate to a TestRequest, or
//! give the connection up. The inbound grace window is 20% of the heartbeat
//! period, covering reasonable transmission time.

use std::time::{Duration, Instant};

/// Tracks heartbeat timing for one connection.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    last_sent: Instant,
    last_received: Instant,
    pending_test_req: Option<String>,
    test_req_sent_at: Option<Instant>,
}

impl HeartbeatMonitor {
    /// Creates a monitor with the given heartbeat interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            last_sent: now,
            last_received: now,
            pending_test_req: None,
            test_req_sent_at: None,
        }
    }

    /// Returns the heartbeat interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Adopts a new interval, e.g. the HeartBtInt (108) from a peer Logon.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Transmission grace added to the inbound silence window.
    #[must_use]
    pub fn grace(&self) -> Duration {
        self.interval / 5
    }

    /// Records an outbound frame.
    #[inline]
    pub fn on_message_sent(&mut self) {
        self.last_sent = Instant::now();
    }

    /// Records an inbound frame; a Heartbeat carrying the pending TestReqID
    /// clears the outstanding TestRequest.
    ///
    /// # Arguments
    /// * `is_heartbeat` - Whether the frame is a Heartbeat (35=0)
    /// * `test_req_id` - TestReqID (112) on the frame, when present
    pub fn on_message_received(&mut self, is_heartbeat: bool, test_req_id: Option<&str>) {
        self.last_received = Instant::now();

        if is_heartbeat
            && let (Some(pending), Some(received)) = (&self.pending_test_req, test_req_id)
            && pending == received
        {
            self.pending_test_req = None;
            self.test_req_sent_at = None;
        }
    }

    /// Records that a TestRequest went out.
    pub fn on_test_request_sent(&mut self, test_req_id: String) {
        self.pending_test_req = Some(test_req_id);
        self.test_req_sent_at = Some(Instant::now());
        self.last_sent = Instant::now();
    }

    /// The outstanding TestReqID, when one is pending.
    #[must_use]
    pub fn pending_test_request(&self) -> Option<&str> {
        self.pending_test_req.as_deref()
    }

    /// True when nothing went out for a full interval.
    #[must_use]
    pub fn should_send_heartbeat(&self) -> bool {
        self.last_sent.elapsed() >= self.interval
    }

    /// True when nothing came in for an interval plus grace and no
    /// TestRequest is already outstanding.
    #[must_use]
    pub fn should_send_test_request(&self) -> bool {
        if self.pending_test_req.is_some() {
            return false;
        }
        self.last_received.elapsed() >= self.interval + self.grace()
    }

    /// True when an outstanding TestRequest went unanswered for another
    /// interval.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.test_req_sent_at
            .is_some_and(|sent_at| sent_at.elapsed() >= self.interval)
    }

    /// Milliseconds since the last inbound frame.
    #[must_use]
    pub fn silence_ms(&self) -> u64 {
        self.last_received.elapsed().as_millis() as u64
    }

    /// Resets all timing state, e.g. after reconnect.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_sent = now;
        self.last_received = now;
        self.pending_test_req = None;
        self.test_req_sent_at = None;
    }
}

/// Generates a unique TestReqID from the current wall clock.
#[must_use]
pub fn generate_test_req_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("TEST{nanos}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_monitor_initial_state() {
        let hb = HeartbeatMonitor::new(Duration::from_secs(30));
        assert_eq!(hb.interval(), Duration::from_secs(30));
        assert_eq!(hb.grace(), Duration::from_secs(6));
        assert!(hb.pending_test_request().is_none());
        assert!(!hb.should_send_heartbeat());
        assert!(!hb.should_send_test_request());
        assert!(!hb.is_timed_out());
    }

    #[test]
    fn test_should_send_heartbeat_after_idle() {
        let mut hb = HeartbeatMonitor::new(Duration::from_millis(10));
        sleep(Duration::from_millis(15));
        assert!(hb.should_send_heartbeat());
        hb.on_message_sent();
        assert!(!hb.should_send_heartbeat());
    }

    #[test]
    fn test_test_request_escalation() {
        let mut hb = HeartbeatMonitor::new(Duration::from_millis(10));
        sleep(Duration::from_millis(15));
        assert!(hb.should_send_test_request());

        hb.on_test_request_sent("TR1".to_string());
        assert_eq!(hb.pending_test_request(), Some("TR1"));
        assert!(!hb.should_send_test_request());

        sleep(Duration::from_millis(12));
        assert!(hb.is_timed_out());
    }

    #[test]
    fn test_heartbeat_response_clears_pending() {
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(30));
        hb.on_test_request_sent("TR7".to_string());

        // a heartbeat with the wrong id keeps the request pending
        hb.on_message_received(true, Some("OTHER"));
        assert_eq!(hb.pending_test_request(), Some("TR7"));

        hb.on_message_received(true, Some("TR7"));
        assert!(hb.pending_test_request().is_none());
        assert!(!hb.is_timed_out());
    }

    #[test]
    fn test_adopt_interval() {
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(30));
        hb.set_interval(Duration::from_secs(10));
        assert_eq!(hb.interval(), Duration::from_secs(10));
        assert_eq!(hb.grace(), Duration::from_secs(2));
    }

    #[test]
    fn test_generate_test_req_id() {
        let id = generate_test_req_id();
        assert!(id.starts_with("TEST"));
        assert!(id.len() > 4);
    }
}
