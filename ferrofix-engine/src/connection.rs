/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! The connection engine.
//!
//! [`FixConnection`] turns transport bytes into session behavior: frames are
//! split and decoded, sequence-checked against the session, journaled, and
//! then either answered by the session layer (logon, heartbeat, test
//! request, resend, sequence reset, logout) or handed to the application.
//! Outbound messages go through the locked send path: encode with sequence
//! allocation, journal, then transmit. The `&mut self` receiver is the send
//! lock: exclusive access makes encode+persist+transmit atomic, so
//! interleaved sends come out with contiguous sequence numbers.
//!
//! The engine never reconnects on its own; it reports state changes and the
//! caller owns the retry policy.

use crate::events::ConnectionEvents;
use crate::state::{ConnectionRole, ConnectionState};
use bytes::{Bytes, BytesMut};
use ferrofix_core::error::{FixError, SessionError};
use ferrofix_core::message::{FieldEntry, FixMessage};
use ferrofix_core::tags::{self, MsgType};
use ferrofix_protocol::Fix44Protocol;
use ferrofix_session::{FixSession, HeartbeatMonitor, SeqCheck, SessionConfig, generate_test_req_id};
use ferrofix_store::{Direction, Journal, find_seq_no};
use ferrofix_tagvalue::Codec;
use tokio_util::codec::Decoder;
use ferrofix_transport::{FrameCodec, Transport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// One FIX connection: transport, codec, session rules and callbacks.
pub struct FixConnection<E: ConnectionEvents> {
    codec: Codec,
    config: SessionConfig,
    session: FixSession,
    journal: Arc<dyn Journal>,
    transport: Box<dyn Transport>,
    frames: FrameCodec,
    buffer: BytesMut,
    state: ConnectionState,
    role: ConnectionRole,
    heartbeat: HeartbeatMonitor,
    events: E,
    /// Out-of-order inbound frames parked until the gap closes.
    gap_buffer: Vec<(FixMessage, Bytes)>,
    logout_sent_at: Option<Instant>,
}

impl<E: ConnectionEvents> FixConnection<E> {
    /// Creates an initiator connection: it will send the Logon first.
    ///
    /// # Errors
    /// Journal failures while loading the session.
    pub async fn initiator(
        config: SessionConfig,
        journal: Arc<dyn Journal>,
        transport: Box<dyn Transport>,
        events: E,
    ) -> Result<Self, FixError> {
        Self::new(config, journal, transport, events, ConnectionRole::Initiator).await
    }

    /// Creates an acceptor connection: it waits for the peer's Logon.
    ///
    /// # Errors
    /// Journal failures while loading the session.
    pub async fn acceptor(
        config: SessionConfig,
        journal: Arc<dyn Journal>,
        transport: Box<dyn Transport>,
        events: E,
    ) -> Result<Self, FixError> {
        Self::new(config, journal, transport, events, ConnectionRole::Acceptor).await
    }

    async fn new(
        config: SessionConfig,
        journal: Arc<dyn Journal>,
        transport: Box<dyn Transport>,
        events: E,
        role: ConnectionRole,
    ) -> Result<Self, FixError> {
        let session = journal
            .create_or_load(config.target_comp_id.as_str(), config.sender_comp_id.as_str())
            .await?;
        let heartbeat = HeartbeatMonitor::new(config.heartbeat_interval);
        let frames = FrameCodec::new().with_max_frame_size(config.max_message_size);
        let codec =
            Codec::new(Arc::new(Fix44Protocol::new())).with_max_frame_size(config.max_message_size);
        Ok(Self {
            codec,
            config,
            session,
            journal,
            transport,
            frames,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Unknown,
            role,
            heartbeat,
            events,
            gap_buffer: Vec::new(),
            logout_sent_at: None,
        })
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connection role.
    #[must_use]
    pub fn role(&self) -> ConnectionRole {
        self.role
    }

    /// The session with its counters.
    #[must_use]
    pub fn session(&self) -> &FixSession {
        &self.session
    }

    /// The wire codec (and through it the protocol profile).
    #[must_use]
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Marks the transport as up and starts the handshake: the initiator
    /// sends its Logon, the acceptor waits for one.
    ///
    /// # Errors
    /// Send failures for the initiating Logon.
    pub async fn connect(&mut self) -> Result<(), FixError> {
        self.set_state(ConnectionState::NetworkConnInitiated).await;
        self.set_state(ConnectionState::NetworkConnEstablished).await;
        self.events.on_connect().await;
        if self.role == ConnectionRole::Initiator {
            self.send_logon().await?;
        }
        Ok(())
    }

    /// Drives the connection: reads the transport, decodes and processes
    /// frames, and ticks the heartbeat scheduler. Returns when the
    /// connection reaches a disconnected state.
    ///
    /// # Errors
    /// Protocol violations and transport failures; the connection is
    /// disconnected before the error is returned.
    pub async fn run(&mut self) -> Result<(), FixError> {
        if self.state == ConnectionState::Unknown {
            self.connect().await?;
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        enum Wake {
            Read(std::io::Result<usize>),
            Timer,
        }

        while !self.state.is_disconnected() {
            let wake = tokio::select! {
                read = Self::read_transport(self.transport.as_mut(), &mut self.buffer) => Wake::Read(read),
                _ = ticker.tick() => Wake::Timer,
            };
            match wake {
                Wake::Read(Ok(0)) => {
                    let target = if self.state == ConnectionState::LogoutPending {
                        ConnectionState::DisconnectedWConnToday
                    } else {
                        warn!("transport dropped unexpectedly");
                        ConnectionState::DisconnectedBrokenConn
                    };
                    self.disconnect(target, None).await?;
                }
                Wake::Read(Ok(_)) => self.drain_buffer().await?,
                Wake::Read(Err(e)) => {
                    self.disconnect(ConnectionState::DisconnectedBrokenConn, None)
                        .await?;
                    return Err(e.into());
                }
                Wake::Timer => self.on_timer_tick().await?,
            }
        }
        Ok(())
    }

    async fn read_transport(
        transport: &mut (dyn Transport + '_),
        buffer: &mut BytesMut,
    ) -> std::io::Result<usize> {
        transport.read_buf(buffer).await
    }

    /// Feeds raw transport bytes into the engine and processes every
    /// complete frame they finish.
    ///
    /// # Errors
    /// Frame and session violations from the processed messages.
    pub async fn process_bytes(&mut self, bytes: &[u8]) -> Result<(), FixError> {
        self.buffer.extend_from_slice(bytes);
        self.drain_buffer().await
    }

    async fn drain_buffer(&mut self) -> Result<(), FixError> {
        loop {
            if self.state.is_disconnected() {
                self.buffer.clear();
                return Ok(());
            }
            let frame = match self.frames.decode(&mut self.buffer) {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "unrecoverable framing error");
                    self.disconnect(ConnectionState::DisconnectedBrokenConn, None)
                        .await?;
                    let error = match e {
                        ferrofix_transport::FrameError::TooLarge { size, max_size } => {
                            ferrofix_core::error::DecodeError::FrameTooLarge { size, max_size }
                        }
                        ferrofix_transport::FrameError::Io(reason) => {
                            ferrofix_core::error::DecodeError::GarbledField { text: reason }
                        }
                    };
                    return Err(error.into());
                }
            };
            let decoded = self.codec.decode(&frame);
            match (decoded.message, decoded.raw) {
                (Some(msg), Some(raw)) => self.process_message(msg, raw).await?,
                _ => debug!("discarding undecodable frame"),
            }
        }
    }

    /// Processes one decoded inbound message with its raw frame.
    ///
    /// # Errors
    /// Comp-id and sequence violations; the connection is disconnected
    /// before hard errors are returned.
    pub async fn process_message(&mut self, msg: FixMessage, raw: Bytes) -> Result<(), FixError> {
        let begin_string = msg.get_or(tags::BEGIN_STRING, Fix44Protocol::BEGIN_STRING)?;
        if begin_string != Fix44Protocol::BEGIN_STRING {
            warn!(begin_string, "unexpected BeginString");
            self.disconnect(ConnectionState::DisconnectedBrokenConn, None)
                .await?;
            return Ok(());
        }

        let msg_type = msg.msg_type().clone();
        let test_req_id = msg.get(tags::TEST_REQ_ID).ok().map(str::to_string);
        self.heartbeat
            .on_message_received(msg_type == MsgType::Heartbeat, test_req_id.as_deref());

        if msg_type == MsgType::Logon {
            let sender = msg.get(tags::SENDER_COMP_ID)?.to_string();
            let target = msg.get(tags::TARGET_COMP_ID)?.to_string();
            if !self.session.validate_comp_ids(&sender, &target) {
                let err = SessionError::CompIdMismatch {
                    expected_sender: self.session.sender_comp_id.clone(),
                    expected_target: self.session.target_comp_id.clone(),
                    sender,
                    target,
                };
                self.disconnect(
                    ConnectionState::DisconnectedBrokenConn,
                    Some("comp id mismatch"),
                )
                .await?;
                return Err(err.into());
            }
            if msg.get_or(tags::RESET_SEQ_NUM_FLAG, "N")? == "Y" {
                info!("peer requested sequence reset on logon");
                self.journal
                    .set_seq_num(&mut self.session, Some(1), Some(1))
                    .await?;
            }
        }

        // reset-mode SequenceReset applies regardless of its own MsgSeqNum
        if msg_type == MsgType::SequenceReset && msg.get_or(tags::GAP_FILL_FLAG, "N")? != "Y" {
            let new_seq_no: u64 = msg.get_parsed(tags::NEW_SEQ_NO)?;
            info!(new_seq_no, "sequence reset (reset mode)");
            self.journal
                .set_seq_num(&mut self.session, None, Some(new_seq_no))
                .await?;
            return Ok(());
        }

        let seq_no: u64 = msg.get_parsed(tags::MSG_SEQ_NUM)?;
        match self.session.check_seq_num(seq_no) {
            SeqCheck::Gap { expected, received } => {
                info!(expected, received, "inbound sequence gap");
                if msg_type == MsgType::Logon {
                    // the handshake proceeds, the gap is chased in parallel
                    self.apply_logon(&msg).await?;
                } else {
                    self.gap_buffer.push((msg, raw));
                }
                if self.state != ConnectionState::ResendReqAwaiting {
                    let request = self.codec.protocol().resend_request(expected, 0);
                    self.send_msg(request).await?;
                    self.set_state(ConnectionState::ResendReqAwaiting).await;
                    if msg_type == MsgType::Logon {
                        self.events.on_logon(false).await;
                    }
                }
                Ok(())
            }
            SeqCheck::Duplicate { expected, received } => {
                if msg.get_or(tags::POSS_DUP_FLAG, "N")? == "Y" {
                    debug!(received, "ignoring PossDup frame below expected seq");
                    Ok(())
                } else {
                    let err = SessionError::SequenceTooLow { expected, received };
                    warn!(%err, "disconnecting");
                    self.disconnect(ConnectionState::DisconnectedBrokenConn, None)
                        .await?;
                    Err(err.into())
                }
            }
            SeqCheck::InOrder(n) => {
                self.session.accept_seq_num(n);
                self.journal
                    .persist_msg(&raw, &self.session, Direction::Inbound)
                    .await?;
                self.dispatch(msg).await?;
                self.drain_gap_buffer().await
            }
        }
    }

    async fn dispatch(&mut self, msg: FixMessage) -> Result<(), FixError> {
        match msg.msg_type() {
            MsgType::Logon => {
                self.apply_logon(&msg).await?;
                let healthy = self.state != ConnectionState::ResendReqAwaiting
                    && self.gap_buffer.is_empty();
                if healthy {
                    self.set_state(ConnectionState::Active).await;
                }
                self.events.on_logon(healthy).await;
                Ok(())
            }
            MsgType::Logout => {
                self.events.on_logout(&msg).await;
                if self.state == ConnectionState::LogoutPending {
                    self.disconnect(ConnectionState::DisconnectedWConnToday, None)
                        .await
                } else {
                    // confirm the peer's logout, then close
                    let reply = self.codec.protocol().logout(None);
                    if let Err(e) = self.send_msg(reply).await {
                        warn!(error = %e, "failed to confirm logout");
                    }
                    self.disconnect(ConnectionState::DisconnectedWConnToday, None)
                        .await
                }
            }
            MsgType::TestRequest => {
                let test_req_id = msg.get(tags::TEST_REQ_ID).ok().map(str::to_string);
                let reply = self.codec.protocol().heartbeat(test_req_id.as_deref());
                self.send_msg(reply).await
            }
            MsgType::Heartbeat => Ok(()),
            MsgType::ResendRequest => self.handle_resend_request(&msg).await,
            MsgType::SequenceReset => {
                // gap-fill mode; reset mode was handled before the seq check
                let new_seq_no: u64 = msg.get_parsed(tags::NEW_SEQ_NO)?;
                if new_seq_no > self.session.next_num_in {
                    debug!(new_seq_no, "gap fill advances inbound seq");
                    self.session.next_num_in = new_seq_no;
                } else {
                    warn!(
                        new_seq_no,
                        next_num_in = self.session.next_num_in,
                        "ignoring gap fill that does not advance"
                    );
                }
                Ok(())
            }
            MsgType::Reject => {
                warn!(
                    ref_seq = msg.get_or(tags::REF_SEQ_NUM, "?").unwrap_or("?"),
                    text = msg.get_or(tags::TEXT, "").unwrap_or(""),
                    "session-level reject received"
                );
                self.events.on_message(&msg).await;
                Ok(())
            }
            _ => {
                self.events.on_message(&msg).await;
                Ok(())
            }
        }
    }

    async fn apply_logon(&mut self, msg: &FixMessage) -> Result<(), FixError> {
        if let Ok(interval) = msg.get_parsed::<u64>(tags::HEART_BT_INT) {
            self.heartbeat.set_interval(Duration::from_secs(interval));
        }
        match self.role {
            ConnectionRole::Initiator => {
                self.set_state(ConnectionState::LogonResponse).await;
            }
            ConnectionRole::Acceptor => {
                self.set_state(ConnectionState::LogonInitialRecv).await;
                let echo_reset = msg.get_or(tags::RESET_SEQ_NUM_FLAG, "N")? == "Y";
                let reply = self
                    .codec
                    .protocol()
                    .logon(self.heartbeat.interval().as_secs(), echo_reset);
                self.send_msg(reply).await?;
            }
        }
        Ok(())
    }

    async fn drain_gap_buffer(&mut self) -> Result<(), FixError> {
        loop {
            let next = self.session.next_num_in;
            // drop frames the gap fill already skipped past
            self.gap_buffer.retain(|(m, _)| {
                m.get_parsed::<u64>(tags::MSG_SEQ_NUM)
                    .map(|s| s >= next)
                    .unwrap_or(false)
            });
            let Some(pos) = self.gap_buffer.iter().position(|(m, _)| {
                m.get_parsed::<u64>(tags::MSG_SEQ_NUM)
                    .map(|s| s == next)
                    .unwrap_or(false)
            }) else {
                break;
            };
            let (msg, raw) = self.gap_buffer.remove(pos);
            debug!(seq_no = next, "replaying buffered frame into the gap");
            self.session.accept_seq_num(next);
            self.journal
                .persist_msg(&raw, &self.session, Direction::Inbound)
                .await?;
            self.dispatch(msg).await?;
        }

        if self.state == ConnectionState::ResendReqAwaiting && self.gap_buffer.is_empty() {
            self.set_state(ConnectionState::Active).await;
        }
        Ok(())
    }

    async fn handle_resend_request(&mut self, msg: &FixMessage) -> Result<(), FixError> {
        let begin: u64 = msg.get_parsed(tags::BEGIN_SEQ_NO)?;
        let end: u64 = msg.get_parsed(tags::END_SEQ_NO)?;
        info!(begin, end, "peer requested resend");

        let replays = self
            .journal
            .recover_messages(&self.session, Direction::Outbound, begin, end)
            .await?;

        let mut gap_begin = begin;
        let mut gap_end = begin;
        for raw in replays {
            let seq_no = find_seq_no(&raw)?;
            let Some(original) = self.codec.decode(&raw).message else {
                gap_end = seq_no + 1;
                continue;
            };
            // session frames are never replayed
            if original.msg_type().is_admin() {
                gap_end = seq_no + 1;
                continue;
            }
            if self.events.should_replay(&original).await {
                if gap_begin < gap_end {
                    let fill = self.codec.protocol().sequence_reset(gap_begin, gap_end, true);
                    self.send_msg(fill).await?;
                }
                let replay = build_replay(&original, seq_no)?;
                self.send_msg(replay).await?;
                gap_begin = seq_no + 1;
                gap_end = seq_no + 1;
            } else {
                gap_end = seq_no + 1;
            }
        }
        if gap_begin < gap_end {
            let fill = self.codec.protocol().sequence_reset(gap_begin, gap_end, true);
            self.send_msg(fill).await?;
        }
        Ok(())
    }

    /// Sends a message: encode with sequence allocation, journal, transmit.
    ///
    /// Session-class messages carrying their own MsgSeqNum go out under that
    /// raw sequence number; replays (`PossDupFlag=Y`) and gap fills skip the
    /// journal because their rows already exist.
    ///
    /// # Errors
    /// [`SessionError::InvalidState`] outside the sendable states, plus
    /// encode/journal/transport failures.
    pub async fn send_msg(&mut self, msg: FixMessage) -> Result<(), FixError> {
        self.ensure_can_send(&msg)?;

        let raw_seq_num = msg.msg_type().is_admin() && msg.contains(tags::MSG_SEQ_NUM);
        let encoded = self.codec.encode(&msg, &mut self.session, raw_seq_num)?;

        let replayed = raw_seq_num || msg.get_or(tags::POSS_DUP_FLAG, "N")? == "Y";
        if !replayed {
            self.journal
                .persist_msg(&encoded, &self.session, Direction::Outbound)
                .await?;
        }

        self.transport.write_all(&encoded).await?;
        self.heartbeat.on_message_sent();
        debug!(msg_type = %msg.msg_type(), len = encoded.len(), "frame sent");

        if msg.msg_type() == &MsgType::Logout && self.state != ConnectionState::LogoutPending {
            self.logout_sent_at = Some(Instant::now());
            self.set_state(ConnectionState::LogoutPending).await;
        }
        Ok(())
    }

    fn ensure_can_send(&self, msg: &FixMessage) -> Result<(), FixError> {
        use ConnectionState::*;
        let allowed = match self.state {
            Active | LogonInitialSent | LogonInitialRecv | LogonResponse => true,
            ResendReqAwaiting | LogoutPending | AwaitingConnectionRestore => {
                msg.msg_type().is_admin()
            }
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation: format!("send 35={}", msg.msg_type()),
                state: self.state.to_string(),
            }
            .into())
        }
    }

    /// Sends a TestRequest with a fresh TestReqID.
    ///
    /// # Errors
    /// [`SessionError::TestRequestPending`] when one is already outstanding.
    pub async fn send_test_req(&mut self) -> Result<(), FixError> {
        if let Some(id) = self.heartbeat.pending_test_request() {
            return Err(SessionError::TestRequestPending {
                test_req_id: id.to_string(),
            }
            .into());
        }
        self.send_test_req_inner().await
    }

    async fn send_test_req_inner(&mut self) -> Result<(), FixError> {
        let test_req_id = generate_test_req_id();
        let msg = self.codec.protocol().test_request(&test_req_id);
        self.send_msg(msg).await?;
        self.heartbeat.on_test_request_sent(test_req_id);
        Ok(())
    }

    /// One heartbeat scheduler tick: emits Heartbeats on outbound silence,
    /// escalates to a TestRequest on inbound silence, and tears the
    /// connection down when the TestRequest stays unanswered.
    ///
    /// # Errors
    /// [`SessionError::TestRequestTimeout`] after the teardown, plus send
    /// failures.
    pub async fn on_timer_tick(&mut self) -> Result<(), FixError> {
        use ConnectionState::*;
        if !matches!(self.state, Active | ResendReqAwaiting | LogoutPending) {
            return Ok(());
        }

        if self.state == LogoutPending {
            if self
                .logout_sent_at
                .is_some_and(|at| at.elapsed() >= self.config.logout_timeout)
            {
                warn!("logout confirmation timed out");
                self.disconnect(DisconnectedWConnToday, None).await?;
            }
            return Ok(());
        }

        if self.heartbeat.is_timed_out() {
            let elapsed_ms = self.heartbeat.silence_ms();
            warn!(elapsed_ms, "test request unanswered, giving the connection up");
            self.set_state(AwaitingConnectionRestore).await;
            self.disconnect(DisconnectedBrokenConn, None).await?;
            return Err(SessionError::TestRequestTimeout { elapsed_ms }.into());
        }

        if self.heartbeat.should_send_heartbeat() {
            let hb = self.codec.protocol().heartbeat(None);
            self.send_msg(hb).await?;
        }
        if self.heartbeat.should_send_test_request() {
            self.send_test_req_inner().await?;
        }
        Ok(())
    }

    /// Initiates a clean logout: sends Logout(58=reason) and awaits the
    /// peer's confirmation.
    ///
    /// # Errors
    /// Send failures.
    pub async fn logout(&mut self, reason: Option<&str>) -> Result<(), FixError> {
        let msg = self.codec.protocol().logout(reason);
        self.send_msg(msg).await
    }

    /// Tears the connection down: optionally sends a Logout, closes the
    /// transport, enters `target_state` and notifies the application.
    ///
    /// # Errors
    /// None in practice; journal/callback failures propagate.
    pub async fn disconnect(
        &mut self,
        target_state: ConnectionState,
        logout_text: Option<&str>,
    ) -> Result<(), FixError> {
        if self.state.is_disconnected() {
            return Ok(());
        }
        let can_send_logout = matches!(
            self.state,
            ConnectionState::Active | ConnectionState::ResendReqAwaiting
        ) || self.state.is_logon_phase();
        if let Some(text) = logout_text
            && can_send_logout
        {
            let logout = self.codec.protocol().logout(Some(text));
            if let Err(e) = self.send_msg(logout).await {
                warn!(error = %e, "failed to send parting logout");
            }
        }
        info!(state = %target_state, "disconnecting");
        self.transport.close().await;
        self.buffer.clear();
        self.gap_buffer.clear();
        self.heartbeat.reset();
        self.logout_sent_at = None;
        self.set_state(target_state).await;
        self.events.on_disconnect().await;
        Ok(())
    }

    async fn send_logon(&mut self) -> Result<(), FixError> {
        if self.config.reset_seq_num_on_logon {
            self.journal
                .set_seq_num(&mut self.session, Some(1), Some(1))
                .await?;
        }
        self.set_state(ConnectionState::LogonInitialSent).await;
        let logon = self.codec.protocol().logon(
            self.config.heartbeat_interval_secs(),
            self.config.reset_seq_num_on_logon,
        );
        self.send_msg(logon).await
    }

    async fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "connection state change");
        self.state = state;
        self.events.on_state_change(state).await;
    }
}

/// Rebuilds a journaled application message for rebroadcast: original body,
/// `PossDupFlag=Y`, `OrigSendingTime` from the original `SendingTime`, and
/// the original sequence number.
fn build_replay(original: &FixMessage, seq_no: u64) -> Result<FixMessage, FixError> {
    let mut replay = FixMessage::new(original.msg_type().clone());
    if let Ok(sending_time) = original.get(tags::SENDING_TIME) {
        replay.set(tags::ORIG_SENDING_TIME, sending_time)?;
    }
    replay.set(tags::POSS_DUP_FLAG, "Y")?;
    replay.set_raw(tags::MSG_SEQ_NUM, seq_no);

    for (tag, entry) in original.entries() {
        if matches!(
            tag,
            tags::BEGIN_STRING
                | tags::BODY_LENGTH
                | tags::CHECK_SUM
                | tags::MSG_TYPE
                | tags::MSG_SEQ_NUM
                | tags::SENDING_TIME
                | tags::SENDER_COMP_ID
                | tags::TARGET_COMP_ID
                | tags::POSS_DUP_FLAG
                | tags::ORIG_SENDING_TIME
        ) {
            continue;
        }
        match entry {
            FieldEntry::Value(v) => replay.set(tag, v)?,
            FieldEntry::Group(entries) => replay.set_group(tag, entries.clone())?,
            FieldEntry::Repeated => {}
        }
    }
    Ok(replay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferrofix_core::types::CompId;
    use ferrofix_store::MemoryJournal;
    use parking_lot::Mutex;

    /// Captures every frame the connection writes.
    #[derive(Clone, Default)]
    struct Wire(Arc<Mutex<Vec<Vec<u8>>>>);

    impl Wire {
        fn frames(&self) -> Vec<FixMessage> {
            let codec = Codec::new(Arc::new(Fix44Protocol::new()));
            self.0
                .lock()
                .iter()
                .filter_map(|raw| codec.decode(raw).message)
                .collect()
        }

        fn clear(&self) {
            self.0.lock().clear();
        }
    }

    struct MockTransport {
        wire: Wire,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn read_buf(&mut self, _buf: &mut BytesMut) -> std::io::Result<usize> {
            Ok(0)
        }

        async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
            self.wire.0.lock().push(bytes.to_vec());
            Ok(())
        }

        async fn close(&mut self) {}
    }

    /// Records callback invocations in order.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn contains(&self, needle: &str) -> bool {
            self.0.lock().iter().any(|e| e == needle)
        }
    }

    #[async_trait]
    impl ConnectionEvents for Recorder {
        async fn on_connect(&self) {
            self.0.lock().push("connect".to_string());
        }

        async fn on_disconnect(&self) {
            self.0.lock().push("disconnect".to_string());
        }

        async fn on_logon(&self, is_healthy: bool) {
            self.0.lock().push(format!("logon:{is_healthy}"));
        }

        async fn on_logout(&self, _msg: &FixMessage) {
            self.0.lock().push("logout".to_string());
        }

        async fn on_message(&self, msg: &FixMessage) {
            self.0.lock().push(format!("msg:{}", msg.msg_type()));
        }

        async fn on_state_change(&self, state: ConnectionState) {
            self.0.lock().push(format!("state:{state}"));
        }
    }

    /// The counterparty: encodes frames under its own session counters.
    struct Peer {
        protocol: Fix44Protocol,
        codec: Codec,
        session: FixSession,
    }

    impl Peer {
        fn new() -> Self {
            Self {
                protocol: Fix44Protocol::new(),
                codec: Codec::new(Arc::new(Fix44Protocol::new())),
                session: FixSession::new(99, "ME", "YOU"),
            }
        }

        fn frame(&mut self, msg: &FixMessage) -> Bytes {
            self.codec.encode(msg, &mut self.session, false).unwrap()
        }

        fn frame_raw(&mut self, msg: &FixMessage) -> Bytes {
            self.codec.encode(msg, &mut self.session, true).unwrap()
        }

        fn logon(&mut self) -> Bytes {
            let msg = self.protocol.logon(30, false);
            self.frame(&msg)
        }

        fn news(&mut self) -> Bytes {
            let mut msg = FixMessage::new(MsgType::News);
            msg.set(tags::TEXT, "headline").unwrap();
            self.frame(&msg)
        }
    }

    async fn acceptor_conn(
        journal: Arc<MemoryJournal>,
    ) -> (FixConnection<Recorder>, Wire, Recorder) {
        let wire = Wire::default();
        let events = Recorder::default();
        let config = SessionConfig::new(
            CompId::new("ME").unwrap(),
            CompId::new("YOU").unwrap(),
        );
        let conn = FixConnection::acceptor(
            config,
            journal,
            Box::new(MockTransport { wire: wire.clone() }),
            events.clone(),
        )
        .await
        .unwrap();
        (conn, wire, events)
    }

    /// Acceptor with the logon handshake already done.
    async fn active_conn() -> (FixConnection<Recorder>, Wire, Recorder, Peer) {
        let journal = Arc::new(MemoryJournal::new());
        let (mut conn, wire, events) = acceptor_conn(journal).await;
        let mut peer = Peer::new();
        conn.connect().await.unwrap();
        conn.process_bytes(&peer.logon()).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Active);
        wire.clear();
        (conn, wire, events, peer)
    }

    #[tokio::test]
    async fn test_initiator_sends_logon_on_connect() {
        let journal = Arc::new(MemoryJournal::new());
        let wire = Wire::default();
        let config = SessionConfig::new(
            CompId::new("ME").unwrap(),
            CompId::new("YOU").unwrap(),
        );
        let mut conn = FixConnection::initiator(
            config,
            journal,
            Box::new(MockTransport { wire: wire.clone() }),
            Recorder::default(),
        )
        .await
        .unwrap();

        conn.connect().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::LogonInitialSent);

        let frames = wire.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_type(), &MsgType::Logon);
        assert_eq!(frames[0].get(tags::MSG_SEQ_NUM).unwrap(), "1");
        assert_eq!(frames[0].get(tags::HEART_BT_INT).unwrap(), "30");
        assert_eq!(frames[0].get(tags::ENCRYPT_METHOD).unwrap(), "0");
    }

    #[tokio::test]
    async fn test_acceptor_handshake() {
        let journal = Arc::new(MemoryJournal::new());
        let (mut conn, wire, events) = acceptor_conn(journal).await;
        let mut peer = Peer::new();

        conn.connect().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::NetworkConnEstablished);

        conn.process_bytes(&peer.logon()).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Active);
        assert_eq!(conn.session().next_num_in, 2);
        assert!(events.contains("logon:true"));

        let frames = wire.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_type(), &MsgType::Logon);
    }

    #[tokio::test]
    async fn test_test_request_echoed_with_heartbeat() {
        let (mut conn, wire, _events, mut peer) = active_conn().await;

        let msg = peer.protocol.test_request("PING-7");
        let frame = peer.frame(&msg);
        conn.process_bytes(&frame).await.unwrap();

        let frames = wire.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_type(), &MsgType::Heartbeat);
        assert_eq!(frames[0].get(tags::TEST_REQ_ID).unwrap(), "PING-7");
    }

    #[tokio::test]
    async fn test_gap_detection_and_recovery() {
        let (mut conn, wire, events, mut peer) = active_conn().await;
        assert_eq!(conn.session().next_num_in, 2);

        // peer skips ahead to seq 4
        peer.session.next_num_out = 4;
        let jumped = peer.news();
        conn.process_bytes(&jumped).await.unwrap();

        assert_eq!(conn.state(), ConnectionState::ResendReqAwaiting);
        let frames = wire.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_type(), &MsgType::ResendRequest);
        assert_eq!(frames[0].get(tags::BEGIN_SEQ_NO).unwrap(), "2");
        assert_eq!(frames[0].get(tags::END_SEQ_NO).unwrap(), "0");
        // the triggering frame is parked, not delivered
        assert!(!events.contains("msg:B"));

        // the missing frames arrive
        peer.session.next_num_out = 2;
        let f2 = peer.news();
        let f3 = peer.news();
        conn.process_bytes(&f2).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::ResendReqAwaiting);
        conn.process_bytes(&f3).await.unwrap();

        // the buffered seq 4 was replayed into the gap
        assert_eq!(conn.state(), ConnectionState::Active);
        assert_eq!(conn.session().next_num_in, 5);
        assert_eq!(
            events.0.lock().iter().filter(|e| *e == "msg:B").count(),
            3
        );
    }

    #[tokio::test]
    async fn test_resend_request_replays_with_gap_fill() {
        let (mut conn, wire, _events, mut peer) = active_conn().await;

        // our outbound log: seq 2 order, seq 3 and 4 heartbeats
        let order = FixMessage::with_fields(
            "D",
            [(11, "C1"), (55, "AAPL"), (54, "1"), (38, "10"), (40, "1")],
        )
        .unwrap();
        conn.send_msg(order).await.unwrap();
        let hb = conn.codec().protocol().heartbeat(None);
        conn.send_msg(hb).await.unwrap();
        let hb = conn.codec().protocol().heartbeat(None);
        conn.send_msg(hb).await.unwrap();
        assert_eq!(conn.session().next_num_out, 5);
        wire.clear();

        let request = peer.protocol.resend_request(2, 4);
        let frame = peer.frame(&request);
        conn.process_bytes(&frame).await.unwrap();

        let frames = wire.frames();
        assert_eq!(frames.len(), 2);

        // first the replayed order, PossDup with its original seq
        assert_eq!(frames[0].msg_type(), &MsgType::NewOrderSingle);
        assert_eq!(frames[0].get(tags::POSS_DUP_FLAG).unwrap(), "Y");
        assert_eq!(frames[0].get(tags::MSG_SEQ_NUM).unwrap(), "2");
        assert_eq!(frames[0].get(tags::CL_ORD_ID).unwrap(), "C1");
        assert!(frames[0].contains(tags::ORIG_SENDING_TIME));

        // then one gap fill covering the two admin frames
        assert_eq!(frames[1].msg_type(), &MsgType::SequenceReset);
        assert_eq!(frames[1].get(tags::GAP_FILL_FLAG).unwrap(), "Y");
        assert_eq!(frames[1].get(tags::MSG_SEQ_NUM).unwrap(), "3");
        assert_eq!(frames[1].get(tags::NEW_SEQ_NO).unwrap(), "5");
    }

    #[tokio::test]
    async fn test_sequence_too_low_disconnects() {
        let (mut conn, _wire, events, _peer) = active_conn().await;

        // a fresh peer starts over at seq 1 without PossDup
        let mut stale_peer = Peer::new();
        let frame = stale_peer.news();
        let err = conn.process_bytes(&frame).await.unwrap_err();
        assert!(matches!(
            err,
            FixError::Session(SessionError::SequenceTooLow {
                expected: 2,
                received: 1
            })
        ));
        assert_eq!(conn.state(), ConnectionState::DisconnectedBrokenConn);
        assert!(events.contains("disconnect"));
    }

    #[tokio::test]
    async fn test_poss_dup_below_expected_ignored() {
        let (mut conn, _wire, events, mut peer) = active_conn().await;

        let mut dup = FixMessage::new(MsgType::News);
        dup.set(tags::TEXT, "old").unwrap();
        dup.set(tags::POSS_DUP_FLAG, "Y").unwrap();
        dup.set_raw(tags::MSG_SEQ_NUM, 1u64);
        let frame = peer.frame(&dup);
        conn.process_bytes(&frame).await.unwrap();

        assert_eq!(conn.state(), ConnectionState::Active);
        assert_eq!(conn.session().next_num_in, 2);
        assert!(!events.contains("msg:B"));
    }

    #[tokio::test]
    async fn test_logon_reset_seq_num_flag() {
        let (mut conn, wire, _events, _peer) = active_conn().await;
        // move the counters forward first
        let hb = conn.codec().protocol().heartbeat(None);
        conn.send_msg(hb).await.unwrap();
        assert!(conn.session().next_num_out > 2);
        wire.clear();

        // peer starts over with 141=Y at seq 1
        let mut fresh_peer = Peer::new();
        let msg = fresh_peer.protocol.logon(30, true);
        let frame = fresh_peer.frame(&msg);
        conn.process_bytes(&frame).await.unwrap();

        assert_eq!(conn.state(), ConnectionState::Active);
        assert_eq!(conn.session().next_num_in, 2);

        let frames = wire.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_type(), &MsgType::Logon);
        // the reply went out under the reset counter, echoing the flag
        assert_eq!(frames[0].get(tags::MSG_SEQ_NUM).unwrap(), "1");
        assert_eq!(frames[0].get(tags::RESET_SEQ_NUM_FLAG).unwrap(), "Y");
        assert_eq!(conn.session().next_num_out, 2);
    }

    #[tokio::test]
    async fn test_sequence_reset_reset_mode() {
        let (mut conn, _wire, _events, mut peer) = active_conn().await;

        let mut reset = FixMessage::new(MsgType::SequenceReset);
        reset.set(tags::MSG_SEQ_NUM, 99u64).unwrap();
        reset.set(tags::GAP_FILL_FLAG, "N").unwrap();
        reset.set(tags::NEW_SEQ_NO, 10u64).unwrap();
        let frame = peer.frame_raw(&reset);
        conn.process_bytes(&frame).await.unwrap();
        assert_eq!(conn.session().next_num_in, 10);

        // reset mode also lowers the counter
        let mut reset = FixMessage::new(MsgType::SequenceReset);
        reset.set(tags::MSG_SEQ_NUM, 99u64).unwrap();
        reset.set(tags::GAP_FILL_FLAG, "N").unwrap();
        reset.set(tags::NEW_SEQ_NO, 3u64).unwrap();
        let frame = peer.frame_raw(&reset);
        conn.process_bytes(&frame).await.unwrap();
        assert_eq!(conn.session().next_num_in, 3);
        assert_eq!(conn.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn test_sequence_reset_gap_fill_advances() {
        let (mut conn, _wire, _events, mut peer) = active_conn().await;
        assert_eq!(conn.session().next_num_in, 2);

        let fill = peer.protocol.sequence_reset(2, 6, true);
        let frame = peer.frame_raw(&fill);
        conn.process_bytes(&frame).await.unwrap();
        assert_eq!(conn.session().next_num_in, 6);
    }

    #[tokio::test]
    async fn test_send_rejected_when_not_connected() {
        let journal = Arc::new(MemoryJournal::new());
        let (mut conn, _wire, _events) = acceptor_conn(journal).await;

        let order = FixMessage::with_fields("D", [(11, "C1")]).unwrap();
        let err = conn.send_msg(order).await.unwrap_err();
        assert!(matches!(
            err,
            FixError::Session(SessionError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_app_send_rejected_while_awaiting_resend() {
        let (mut conn, _wire, _events, mut peer) = active_conn().await;
        peer.session.next_num_out = 5;
        let frame = peer.news();
        conn.process_bytes(&frame).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::ResendReqAwaiting);

        let order = FixMessage::with_fields("D", [(11, "C1")]).unwrap();
        assert!(conn.send_msg(order).await.is_err());

        // session messages still flow
        let hb = conn.codec().protocol().heartbeat(None);
        conn.send_msg(hb).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_test_req_rejects_second_request() {
        let (mut conn, wire, _events, _peer) = active_conn().await;

        conn.send_test_req().await.unwrap();
        let frames = wire.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_type(), &MsgType::TestRequest);

        let err = conn.send_test_req().await.unwrap_err();
        assert!(matches!(
            err,
            FixError::Session(SessionError::TestRequestPending { .. })
        ));
    }

    #[tokio::test]
    async fn test_peer_logout_confirmed_and_closed() {
        let (mut conn, wire, events, mut peer) = active_conn().await;

        let logout = peer.protocol.logout(Some("done"));
        let frame = peer.frame(&logout);
        conn.process_bytes(&frame).await.unwrap();

        assert_eq!(conn.state(), ConnectionState::DisconnectedWConnToday);
        assert!(events.contains("logout"));
        assert!(events.contains("disconnect"));
        let frames = wire.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_type(), &MsgType::Logout);
    }

    #[tokio::test]
    async fn test_our_logout_waits_for_confirmation() {
        let (mut conn, _wire, _events, mut peer) = active_conn().await;

        conn.logout(Some("closing")).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::LogoutPending);

        let confirm = peer.protocol.logout(None);
        let frame = peer.frame(&confirm);
        conn.process_bytes(&frame).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::DisconnectedWConnToday);
    }

    #[tokio::test]
    async fn test_contiguous_outbound_seq_nums() {
        let (mut conn, wire, _events, _peer) = active_conn().await;

        for i in 0..3 {
            let order =
                FixMessage::with_fields("D", [(11, format!("C{i}").as_str())]).unwrap();
            conn.send_msg(order).await.unwrap();
        }
        let seqs: Vec<u64> = wire
            .frames()
            .iter()
            .map(|f| f.get_parsed(tags::MSG_SEQ_NUM).unwrap())
            .collect();
        assert_eq!(seqs, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_inbound_and_outbound_journaled() {
        let (mut conn, _wire, _events, mut peer) = active_conn().await;

        let frame = peer.news();
        conn.process_bytes(&frame).await.unwrap();
        let order = FixMessage::with_fields("D", [(11, "C1")]).unwrap();
        conn.send_msg(order).await.unwrap();

        let inbound = conn
            .journal
            .recover_messages(conn.session(), Direction::Inbound, 1, 0)
            .await
            .unwrap();
        assert_eq!(inbound.len(), 2); // logon + news
        let outbound = conn
            .journal
            .recover_messages(conn.session(), Direction::Outbound, 1, 0)
            .await
            .unwrap();
        assert_eq!(outbound.len(), 2); // logon reply + order
    }

    #[tokio::test]
    async fn test_heartbeat_scheduler_escalation() {
        let journal = Arc::new(MemoryJournal::new());
        let wire = Wire::default();
        let events = Recorder::default();
        let config = SessionConfig::new(
            CompId::new("ME").unwrap(),
            CompId::new("YOU").unwrap(),
        )
        .with_heartbeat_interval(Duration::from_millis(30));
        let mut conn = FixConnection::acceptor(
            config,
            journal,
            Box::new(MockTransport { wire: wire.clone() }),
            events.clone(),
        )
        .await
        .unwrap();
        conn.connect().await.unwrap();

        // a logon without HeartBtInt keeps our configured interval
        let mut peer = Peer::new();
        let mut logon = FixMessage::new(MsgType::Logon);
        logon.set(tags::ENCRYPT_METHOD, 0).unwrap();
        let frame = peer.frame(&logon);
        conn.process_bytes(&frame).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Active);
        wire.clear();

        tokio::time::sleep(Duration::from_millis(45)).await;
        conn.on_timer_tick().await.unwrap();
        let types: Vec<String> = wire
            .frames()
            .iter()
            .map(|f| f.msg_type().as_str().to_string())
            .collect();
        assert!(types.contains(&"0".to_string()), "expected a heartbeat, got {types:?}");
        assert!(types.contains(&"1".to_string()), "expected a test request, got {types:?}");

        // no response: the next window tears the connection down
        tokio::time::sleep(Duration::from_millis(45)).await;
        let err = conn.on_timer_tick().await.unwrap_err();
        assert!(matches!(
            err,
            FixError::Session(SessionError::TestRequestTimeout { .. })
        ));
        assert_eq!(conn.state(), ConnectionState::DisconnectedBrokenConn);
        assert!(events.contains("state:AWAITING_CONNECTION_RESTORE"));
    }

    #[tokio::test]
    async fn test_comp_id_mismatch_disconnects() {
        let journal = Arc::new(MemoryJournal::new());
        let (mut conn, _wire, _events) = acceptor_conn(journal).await;
        conn.connect().await.unwrap();

        // a peer with the wrong identity
        let mut impostor = Peer {
            protocol: Fix44Protocol::new(),
            codec: Codec::new(Arc::new(Fix44Protocol::new())),
            session: FixSession::new(98, "ME", "MALLORY"),
        };
        let frame = impostor.logon();
        let err = conn.process_bytes(&frame).await.unwrap_err();
        assert!(matches!(
            err,
            FixError::Session(SessionError::CompIdMismatch { .. })
        ));
        assert_eq!(conn.state(), ConnectionState::DisconnectedBrokenConn);
    }
}
