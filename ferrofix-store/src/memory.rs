/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! In-memory journal.
//!
//! Keeps sessions and message rows in a `BTreeMap` behind a `parking_lot`
//! lock. Suitable for tests and non-durable deployments; durable backends
//! implement the same [`Journal`] trait over any keyed storage with
//! insert-if-absent semantics.

use crate::journal::{Direction, Journal, find_seq_no};
use async_trait::async_trait;
use bytes::Bytes;
use ferrofix_core::error::{FixError, JournalError};
use ferrofix_session::FixSession;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone)]
struct SessionRecord {
    key: i64,
    next_num_out: u64,
    next_num_in: u64,
}

#[derive(Debug, Default)]
struct Inner {
    next_key: i64,
    /// (target, sender) to session record.
    sessions: HashMap<(String, String), SessionRecord>,
    /// (session key, direction, seq) to encoded frame.
    messages: BTreeMap<(i64, Direction, u64), Bytes>,
}

/// Journal over process memory.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    inner: RwLock<Inner>,
}

impl MemoryJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored frames across all sessions.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.inner.read().messages.len()
    }

    /// Returns true when a frame is stored under the key.
    #[must_use]
    pub fn contains(&self, session: &FixSession, direction: Direction, seq_no: u64) -> bool {
        self.inner
            .read()
            .messages
            .contains_key(&(session.key, direction, seq_no))
    }
}

#[async_trait]
impl Journal for MemoryJournal {
    async fn sessions(&self) -> Result<HashMap<(String, String), FixSession>, FixError> {
        let inner = self.inner.read();
        let mut result = HashMap::new();
        for ((target, sender), record) in &inner.sessions {
            let mut session = FixSession::new(record.key, target.clone(), sender.clone());
            session.next_num_out = record.next_num_out;
            session.next_num_in = record.next_num_in;
            result.insert((target.clone(), sender.clone()), session);
        }
        Ok(result)
    }

    async fn create_or_load(
        &self,
        target_comp_id: &str,
        sender_comp_id: &str,
    ) -> Result<FixSession, FixError> {
        let mut inner = self.inner.write();
        let key = (target_comp_id.to_string(), sender_comp_id.to_string());
        if let Some(record) = inner.sessions.get(&key) {
            let mut session = FixSession::new(record.key, target_comp_id, sender_comp_id);
            session.next_num_out = record.next_num_out;
            session.next_num_in = record.next_num_in;
            debug!(%session, "loaded session");
            return Ok(session);
        }

        inner.next_key += 1;
        let record = SessionRecord {
            key: inner.next_key,
            next_num_out: 1,
            next_num_in: 1,
        };
        let session = FixSession::new(record.key, target_comp_id, sender_comp_id);
        inner.sessions.insert(key, record);
        debug!(%session, "created session");
        Ok(session)
    }

    async fn set_seq_num(
        &self,
        session: &mut FixSession,
        next_num_out: Option<u64>,
        next_num_in: Option<u64>,
    ) -> Result<(), FixError> {
        for value in [next_num_out, next_num_in].into_iter().flatten() {
            if value == 0 {
                return Err(JournalError::InvalidSeqNum { seq_no: value }.into());
            }
        }

        let mut inner = self.inner.write();
        let next_out = next_num_out.unwrap_or(session.next_num_out);
        let next_in = next_num_in.unwrap_or(session.next_num_in);
        session.next_num_out = next_out;
        session.next_num_in = next_in;

        let record = inner
            .sessions
            .values_mut()
            .find(|r| r.key == session.key)
            .ok_or(JournalError::UnknownSession {
                session_key: session.key,
            })?;
        record.next_num_out = next_out;
        record.next_num_in = next_in;

        // rows at or above the new counters are gone for good
        inner
            .messages
            .retain(|&(key, direction, seq), _| {
                key != session.key
                    || match direction {
                        Direction::Outbound => seq < next_out,
                        Direction::Inbound => seq < next_in,
                    }
            });
        Ok(())
    }

    async fn persist_msg(
        &self,
        msg: &[u8],
        session: &FixSession,
        direction: Direction,
    ) -> Result<(), FixError> {
        let seq_no = find_seq_no(msg)?;
        let mut inner = self.inner.write();
        let key = (session.key, direction, seq_no);
        if inner.messages.contains_key(&key) {
            return Err(JournalError::DuplicateSeqNo {
                session_key: session.key,
                seq_no,
            }
            .into());
        }
        inner.messages.insert(key, Bytes::copy_from_slice(msg));

        if let Some(record) = inner.sessions.values_mut().find(|r| r.key == session.key) {
            match direction {
                Direction::Outbound => record.next_num_out = record.next_num_out.max(seq_no + 1),
                Direction::Inbound => record.next_num_in = record.next_num_in.max(seq_no + 1),
            }
        }
        debug!(session_key = session.key, ?direction, seq_no, "persisted frame");
        Ok(())
    }

    async fn recover_msg(
        &self,
        session: &FixSession,
        direction: Direction,
        seq_no: u64,
    ) -> Result<Option<Bytes>, FixError> {
        Ok(self
            .inner
            .read()
            .messages
            .get(&(session.key, direction, seq_no))
            .cloned())
    }

    async fn recover_messages(
        &self,
        session: &FixSession,
        direction: Direction,
        start_seq_no: u64,
        end_seq_no: u64,
    ) -> Result<Vec<Bytes>, FixError> {
        let end = if end_seq_no == 0 { u64::MAX } else { end_seq_no };
        let inner = self.inner.read();
        Ok(inner
            .messages
            .range((session.key, direction, start_seq_no)..=(session.key, direction, end))
            .map(|(_, bytes)| bytes.clone())
            .collect())
    }
}
