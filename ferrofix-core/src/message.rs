/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! FIX message containers.
//!
//! This module provides:
//! - [`FixContainer`]: ordered tag/value storage with nested repeating groups
//! - [`FixMessage`]: a container with an immutable message type (tag 35)
//! - [`FieldEntry`]: the scalar / group / repeated-marker value variants
//!
//! All wire values are kept as strings; typed accessors parse on demand and
//! never lose the original text.

use crate::error::MessageError;
use crate::tags::{self, MsgType};
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// Framing tags owned by the encoder. MsgSeqNum (34) is handled separately:
/// session-class messages may carry it for raw-sequence encoding.
const RESERVED_TAGS: [u32; 7] = [
    tags::BEGIN_STRING,
    tags::BODY_LENGTH,
    tags::CHECK_SUM,
    tags::MSG_TYPE,
    tags::SENDER_COMP_ID,
    tags::SENDING_TIME,
    tags::TARGET_COMP_ID,
];

/// A single field slot inside a [`FixContainer`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry {
    /// Plain tag value, kept as the original wire text.
    Value(String),
    /// Repeating group: ordered list of entry containers. The wire count
    /// equals the list length.
    Group(Vec<FixContainer>),
    /// Decode-time marker: the tag repeated although the protocol profile
    /// declares no group for it. Any scalar read fails.
    Repeated,
}

/// Ordered tag/value container with nested repeating groups.
///
/// Entries keep insertion order; a non-group tag appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixContainer {
    entries: SmallVec<[(u32, FieldEntry); 16]>,
}

impl FixContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a tag value. Fails if the tag is already present.
    ///
    /// # Arguments
    /// * `tag` - Tag number
    /// * `value` - Value, converted to its string form
    ///
    /// # Errors
    /// Returns [`MessageError::DuplicatedTag`] when the tag already exists.
    pub fn set(&mut self, tag: u32, value: impl fmt::Display) -> Result<(), MessageError> {
        if self.index_of(tag).is_some() {
            return Err(MessageError::DuplicatedTag { tag });
        }
        self.entries.push((tag, FieldEntry::Value(value.to_string())));
        Ok(())
    }

    /// Sets a tag value, replacing any existing entry in place.
    pub fn set_replace(&mut self, tag: u32, value: impl fmt::Display) {
        match self.index_of(tag) {
            Some(i) => self.entries[i].1 = FieldEntry::Value(value.to_string()),
            None => self.entries.push((tag, FieldEntry::Value(value.to_string()))),
        }
    }

    /// Marks a tag as repeated. Used by the decoder when a non-group tag
    /// occurs more than once in a frame.
    pub fn mark_repeated(&mut self, tag: u32) {
        match self.index_of(tag) {
            Some(i) => self.entries[i].1 = FieldEntry::Repeated,
            None => self.entries.push((tag, FieldEntry::Repeated)),
        }
    }

    /// Gets a scalar tag value.
    ///
    /// # Errors
    /// - [`MessageError::TagNotFound`] when absent
    /// - [`MessageError::NotAScalar`] for group tags
    /// - [`MessageError::RepeatingTag`] for repeated-marker tags
    pub fn get(&self, tag: u32) -> Result<&str, MessageError> {
        match self.entry(tag) {
            None => Err(MessageError::TagNotFound { tag }),
            Some(FieldEntry::Value(v)) => Ok(v),
            Some(FieldEntry::Group(_)) => Err(MessageError::NotAScalar { tag }),
            Some(FieldEntry::Repeated) => Err(MessageError::RepeatingTag { tag }),
        }
    }

    /// Gets a scalar tag value, or `default` when the tag is absent.
    ///
    /// # Errors
    /// Same as [`FixContainer::get`], except absence.
    pub fn get_or<'a>(&'a self, tag: u32, default: &'a str) -> Result<&'a str, MessageError> {
        match self.get(tag) {
            Ok(v) => Ok(v),
            Err(MessageError::TagNotFound { .. }) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Gets a scalar tag value parsed as `T`.
    ///
    /// # Errors
    /// [`MessageError::InvalidValue`] when parsing fails, plus the
    /// [`FixContainer::get`] failures.
    pub fn get_parsed<T: FromStr>(&self, tag: u32) -> Result<T, MessageError> {
        let raw = self.get(tag)?;
        raw.parse().map_err(|_| MessageError::InvalidValue {
            tag,
            reason: format!("cannot parse `{}` as {}", raw, std::any::type_name::<T>()),
        })
    }

    /// Gets a scalar tag value as a [`Decimal`].
    ///
    /// # Errors
    /// Same as [`FixContainer::get_parsed`].
    pub fn get_decimal(&self, tag: u32) -> Result<Decimal, MessageError> {
        self.get_parsed(tag)
    }

    /// Gets a boolean tag value ("Y"/"N").
    ///
    /// # Errors
    /// [`MessageError::InvalidValue`] for anything but "Y" or "N".
    pub fn get_bool(&self, tag: u32) -> Result<bool, MessageError> {
        match self.get(tag)? {
            "Y" => Ok(true),
            "N" => Ok(false),
            other => Err(MessageError::InvalidValue {
                tag,
                reason: format!("expected Y or N, got `{other}`"),
            }),
        }
    }

    /// Gets a single-character tag value.
    ///
    /// # Errors
    /// [`MessageError::InvalidValue`] when the value is not one character.
    pub fn get_char(&self, tag: u32) -> Result<char, MessageError> {
        let raw = self.get(tag)?;
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(MessageError::InvalidValue {
                tag,
                reason: format!("expected single character, got `{raw}`"),
            }),
        }
    }

    /// Returns true when the tag is present (scalar, group or marker).
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.index_of(tag).is_some()
    }

    /// Removes a tag, returning its entry when present.
    pub fn remove(&mut self, tag: u32) -> Option<FieldEntry> {
        self.index_of(tag).map(|i| self.entries.remove(i).1)
    }

    /// Checks whether a tag is a repeating group.
    ///
    /// Returns `None` when absent, `Some(true)` for a group, `Some(false)`
    /// for a scalar or marker.
    #[must_use]
    pub fn is_group(&self, tag: u32) -> Option<bool> {
        self.entry(tag)
            .map(|e| matches!(e, FieldEntry::Group(_)))
    }

    /// Appends one entry container to a repeating group, creating the group
    /// when the tag is new.
    ///
    /// # Errors
    /// [`MessageError::NotAGroup`] when the tag exists as a scalar.
    pub fn add_group(&mut self, tag: u32, entry: FixContainer) -> Result<(), MessageError> {
        match self.index_of(tag) {
            None => {
                self.entries.push((tag, FieldEntry::Group(vec![entry])));
                Ok(())
            }
            Some(i) => match &mut self.entries[i].1 {
                FieldEntry::Group(list) => {
                    list.push(entry);
                    Ok(())
                }
                _ => Err(MessageError::NotAGroup { tag }),
            },
        }
    }

    /// Sets all entries of a repeating group at once.
    ///
    /// # Errors
    /// [`MessageError::DuplicatedTag`] when the tag already exists.
    pub fn set_group(&mut self, tag: u32, entries: Vec<FixContainer>) -> Result<(), MessageError> {
        if self.index_of(tag).is_some() {
            return Err(MessageError::DuplicatedTag { tag });
        }
        self.entries.push((tag, FieldEntry::Group(entries)));
        Ok(())
    }

    /// Returns the entry containers of a repeating group.
    ///
    /// # Errors
    /// - [`MessageError::TagNotFound`] when absent
    /// - [`MessageError::UnmappedGroup`] when the tag exists but did not
    ///   decode as a group (the protocol profile does not declare it)
    pub fn group_list(&self, tag: u32) -> Result<&[FixContainer], MessageError> {
        match self.entry(tag) {
            None => Err(MessageError::TagNotFound { tag }),
            Some(FieldEntry::Group(list)) => Ok(list),
            Some(_) => Err(MessageError::UnmappedGroup { tag }),
        }
    }

    /// Returns one repeating group entry by index.
    ///
    /// # Errors
    /// [`MessageError::TagNotFound`] when the index is out of range, plus the
    /// [`FixContainer::group_list`] failures.
    pub fn group_by_index(&self, tag: u32, index: usize) -> Result<&FixContainer, MessageError> {
        self.group_list(tag)?
            .get(index)
            .ok_or(MessageError::TagNotFound { tag })
    }

    /// Finds a repeating group entry whose member `gtag` equals `gvalue`.
    ///
    /// # Errors
    /// [`MessageError::TagNotFound`] when no entry matches.
    pub fn group_by_tag(
        &self,
        tag: u32,
        gtag: u32,
        gvalue: &str,
    ) -> Result<&FixContainer, MessageError> {
        for entry in self.group_list(tag)? {
            if entry.get(gtag).map(|v| v == gvalue).unwrap_or(false) {
                return Ok(entry);
            }
        }
        Err(MessageError::TagNotFound { tag: gtag })
    }

    /// Iterates tags in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|(t, _)| *t)
    }

    /// Iterates `(tag, entry)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &FieldEntry)> {
        self.entries.iter().map(|(t, e)| (*t, e))
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the container has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index_of(&self, tag: u32) -> Option<usize> {
        self.entries.iter().position(|(t, _)| *t == tag)
    }

    fn entry(&self, tag: u32) -> Option<&FieldEntry> {
        self.entries.iter().find(|(t, _)| *t == tag).map(|(_, e)| e)
    }
}

impl fmt::Display for FixContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (tag, entry) in self.entries() {
            if !first {
                write!(f, "|")?;
            }
            first = false;
            match entry {
                FieldEntry::Value(v) => write!(f, "{tag}={v}")?,
                FieldEntry::Repeated => write!(f, "{tag}=#err#")?,
                FieldEntry::Group(list) => {
                    write!(f, "{tag}={}=>[", list.len())?;
                    for (i, g) in list.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{{{g}}}")?;
                    }
                    write!(f, "]")?;
                }
            }
        }
        Ok(())
    }
}

/// A FIX message: a [`FixContainer`] plus an immutable message type.
#[derive(Debug, Clone, PartialEq)]
pub struct FixMessage {
    msg_type: MsgType,
    container: FixContainer,
}

impl FixMessage {
    /// Creates an empty message of the given type.
    #[must_use]
    pub fn new(msg_type: impl Into<MsgType>) -> Self {
        Self {
            msg_type: msg_type.into(),
            container: FixContainer::new(),
        }
    }

    /// Creates a message and sets the given tags in order.
    ///
    /// # Errors
    /// Propagates [`FixMessage::set`] failures.
    pub fn with_fields<'a>(
        msg_type: impl Into<MsgType>,
        fields: impl IntoIterator<Item = (u32, &'a str)>,
    ) -> Result<Self, MessageError> {
        let mut msg = Self::new(msg_type);
        for (tag, value) in fields {
            msg.set(tag, value)?;
        }
        Ok(msg)
    }

    /// Returns the message type.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> &MsgType {
        &self.msg_type
    }

    /// Sets a tag value, rejecting encoder-owned framing tags.
    ///
    /// MsgSeqNum (34) is accepted only on session-class messages, which carry
    /// it on the raw-sequence paths (gap fills, replays).
    ///
    /// # Errors
    /// [`MessageError::ReservedTag`] for framing tags, plus the container
    /// failures.
    pub fn set(&mut self, tag: u32, value: impl fmt::Display) -> Result<(), MessageError> {
        self.check_reserved(tag)?;
        self.container.set(tag, value)
    }

    /// Sets a tag value with replacement, rejecting framing tags.
    ///
    /// # Errors
    /// [`MessageError::ReservedTag`] for framing tags.
    pub fn set_replace(&mut self, tag: u32, value: impl fmt::Display) -> Result<(), MessageError> {
        self.check_reserved(tag)?;
        self.container.set_replace(tag, value);
        Ok(())
    }

    /// Sets a tag value without the reserved-tag ownership check.
    ///
    /// This is the decoder's and the session engine's entry point for
    /// framing tags; application code should use [`FixMessage::set`].
    pub fn set_raw(&mut self, tag: u32, value: impl fmt::Display) {
        self.container.set_replace(tag, value);
    }

    /// Consumes the message, returning its container.
    #[must_use]
    pub fn into_container(self) -> FixContainer {
        self.container
    }

    fn check_reserved(&self, tag: u32) -> Result<(), MessageError> {
        if RESERVED_TAGS.contains(&tag) {
            return Err(MessageError::ReservedTag { tag });
        }
        if tag == tags::MSG_SEQ_NUM && !self.msg_type.is_admin() {
            return Err(MessageError::ReservedTag { tag });
        }
        Ok(())
    }
}

impl Deref for FixMessage {
    type Target = FixContainer;

    fn deref(&self) -> &Self::Target {
        &self.container
    }
}

impl DerefMut for FixMessage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.container
    }
}

impl fmt::Display for FixMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg_type={}|{}", self.msg_type, self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut c = FixContainer::new();
        c.set(11, "ORDER1").unwrap();
        c.set(38, 20).unwrap();
        assert_eq!(c.get(11).unwrap(), "ORDER1");
        assert_eq!(c.get(38).unwrap(), "20");
        assert_eq!(c.get_parsed::<u64>(38).unwrap(), 20);
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut c = FixContainer::new();
        c.set(11, "A").unwrap();
        assert_eq!(
            c.set(11, "B"),
            Err(MessageError::DuplicatedTag { tag: 11 })
        );
        c.set_replace(11, "B");
        assert_eq!(c.get(11).unwrap(), "B");
    }

    #[test]
    fn test_tag_not_found() {
        let c = FixContainer::new();
        assert_eq!(c.get(99), Err(MessageError::TagNotFound { tag: 99 }));
        assert_eq!(c.get_or(99, "N").unwrap(), "N");
    }

    #[test]
    fn test_repeated_marker() {
        let mut c = FixContainer::new();
        c.set(55, "AAPL").unwrap();
        c.mark_repeated(55);
        assert_eq!(c.get(55), Err(MessageError::RepeatingTag { tag: 55 }));
    }

    #[test]
    fn test_group_accessors() {
        let mut c = FixContainer::new();
        let mut g1 = FixContainer::new();
        g1.set(70, "A").unwrap();
        let mut g2 = FixContainer::new();
        g2.set(70, "B").unwrap();
        c.set_group(78, vec![g1, g2]).unwrap();

        assert_eq!(c.is_group(78), Some(true));
        let list = c.group_list(78).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].get(70).unwrap(), "A");
        assert_eq!(c.group_by_index(78, 1).unwrap().get(70).unwrap(), "B");
        assert_eq!(c.group_by_tag(78, 70, "B").unwrap().get(70).unwrap(), "B");

        // scalar read of a group tag is a usage error
        assert_eq!(c.get(78), Err(MessageError::NotAScalar { tag: 78 }));
    }

    #[test]
    fn test_group_list_on_scalar() {
        let mut c = FixContainer::new();
        c.set(55, "AAPL").unwrap();
        assert_eq!(
            c.group_list(55),
            Err(MessageError::UnmappedGroup { tag: 55 })
        );
        assert_eq!(c.group_list(78), Err(MessageError::TagNotFound { tag: 78 }));
    }

    #[test]
    fn test_add_group_appends() {
        let mut c = FixContainer::new();
        let mut g = FixContainer::new();
        g.set(448, "BRK").unwrap();
        c.add_group(453, g.clone()).unwrap();
        c.add_group(453, g).unwrap();
        assert_eq!(c.group_list(453).unwrap().len(), 2);
    }

    #[test]
    fn test_insertion_order_kept() {
        let mut c = FixContainer::new();
        for tag in [55, 11, 44, 38] {
            c.set(tag, tag).unwrap();
        }
        let order: Vec<u32> = c.tags().collect();
        assert_eq!(order, vec![55, 11, 44, 38]);
    }

    #[test]
    fn test_typed_accessors() {
        let mut c = FixContainer::new();
        c.set(44, "100.5").unwrap();
        c.set(43, "Y").unwrap();
        c.set(54, "1").unwrap();
        assert_eq!(c.get_decimal(44).unwrap().to_string(), "100.5");
        assert!(c.get_bool(43).unwrap());
        assert_eq!(c.get_char(54).unwrap(), '1');
        assert_eq!(c.get(44).unwrap(), "100.5");
    }

    #[test]
    fn test_message_reserved_tags() {
        let mut m = FixMessage::new("D");
        assert_eq!(
            m.set(8, "FIX.4.4"),
            Err(MessageError::ReservedTag { tag: 8 })
        );
        assert_eq!(m.set(35, "D"), Err(MessageError::ReservedTag { tag: 35 }));
        assert_eq!(m.set(34, 5), Err(MessageError::ReservedTag { tag: 34 }));
        m.set(11, "C1").unwrap();
    }

    #[test]
    fn test_admin_message_may_set_seq_num() {
        let mut m = FixMessage::new(MsgType::SequenceReset);
        m.set(34, 7).unwrap();
        m.set(36, 12).unwrap();
        assert_eq!(m.get_parsed::<u64>(34).unwrap(), 7);
    }

    #[test]
    fn test_with_fields() {
        let m = FixMessage::with_fields(
            "D",
            [(11, "C1"), (55, "AAPL"), (54, "1")],
        )
        .unwrap();
        assert_eq!(m.msg_type(), &MsgType::NewOrderSingle);
        assert_eq!(m.get(55).unwrap(), "AAPL");
    }

    #[test]
    fn test_display() {
        let mut m = FixMessage::new("D");
        m.set(11, "C1").unwrap();
        let mut g = FixContainer::new();
        g.set(70, "A").unwrap();
        m.add_group(78, g).unwrap();
        let text = m.to_string();
        assert!(text.starts_with("msg_type=D|11=C1|78=1=>["));
    }
}
