/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Schema model and message validation.
//!
//! This module defines the structures a loaded QuickFIX dictionary is made
//! of:
//! - [`SchemaField`]: a field with its FIX type and optional enum values
//! - [`SchemaSet`]: ordered membership shared by components, groups, the
//!   header and messages
//! - [`SchemaGroup`], [`SchemaMessage`]: group and message specializations
//! - [`FixSchema`]: the loaded dictionary and its `validate` entry point

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ferrofix_core::error::SchemaError;
use ferrofix_core::message::{FieldEntry, FixContainer, FixMessage};
use ferrofix_core::tags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// FIX field data type, as named in the dictionary XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Integer value.
    Int,
    /// Length prefix for data fields.
    Length,
    /// Sequence number (positive integer).
    SeqNum,
    /// Repeating group counter (positive integer).
    NumInGroup,
    /// Tag number reference.
    TagNum,
    /// Day of month (1-31).
    DayOfMonth,
    /// Floating point number.
    Float,
    /// Quantity.
    Qty,
    /// Price.
    Price,
    /// Price offset.
    PriceOffset,
    /// Monetary amount.
    Amt,
    /// Percentage.
    Percentage,
    /// Single character.
    Char,
    /// Boolean (Y/N).
    Boolean,
    /// Free-form string.
    String,
    /// Space-separated character values.
    MultipleCharValue,
    /// Space-separated string values.
    MultipleStringValue,
    /// ISO 3166 country code.
    Country,
    /// ISO 4217 currency code.
    Currency,
    /// ISO 10383 market identifier.
    Exchange,
    /// Month of year, optionally with day or week.
    MonthYear,
    /// UTC timestamp.
    UtcTimestamp,
    /// UTC time of day.
    UtcTimeOnly,
    /// UTC date.
    UtcDateOnly,
    /// Local market date.
    LocalMktDate,
    /// Raw data.
    Data,
    /// XML payload.
    XmlData,
    /// ISO 639-1 language code.
    Language,
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "INT" => Self::Int,
            "LENGTH" => Self::Length,
            "SEQNUM" => Self::SeqNum,
            "NUMINGROUP" => Self::NumInGroup,
            "TAGNUM" => Self::TagNum,
            "DAYOFMONTH" => Self::DayOfMonth,
            "FLOAT" => Self::Float,
            "QTY" | "QUANTITY" => Self::Qty,
            "PRICE" => Self::Price,
            "PRICEOFFSET" => Self::PriceOffset,
            "AMT" | "AMOUNT" => Self::Amt,
            "PERCENTAGE" => Self::Percentage,
            "CHAR" => Self::Char,
            "BOOLEAN" => Self::Boolean,
            "MULTIPLECHARVALUE" => Self::MultipleCharValue,
            "MULTIPLESTRINGVALUE" => Self::MultipleStringValue,
            "COUNTRY" => Self::Country,
            "CURRENCY" => Self::Currency,
            "EXCHANGE" => Self::Exchange,
            "MONTHYEAR" => Self::MonthYear,
            "UTCTIMESTAMP" => Self::UtcTimestamp,
            "UTCTIMEONLY" => Self::UtcTimeOnly,
            "UTCDATEONLY" => Self::UtcDateOnly,
            "LOCALMKTDATE" => Self::LocalMktDate,
            "DATA" => Self::Data,
            "XMLDATA" => Self::XmlData,
            "LANGUAGE" => Self::Language,
            other => {
                if other != "STRING" {
                    warn!(field_type = other, "unsupported field type, treating as STRING");
                }
                Self::String
            }
        })
    }
}

/// One field definition: tag, name, type and optional enumerated values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field tag number.
    pub tag: u32,
    /// Field name.
    pub name: String,
    /// Field data type.
    pub ftype: FieldType,
    /// Valid values for enumerated fields (wire value to description).
    pub values: HashMap<String, String>,
}

impl SchemaField {
    /// Creates a field definition without enumerated values.
    #[must_use]
    pub fn new(tag: u32, name: impl Into<String>, ftype: FieldType) -> Self {
        Self {
            tag,
            name: name.into(),
            ftype,
            values: HashMap::new(),
        }
    }

    /// Returns true when this field can count a repeating group: a
    /// NUMINGROUP/INT type with a `No`/`Num` name.
    #[must_use]
    pub fn is_group_counter(&self) -> bool {
        (self.name.contains("No") || self.name.contains("Num"))
            && matches!(self.ftype, FieldType::NumInGroup | FieldType::Int)
    }

    /// Validates a raw wire value against this field's type and enum map.
    ///
    /// # Errors
    /// [`SchemaError::InvalidValue`] when the value does not conform.
    pub fn validate_value(&self, value: &str) -> Result<(), SchemaError> {
        let fail = |reason: &str| -> SchemaError {
            SchemaError::InvalidValue {
                name: self.name.clone(),
                tag: self.tag,
                value: value.to_string(),
                reason: reason.to_string(),
            }
        };

        if value.is_empty() {
            return Err(fail("empty value"));
        }

        if !self.values.is_empty() {
            if self.values.contains_key(value) {
                return Ok(());
            }
            return Err(fail("not a defined enum value"));
        }

        let err: Option<&str> = match self.ftype {
            FieldType::Int | FieldType::TagNum => check_int(value, false, false, None),
            FieldType::SeqNum | FieldType::NumInGroup => {
                // EndSeqNo carries 0 as "through the last message sent"
                if self.tag == tags::END_SEQ_NO && value == "0" {
                    None
                } else {
                    check_int(value, true, true, None)
                }
            }
            FieldType::DayOfMonth => check_int(value, false, false, Some((1, 31))),
            FieldType::Float
            | FieldType::Qty
            | FieldType::Price
            | FieldType::PriceOffset
            | FieldType::Amt
            | FieldType::Percentage => check_float(value),
            FieldType::String
            | FieldType::MultipleStringValue
            | FieldType::MultipleCharValue
            | FieldType::Language => check_str(value, None, false),
            FieldType::Char => check_str(value, Some(1), false),
            FieldType::Boolean => {
                if value == "Y" || value == "N" {
                    None
                } else {
                    Some("expected Y or N")
                }
            }
            FieldType::Country => check_str(value, Some(2), true),
            FieldType::Currency => check_str(value, Some(3), true),
            FieldType::Exchange => check_str(value, Some(4), true),
            FieldType::UtcTimestamp => check_timestamp(value),
            FieldType::UtcDateOnly | FieldType::LocalMktDate => check_date(value),
            FieldType::UtcTimeOnly => check_time(value),
            FieldType::MonthYear => check_month_year(value),
            FieldType::Data | FieldType::Length | FieldType::XmlData => None,
        };

        match err {
            None => Ok(()),
            Some(reason) => Err(fail(reason)),
        }
    }
}

impl fmt::Display for SchemaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.tag)
    }
}

fn check_int(value: &str, no_zero: bool, no_negative: bool, range: Option<(i64, i64)>) -> Option<&'static str> {
    let Ok(v) = value.parse::<i64>() else {
        return Some("not an integer");
    };
    if no_zero && v == 0 {
        return Some("zero value");
    }
    if no_negative && v < 0 {
        return Some("negative value");
    }
    if let Some((lo, hi)) = range
        && !(lo..=hi).contains(&v)
    {
        return Some("out of range");
    }
    None
}

fn check_float(value: &str) -> Option<&'static str> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => None,
        Ok(_) => Some("not a finite number"),
        Err(_) => Some("not a number"),
    }
}

fn check_str(value: &str, max_len: Option<usize>, alpha_num: bool) -> Option<&'static str> {
    if value.contains('\x01') {
        return Some("value contains SOH");
    }
    if value.contains('=') {
        return Some("value contains `=`");
    }
    if let Some(max) = max_len
        && value.chars().count() > max
    {
        return Some("max length exceeded");
    }
    if alpha_num && !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some("value contains non-alphanumeric characters");
    }
    None
}

fn check_timestamp(value: &str) -> Option<&'static str> {
    let fmt = if value.contains('.') {
        "%Y%m%d-%H:%M:%S%.f"
    } else {
        "%Y%m%d-%H:%M:%S"
    };
    if NaiveDateTime::parse_from_str(value, fmt).is_ok() {
        None
    } else {
        Some("not a UTC timestamp")
    }
}

fn check_date(value: &str) -> Option<&'static str> {
    if NaiveDate::parse_from_str(value, "%Y%m%d").is_ok() {
        None
    } else {
        Some("not a YYYYMMDD date")
    }
}

fn check_time(value: &str) -> Option<&'static str> {
    let fmt = if value.contains('.') {
        "%H:%M:%S%.f"
    } else {
        "%H:%M:%S"
    };
    if NaiveTime::parse_from_str(value, fmt).is_ok() {
        None
    } else {
        Some("not a HH:MM:SS time")
    }
}

/// MonthYear accepts YYYYMM, YYYYMMDD and YYYYMMw1..w5.
fn check_month_year(value: &str) -> Option<&'static str> {
    let (prefix, week) = match value.char_indices().find(|&(_, c)| c == 'w') {
        Some((pos, _)) => (&value[..pos], Some(&value[pos..])),
        None => (value, None),
    };
    if let Some(week) = week
        && !matches!(week, "w1" | "w2" | "w3" | "w4" | "w5")
    {
        return Some("week code must be w1..w5");
    }
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Some("not numeric");
    }
    match (prefix.len(), week) {
        (6, _) => match prefix[4..6].parse::<u32>() {
            Ok(month) if (1..=12).contains(&month) => None,
            _ => Some("month must be 01..12"),
        },
        (8, None) => check_date(prefix),
        _ => Some("expected YYYYMM, YYYYMMDD or YYYYMMww"),
    }
}

/// A member of a schema set: a plain field or a nested repeating group.
#[derive(Debug, Clone)]
pub enum SchemaMember {
    /// Plain field.
    Field(SchemaField),
    /// Nested repeating group.
    Group(SchemaGroup),
}

impl SchemaMember {
    /// Tag this member occupies in a message: the field tag, or the group's
    /// counter tag.
    #[must_use]
    pub fn tag(&self) -> u32 {
        match self {
            Self::Field(f) => f.tag,
            Self::Group(g) => g.field.tag,
        }
    }

    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field(f) => &f.name,
            Self::Group(g) => &g.field.name,
        }
    }
}

/// Ordered membership shared by the header, components, groups and messages.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    /// Set name (component/message name, group field name, or "Header").
    pub name: String,
    members: Vec<(SchemaMember, bool)>,
}

impl SchemaSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Appends a field member.
    pub fn add_field(&mut self, field: SchemaField, required: bool) {
        self.members.push((SchemaMember::Field(field), required));
    }

    /// Appends a group member.
    pub fn add_group(&mut self, group: SchemaGroup, required: bool) {
        self.members.push((SchemaMember::Group(group), required));
    }

    /// Merges (flattens) another set's members into this one, as component
    /// references do.
    pub fn merge(&mut self, other: &SchemaSet) {
        for (member, required) in &other.members {
            self.members.push((member.clone(), *required));
        }
    }

    /// Iterates `(member, required)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&SchemaMember, bool)> {
        self.members.iter().map(|(m, r)| (m, *r))
    }

    /// Finds a member by the tag it occupies.
    #[must_use]
    pub fn member_by_tag(&self, tag: u32) -> Option<(&SchemaMember, bool)> {
        self.members
            .iter()
            .find(|(m, _)| m.tag() == tag)
            .map(|(m, r)| (m, *r))
    }

    /// Returns true when a member occupies the tag.
    #[must_use]
    pub fn contains_tag(&self, tag: u32) -> bool {
        self.member_by_tag(tag).is_some()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true when the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Repeating group schema: the counter field plus the entry membership.
#[derive(Debug, Clone)]
pub struct SchemaGroup {
    /// The NUMINGROUP counter field.
    pub field: SchemaField,
    /// Whether the group is required where it appears.
    pub required: bool,
    /// Entry membership; the first member is the entry delimiter.
    pub set: SchemaSet,
}

impl SchemaGroup {
    /// Creates a group for its counter field.
    ///
    /// # Errors
    /// [`SchemaError::BadGroupField`] when the field cannot count a group.
    pub fn new(field: SchemaField, required: bool) -> Result<Self, SchemaError> {
        if !field.is_group_counter() {
            return Err(SchemaError::BadGroupField {
                name: field.name.clone(),
            });
        }
        let name = field.name.clone();
        Ok(Self {
            field,
            required,
            set: SchemaSet::new(name),
        })
    }

    /// Validates every entry of a decoded repeating group.
    ///
    /// Each entry may only carry member tags, must start from the group's
    /// first member, must keep the schema's member order, and must carry all
    /// required members. Nested groups recurse.
    ///
    /// # Errors
    /// [`SchemaError`] describing the first violation found.
    pub fn validate_group(&self, entries: &[FixContainer]) -> Result<(), SchemaError> {
        let entry_err = |reason: String| -> SchemaError {
            SchemaError::InvalidGroupEntry {
                name: self.field.name.clone(),
                tag: self.field.tag,
                reason,
            }
        };

        for entry in entries {
            let mut has_first_tag = false;
            let mut prev_index: Option<usize> = None;

            for (tag, value) in entry.entries() {
                let Some(index) = self
                    .set
                    .iter()
                    .position(|(m, _)| m.tag() == tag)
                else {
                    return Err(entry_err(format!("tag={tag} is not a group member")));
                };
                if index == 0 {
                    has_first_tag = true;
                }
                if prev_index.is_some_and(|prev| prev > index) {
                    return Err(entry_err(format!("tag={tag} out of member order")));
                }
                prev_index = Some(index);

                let Some((member, _)) = self.set.member_by_tag(tag) else {
                    continue;
                };
                match member {
                    SchemaMember::Field(field) => match value {
                        FieldEntry::Value(v) => field.validate_value(v)?,
                        _ => {
                            return Err(entry_err(format!("tag={tag} must be a plain field")));
                        }
                    },
                    SchemaMember::Group(nested) => match value {
                        FieldEntry::Group(sub_entries) => nested.validate_group(sub_entries)?,
                        _ => {
                            return Err(entry_err(format!("tag={tag} must be a nested group")));
                        }
                    },
                }
            }

            if !has_first_tag {
                return Err(entry_err("missing the mandatory first member".to_string()));
            }

            for (member, required) in self.set.iter() {
                if required
                    && let SchemaMember::Field(field) = member
                    && !entry.contains(field.tag)
                {
                    return Err(SchemaError::MissingRequiredField {
                        name: field.name.clone(),
                        tag: field.tag,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Message category from the dictionary (`msgcat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgCat {
    /// Administrative (session level) message.
    Admin,
    /// Application message.
    App,
}

/// Message schema: membership plus wire type and category.
#[derive(Debug, Clone)]
pub struct SchemaMessage {
    /// MsgType (35) value.
    pub msg_type: String,
    /// Message category.
    pub msg_cat: MsgCat,
    /// Message membership.
    pub set: SchemaSet,
}

/// A loaded FIX dictionary, keyed by tag and by message type.
#[derive(Debug, Default)]
pub struct FixSchema {
    pub(crate) fields_by_tag: HashMap<u32, SchemaField>,
    pub(crate) fields_by_name: HashMap<String, u32>,
    pub(crate) header: SchemaSet,
    pub(crate) components: HashMap<String, SchemaSet>,
    pub(crate) messages_by_type: HashMap<String, SchemaMessage>,
}

impl FixSchema {
    /// Looks up a field definition by tag.
    #[must_use]
    pub fn field_by_tag(&self, tag: u32) -> Option<&SchemaField> {
        self.fields_by_tag.get(&tag)
    }

    /// Looks up a field definition by name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&SchemaField> {
        self.fields_by_name
            .get(name)
            .and_then(|tag| self.fields_by_tag.get(tag))
    }

    /// Looks up a message schema by its MsgType value.
    #[must_use]
    pub fn message_by_type(&self, msg_type: &str) -> Option<&SchemaMessage> {
        self.messages_by_type.get(msg_type)
    }

    /// Looks up a component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&SchemaSet> {
        self.components.get(name)
    }

    /// The header membership.
    #[must_use]
    pub fn header(&self) -> &SchemaSet {
        &self.header
    }

    /// Validates a message against the schema.
    ///
    /// Checks the required header fields, the message's required membership,
    /// every present value against its field type, group structure entry by
    /// entry, and rejects any tag the composition does not define.
    ///
    /// # Errors
    /// [`SchemaError`] describing the first violation found.
    pub fn validate(&self, msg: &FixMessage) -> Result<(), SchemaError> {
        let msg_type = msg.msg_type().as_str();
        let Some(schema_msg) = self.messages_by_type.get(msg_type) else {
            return Err(SchemaError::UnknownMsgType {
                msg_type: msg_type.to_string(),
            });
        };

        // required membership
        for (member, required) in schema_msg.set.iter() {
            if required && !msg.contains(member.tag()) {
                return Err(SchemaError::MissingRequiredField {
                    name: member.name().to_string(),
                    tag: member.tag(),
                });
            }
        }

        // header requirements apply to framed messages only
        if msg.contains(tags::BEGIN_STRING) {
            self.validate_header(msg)?;
        }

        for (tag, entry) in msg.entries() {
            if tag == tags::CHECK_SUM {
                continue;
            }
            let Some(field) = self.fields_by_tag.get(&tag) else {
                return Err(SchemaError::UnknownTag { tag });
            };
            if self.header.contains_tag(tag) {
                continue;
            }

            let Some((member, _)) = schema_msg.set.member_by_tag(tag) else {
                return Err(SchemaError::FieldNotAllowed {
                    name: field.name.clone(),
                    tag,
                    msg: schema_msg.set.name.clone(),
                });
            };

            match member {
                SchemaMember::Field(field) => match entry {
                    FieldEntry::Value(v) => field.validate_value(v)?,
                    FieldEntry::Group(_) => {
                        return Err(SchemaError::GroupMismatch {
                            tag,
                            reason: "must be a plain field, got a group".to_string(),
                        });
                    }
                    FieldEntry::Repeated => {
                        return Err(SchemaError::GroupMismatch {
                            tag,
                            reason: "tag was repeated outside any declared group".to_string(),
                        });
                    }
                },
                SchemaMember::Group(group) => match entry {
                    FieldEntry::Group(entries) => group.validate_group(entries)?,
                    _ => {
                        return Err(SchemaError::GroupMismatch {
                            tag,
                            reason: "must be a repeating group".to_string(),
                        });
                    }
                },
            }
        }

        Ok(())
    }

    fn validate_header(&self, msg: &FixMessage) -> Result<(), SchemaError> {
        for (member, required) in self.header.iter() {
            if !required {
                continue;
            }
            if let SchemaMember::Field(field) = member {
                match msg.get(field.tag) {
                    Ok(value) => field.validate_value(value)?,
                    Err(_) => {
                        return Err(SchemaError::MissingRequiredField {
                            name: field.name.clone(),
                            tag: field.tag,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
