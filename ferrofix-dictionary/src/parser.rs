/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! QuickFIX XML dictionary loading.
//!
//! The document carries `<fields>`, `<header>`, `<components>` and
//! `<messages>` sections. Build order matters: fields first, then the
//! header, then components, then messages. Components may reference
//! components defined later in the file, so component parsing loops over a
//! pending queue until every reference resolves; a queue that stops
//! shrinking is a genuine circular reference and fails the load.

use crate::schema::{
    FieldType, FixSchema, MsgCat, SchemaField, SchemaGroup, SchemaMessage, SchemaSet,
};
use ferrofix_core::error::SchemaError;
use roxmltree::{Document, Node};
use std::str::FromStr;

/// Parses a QuickFIX dictionary document.
///
/// # Arguments
/// * `xml` - The document text
///
/// # Errors
/// [`SchemaError`] on malformed XML, unresolved references or bad group
/// fields.
pub fn load_schema(xml: &str) -> Result<FixSchema, SchemaError> {
    let doc = Document::parse(xml).map_err(|e| SchemaError::Parse {
        reason: e.to_string(),
    })?;
    let root = doc.root_element();

    let mut schema = FixSchema::default();

    let fields_node = section(&root, "fields")?;
    for field_node in fields_node.children().filter(|n| n.is_element()) {
        let field = parse_field(&field_node)?;
        schema.fields_by_name.insert(field.name.clone(), field.tag);
        schema.fields_by_tag.insert(field.tag, field);
    }

    let header_node = section(&root, "header")?;
    schema.header = parse_set(&schema, SchemaSet::new("Header"), &header_node)?
        .ok_or_else(|| SchemaError::UnresolvedComponents {
            names: vec!["Header".to_string()],
        })?;

    // components resolve forward references over a pending queue
    if let Ok(components_node) = section(&root, "components") {
        let mut pending: Vec<Node<'_, '_>> = components_node
            .children()
            .filter(|n| n.is_element())
            .collect();
        let mut prev_len = pending.len() + 1;
        while !pending.is_empty() {
            if pending.len() == prev_len {
                return Err(SchemaError::UnresolvedComponents {
                    names: pending.iter().map(|n| attr_owned(n, "name")).collect(),
                });
            }
            prev_len = pending.len();

            let mut still_pending = Vec::new();
            for node in pending {
                let name = attr(&node, "name")?;
                match parse_set(&schema, SchemaSet::new(name), &node)? {
                    Some(set) => {
                        schema.components.insert(name.to_string(), set);
                    }
                    None => still_pending.push(node),
                }
            }
            pending = still_pending;
        }
    }

    let messages_node = section(&root, "messages")?;
    for message_node in messages_node.children().filter(|n| n.is_element()) {
        let name = attr(&message_node, "name")?;
        let msg_type = attr(&message_node, "msgtype")?;
        let msg_cat = match attr(&message_node, "msgcat")? {
            "admin" => MsgCat::Admin,
            _ => MsgCat::App,
        };

        let set = parse_set(&schema, SchemaSet::new(name), &message_node)?.ok_or_else(|| {
            SchemaError::UnresolvedComponents {
                names: vec![name.to_string()],
            }
        })?;
        schema.messages_by_type.insert(
            msg_type.to_string(),
            SchemaMessage {
                msg_type: msg_type.to_string(),
                msg_cat,
                set,
            },
        );
    }

    Ok(schema)
}

/// Parses the members of a header/component/group/message element into
/// `set`. Returns `None` when the element references a component that is
/// not resolved yet.
fn parse_set(
    schema: &FixSchema,
    mut set: SchemaSet,
    element: &Node<'_, '_>,
) -> Result<Option<SchemaSet>, SchemaError> {
    for child in element.children().filter(|n| n.is_element()) {
        let required = attr(&child, "required").unwrap_or("N").eq_ignore_ascii_case("y");
        match child.tag_name().name() {
            "field" => {
                let name = attr(&child, "name")?;
                let field = schema
                    .field_by_name(name)
                    .ok_or_else(|| SchemaError::UnknownFieldName {
                        name: name.to_string(),
                    })?
                    .clone();
                set.add_field(field, required);
            }
            "component" => {
                let name = attr(&child, "name")?;
                let Some(component) = schema.components.get(name) else {
                    // forward reference, retried by the caller's queue
                    return Ok(None);
                };
                set.merge(component);
            }
            "group" => {
                let Some(group) = parse_group(schema, &child)? else {
                    return Ok(None);
                };
                let required = group.required;
                set.add_group(group, required);
            }
            other => {
                return Err(SchemaError::Parse {
                    reason: format!("unexpected element `{other}` in `{}`", set.name),
                });
            }
        }
    }
    Ok(Some(set))
}

fn parse_group(
    schema: &FixSchema,
    element: &Node<'_, '_>,
) -> Result<Option<SchemaGroup>, SchemaError> {
    let name = attr(element, "name")?;
    let field = schema
        .field_by_name(name)
        .ok_or_else(|| SchemaError::UnknownFieldName {
            name: name.to_string(),
        })?
        .clone();
    let required = attr(element, "required").unwrap_or("N").eq_ignore_ascii_case("y");

    let group = SchemaGroup::new(field, required)?;
    let Some(set) = parse_set(schema, group.set.clone(), element)? else {
        return Ok(None);
    };
    Ok(Some(SchemaGroup { set, ..group }))
}

fn parse_field(element: &Node<'_, '_>) -> Result<SchemaField, SchemaError> {
    let number: u32 = attr(element, "number")?
        .parse()
        .map_err(|_| SchemaError::Parse {
            reason: format!("field number `{}` is not numeric", attr_owned(element, "number")),
        })?;
    let name = attr(element, "name")?;
    // unknown type names fall back to STRING
    let ftype = FieldType::from_str(attr(element, "type")?).unwrap_or(FieldType::String);

    let mut field = SchemaField::new(number, name, ftype);
    for value_node in element.children().filter(|n| n.is_element()) {
        if value_node.tag_name().name() != "value" {
            continue;
        }
        let key = attr(&value_node, "enum")?;
        let description = attr(&value_node, "description")?;
        field.values.insert(key.to_string(), description.to_string());
    }
    Ok(field)
}

fn section<'a, 'input>(
    root: &Node<'a, 'input>,
    name: &str,
) -> Result<Node<'a, 'input>, SchemaError> {
    root.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .ok_or_else(|| SchemaError::MissingSection {
            section: name.to_string(),
        })
}

fn attr<'a>(node: &Node<'a, '_>, name: &str) -> Result<&'a str, SchemaError> {
    node.attribute(name).ok_or_else(|| SchemaError::Parse {
        reason: format!(
            "element `{}` missing attribute `{name}`",
            node.tag_name().name()
        ),
    })
}

fn attr_owned(node: &Node<'_, '_>, name: &str) -> String {
    node.attribute(name).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use ferrofix_core::message::{FixContainer, FixMessage};

    /// Small dictionary exercising types, enums, components (with a forward
    /// reference), groups and nesting.
    const TEST_XML: &str = r#"
<fix major="4" minor="4">
 <header>
  <field name="BeginString" required="Y"/>
  <field name="BodyLength" required="Y"/>
  <field name="MsgType" required="Y"/>
  <field name="SenderCompID" required="Y"/>
  <field name="TargetCompID" required="Y"/>
  <field name="MsgSeqNum" required="Y"/>
  <field name="SendingTime" required="Y"/>
  <field name="PossDupFlag" required="N"/>
 </header>
 <messages>
  <message name="NewOrderSingle" msgtype="D" msgcat="app">
   <field name="ClOrdID" required="Y"/>
   <component name="Instrument" required="Y"/>
   <field name="Account" required="N"/>
   <field name="Side" required="Y"/>
   <field name="TransactTime" required="N"/>
   <field name="OrderQty" required="Y"/>
   <field name="OrdType" required="Y"/>
   <field name="Price" required="N"/>
   <component name="Parties" required="N"/>
  </message>
  <message name="Heartbeat" msgtype="0" msgcat="admin">
   <field name="TestReqID" required="N"/>
  </message>
 </messages>
 <components>
  <component name="Instrument">
   <component name="SecAltGrp"/>
   <field name="Symbol" required="Y"/>
  </component>
  <component name="SecAltGrp">
   <group name="NoSecurityAltID" required="N">
    <field name="SecurityAltID" required="Y"/>
    <field name="SecurityAltIDSource" required="N"/>
   </group>
  </component>
  <component name="Parties">
   <group name="NoPartyIDs" required="N">
    <field name="PartyID" required="Y"/>
    <field name="PartyRole" required="N"/>
   </group>
  </component>
 </components>
 <fields>
  <field number="8" name="BeginString" type="STRING"/>
  <field number="9" name="BodyLength" type="LENGTH"/>
  <field number="35" name="MsgType" type="STRING"/>
  <field number="49" name="SenderCompID" type="STRING"/>
  <field number="56" name="TargetCompID" type="STRING"/>
  <field number="34" name="MsgSeqNum" type="SEQNUM"/>
  <field number="52" name="SendingTime" type="UTCTIMESTAMP"/>
  <field number="43" name="PossDupFlag" type="BOOLEAN"/>
  <field number="11" name="ClOrdID" type="STRING"/>
  <field number="1" name="Account" type="STRING"/>
  <field number="55" name="Symbol" type="STRING"/>
  <field number="54" name="Side" type="CHAR">
   <value enum="1" description="BUY"/>
   <value enum="2" description="SELL"/>
  </field>
  <field number="60" name="TransactTime" type="UTCTIMESTAMP"/>
  <field number="38" name="OrderQty" type="QTY"/>
  <field number="40" name="OrdType" type="CHAR">
   <value enum="1" description="MARKET"/>
   <value enum="2" description="LIMIT"/>
  </field>
  <field number="44" name="Price" type="PRICE"/>
  <field number="112" name="TestReqID" type="STRING"/>
  <field number="10" name="CheckSum" type="STRING"/>
  <field number="454" name="NoSecurityAltID" type="NUMINGROUP"/>
  <field number="455" name="SecurityAltID" type="STRING"/>
  <field number="456" name="SecurityAltIDSource" type="STRING"/>
  <field number="453" name="NoPartyIDs" type="NUMINGROUP"/>
  <field number="448" name="PartyID" type="STRING"/>
  <field number="452" name="PartyRole" type="INT"/>
 </fields>
</fix>
"#;

    fn order_msg() -> FixMessage {
        let mut msg = FixMessage::new("D");
        msg.set(11, "C1").unwrap();
        msg.set(55, "AAPL").unwrap();
        msg.set(54, "1").unwrap();
        msg.set(38, "10").unwrap();
        msg.set(40, "2").unwrap();
        msg.set(44, "100.5").unwrap();
        msg
    }

    #[test]
    fn test_load_schema_sections() {
        let schema = load_schema(TEST_XML).unwrap();
        assert_eq!(schema.field_by_tag(11).unwrap().name, "ClOrdID");
        assert_eq!(schema.field_by_name("Symbol").unwrap().tag, 55);
        assert_eq!(schema.field_by_tag(34).unwrap().ftype, FieldType::SeqNum);
        assert!(schema.message_by_type("D").is_some());
        assert!(schema.message_by_type("0").is_some());
        assert!(schema.message_by_type("X").is_none());
        assert_eq!(schema.header().len(), 8);
    }

    #[test]
    fn test_forward_component_reference_resolves() {
        // Instrument references SecAltGrp which is defined after it
        let schema = load_schema(TEST_XML).unwrap();
        let instrument = schema.component("Instrument").unwrap();
        assert!(instrument.contains_tag(55));
        assert!(instrument.contains_tag(454));
    }

    #[test]
    fn test_component_flattened_into_message() {
        let schema = load_schema(TEST_XML).unwrap();
        let msg = schema.message_by_type("D").unwrap();
        assert!(msg.set.contains_tag(55));
        assert!(msg.set.contains_tag(453));
        assert_eq!(msg.msg_cat, MsgCat::App);
    }

    #[test]
    fn test_circular_reference_detected() {
        let xml = r#"
<fix major="4" minor="4">
 <header><field name="BeginString" required="Y"/></header>
 <messages></messages>
 <components>
  <component name="A"><component name="B"/></component>
  <component name="B"><component name="A"/></component>
 </components>
 <fields>
  <field number="8" name="BeginString" type="STRING"/>
 </fields>
</fix>
"#;
        assert!(matches!(
            load_schema(xml),
            Err(SchemaError::UnresolvedComponents { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_valid_message() {
        let schema = load_schema(TEST_XML).unwrap();
        schema.validate(&order_msg()).unwrap();
    }

    #[test]
    fn test_validate_missing_required_field() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        msg.remove(54);
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::MissingRequiredField { tag: 54, .. })
        ));
    }

    #[test]
    fn test_validate_unknown_msg_type() {
        let schema = load_schema(TEST_XML).unwrap();
        let msg = FixMessage::new("ZZ");
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::UnknownMsgType { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_tag() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        msg.set(9999, "x").unwrap();
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::UnknownTag { tag: 9999 })
        ));
    }

    #[test]
    fn test_validate_rejects_field_not_in_message() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        // TestReqID is defined, but only Heartbeat carries it
        msg.set(112, "TR1").unwrap();
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::FieldNotAllowed { tag: 112, .. })
        ));
    }

    #[test]
    fn test_validate_enum_value() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        msg.set_replace(54, "9");
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::InvalidValue { tag: 54, .. })
        ));
    }

    #[test]
    fn test_validate_numeric_value() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        msg.set_replace(38, "ten");
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::InvalidValue { tag: 38, .. })
        ));
    }

    #[test]
    fn test_validate_group_entries() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        let mut p1 = FixContainer::new();
        p1.set(448, "BRK").unwrap();
        p1.set(452, "1").unwrap();
        msg.set_group(453, vec![p1]).unwrap();
        schema.validate(&msg).unwrap();

        // an entry missing the mandatory first member fails
        let mut msg = order_msg();
        let mut bad = FixContainer::new();
        bad.set(452, "1").unwrap();
        msg.set_group(453, vec![bad]).unwrap();
        assert!(schema.validate(&msg).is_err());
    }

    #[test]
    fn test_validate_group_member_order() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        let mut out_of_order = FixContainer::new();
        out_of_order.set(452, "1").unwrap();
        out_of_order.set(448, "BRK").unwrap();
        msg.set_group(453, vec![out_of_order]).unwrap();
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::InvalidGroupEntry { .. })
        ));
    }

    #[test]
    fn test_validate_scalar_where_group_expected() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        msg.set(453, "2").unwrap();
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::GroupMismatch { tag: 453, .. })
        ));
    }

    #[test]
    fn test_validate_header_fields_when_framed() {
        let schema = load_schema(TEST_XML).unwrap();
        let mut msg = order_msg();
        msg.set_raw(8, "FIX.4.4");
        msg.set_raw(9, "100");
        msg.set_raw(35, "D");
        msg.set_raw(49, "ME");
        msg.set_raw(56, "YOU");
        msg.set_raw(34, "1");
        msg.set_raw(52, "20260802-12:00:00.000");
        msg.set_raw(10, "123");
        schema.validate(&msg).unwrap();

        // a bad SendingTime in the header is caught
        msg.set_raw(52, "not-a-time");
        assert!(matches!(
            schema.validate(&msg),
            Err(SchemaError::InvalidValue { tag: 52, .. })
        ));
    }

    #[test]
    fn test_field_value_validation_rules() {
        let schema = load_schema(TEST_XML).unwrap();
        let seq = schema.field_by_tag(34).unwrap();
        seq.validate_value("5").unwrap();
        assert!(seq.validate_value("0").is_err());
        assert!(seq.validate_value("-1").is_err());
        assert!(seq.validate_value("abc").is_err());

        let poss_dup = schema.field_by_tag(43).unwrap();
        poss_dup.validate_value("Y").unwrap();
        poss_dup.validate_value("N").unwrap();
        assert!(poss_dup.validate_value("X").is_err());

        let px = schema.field_by_tag(44).unwrap();
        px.validate_value("100.5").unwrap();
        assert!(px.validate_value("NaN").is_err());

        let ts = schema.field_by_tag(52).unwrap();
        ts.validate_value("20260802-12:00:00").unwrap();
        ts.validate_value("20260802-12:00:00.123").unwrap();
        assert!(ts.validate_value("20260802").is_err());
    }

    #[test]
    fn test_month_year_rules() {
        let field = SchemaField::new(200, "MaturityMonthYear", FieldType::MonthYear);
        field.validate_value("202608").unwrap();
        field.validate_value("20260815").unwrap();
        field.validate_value("202608w2").unwrap();
        assert!(field.validate_value("202613").is_err());
        assert!(field.validate_value("202608w9").is_err());
        assert!(field.validate_value("2026").is_err());
    }

    #[test]
    fn test_value_with_soh_or_equals_rejected() {
        let field = SchemaField::new(58, "Text", FieldType::String);
        assert!(field.validate_value("a=b").is_err());
        assert!(field.validate_value("a\x01b").is_err());
        field.validate_value("plain text").unwrap();
    }
}
