/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! # ferrofix-dictionary
//!
//! QuickFIX XML dictionary loading and message validation for the ferrofix
//! engine.
//!
//! This crate provides:
//! - **Schema model**: fields, components, groups, header and messages with
//!   ordered membership
//! - **XML loading**: [`load_schema`] with two-pass component resolution
//! - **Validation**: [`FixSchema::validate`] over decoded or hand-built
//!   messages

pub mod parser;
pub mod schema;

pub use parser::load_schema;
pub use schema::{
    FieldType, FixSchema, MsgCat, SchemaField, SchemaGroup, SchemaMember, SchemaMessage, SchemaSet,
};
