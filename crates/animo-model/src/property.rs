//! Typed attribute storage.
//!
//! Every entity owns a [`PropertyBag`]: an insertion-ordered map from string
//! keys to lazily created [`Property`] cells. A cell, once created, keeps its
//! position for the lifetime of the bag; unsetting a value empties the cell
//! instead of removing it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::Table;

/// A property value. Accessors on [`PropertyBag`] check the variant and
/// report a [`PropertyError`] instead of coercing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    Bool(bool),
    String(String),
    IntList(Vec<i64>),
    StringList(Vec<String>),
    Table(Table),
}

impl PropertyValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "int",
            PropertyValue::Double(_) => "double",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::String(_) => "string",
            PropertyValue::IntList(_) => "int list",
            PropertyValue::StringList(_) => "string list",
            PropertyValue::Table(_) => "table",
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(i64::from(v))
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        PropertyValue::IntList(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::StringList(v)
    }
}

impl From<Table> for PropertyValue {
    fn from(v: Table) -> Self {
        PropertyValue::Table(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("{owner}: property '{key}' is not set")]
    Missing { owner: String, key: String },
    #[error("{owner}: property '{key}' holds a {found}, expected a {expected}")]
    TypeMismatch {
        owner: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// A single property cell. Empty until a value is assigned with [`Property::be`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Property {
    value: Option<PropertyValue>,
}

impl Property {
    pub fn be(&mut self, value: impl Into<PropertyValue>) -> &mut Self {
        self.value = Some(value.into());
        self
    }

    pub fn value(&self) -> Option<&PropertyValue> {
        self.value.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyBag {
    owner: String,
    cells: IndexMap<String, Property>,
}

macro_rules! typed_getter {
    ($name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        pub fn $name(&self, key: &str) -> Result<$ty, PropertyError> {
            match self.require(key)? {
                PropertyValue::$variant(v) => Ok(v.clone()),
                other => Err(self.mismatch(key, $expected, other)),
            }
        }
    };
}

impl PropertyBag {
    /// Create an empty bag. `owner` names the entity in error messages.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            cells: IndexMap::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the cell for `key`, creating an empty one on first use.
    pub fn entry(&mut self, key: &str) -> &mut Property {
        self.cells.entry(key.to_string()).or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.entry(key).be(value);
    }

    /// Empties the cell for `key` without giving up its position.
    pub fn unset(&mut self, key: &str) {
        if let Some(cell) = self.cells.get_mut(key) {
            cell.clear();
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.cells.get(key).and_then(Property::value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Position of the cell for `key` in insertion order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.cells.get_index_of(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over the cells that currently hold a value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.cells
            .iter()
            .filter_map(|(k, cell)| cell.value().map(|v| (k.as_str(), v)))
    }

    typed_getter!(get_int, Int, i64, "int");
    typed_getter!(get_bool, Bool, bool, "bool");
    typed_getter!(get_string, String, String, "string");
    typed_getter!(get_int_list, IntList, Vec<i64>, "int list");
    typed_getter!(get_string_list, StringList, Vec<String>, "string list");
    typed_getter!(get_table, Table, Table, "table");

    /// Integers widen to doubles; nothing else converts.
    pub fn get_double(&self, key: &str) -> Result<f64, PropertyError> {
        match self.require(key)? {
            PropertyValue::Double(v) => Ok(*v),
            PropertyValue::Int(v) => Ok(*v as f64),
            other => Err(self.mismatch(key, "double", other)),
        }
    }

    fn require(&self, key: &str) -> Result<&PropertyValue, PropertyError> {
        self.get(key).ok_or_else(|| PropertyError::Missing {
            owner: self.owner.clone(),
            key: key.to_string(),
        })
    }

    fn mismatch(&self, key: &str, expected: &'static str, found: &PropertyValue) -> PropertyError {
        PropertyError::TypeMismatch {
            owner: self.owner.clone(),
            key: key.to_string(),
            expected,
            found: found.kind(),
        }
    }
}
