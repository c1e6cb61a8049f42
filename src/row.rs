use std::{collections::HashMap, fmt};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{
    options::StatementOptions,
    schema::ResultSchema,
    value::NullableValue,
    wire::WireBuffer,
    ErrorContext, Result, SqlCallError,
};

/// Ordered, named set of values receiving one fetched row.
///
/// Values are overwritten in place on every fetch. Name lookup is
/// case-sensitive; a repeated name points at its last column, and every
/// column stays reachable by position.
#[derive(Clone, Debug, Default)]
pub struct RowBinding {
    values: Vec<NullableValue>,
    names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl RowBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates one NULL container per column, sized from the schema.
    pub fn from_schema(schema: &ResultSchema, options: &StatementOptions) -> Result<Self> {
        let mut row = Self::new();
        for column in schema.iter() {
            row.add(NullableValue::for_column(column, options)?, column.name.clone());
        }
        Ok(row)
    }

    /// Appends a column.
    pub fn add(&mut self, value: NullableValue, name: impl Into<String>) {
        let name = name.into();
        self.by_name.insert(name.clone(), self.values.len());
        self.values.push(value);
        self.names.push(name);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&NullableValue> {
        self.values
            .get(index)
            .ok_or_else(|| out_of_range("RowBinding::get", index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut NullableValue> {
        self.values
            .get_mut(index)
            .ok_or_else(|| out_of_range("RowBinding::get_mut", index))
    }

    pub fn by_name(&self, name: &str) -> Result<&NullableValue> {
        let index = self
            .position_of(name)
            .ok_or_else(|| unknown_column("RowBinding::by_name", name))?;
        self.get(index)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Result<&mut NullableValue> {
        let index = self
            .position_of(name)
            .ok_or_else(|| unknown_column("RowBinding::by_name_mut", name))?;
        self.get_mut(index)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn column_name(&self, index: usize) -> Result<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| out_of_range("RowBinding::column_name", index))
    }

    /// Sets every column to NULL.
    pub fn set_null(&mut self) {
        for value in &mut self.values {
            value.set_null();
        }
    }

    pub fn values(&self) -> &[NullableValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NullableValue)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    pub(crate) fn wire_buffers_mut(&mut self) -> Vec<&mut WireBuffer> {
        self.values.iter_mut().map(NullableValue::wire_mut).collect()
    }
}

fn out_of_range(op: &'static str, index: usize) -> SqlCallError {
    SqlCallError::value(op, "column out of range")
        .with_context(ErrorContext::new().with("index", index))
}

fn unknown_column(op: &'static str, name: &str) -> SqlCallError {
    SqlCallError::value(op, "column does not exist")
        .with_context(ErrorContext::new().with("column", name))
}

impl fmt::Display for RowBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for RowBinding {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
