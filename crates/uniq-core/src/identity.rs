//! Entity identifiers.

use crate::error::{Error, Result};
use crate::model::Model;
use crate::value::Value;

/// Identifier values keyed by identifier field name.
///
/// For a foreign identifier the key is the association name and the value is
/// the referenced column value of the associated entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identifier {
    parts: Vec<(&'static str, Value)>,
}

/// Bound on how deep foreign identifiers are followed.
const MAX_DEPTH: usize = 8;

impl Identifier {
    pub fn new(parts: Vec<(&'static str, Value)>) -> Self {
        Self { parts }
    }

    /// Read the current identifier of `entity` from its state.
    pub fn of(entity: &dyn Model) -> Result<Self> {
        identifier_of(entity, MAX_DEPTH)
    }

    /// Value of one identifier field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.parts
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    /// Identifier values in field order.
    pub fn values(&self) -> Vec<Value> {
        self.parts.iter().map(|(_, value)| value.clone()).collect()
    }

    /// Whether every identifier field has a value.
    pub fn is_complete(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|(_, value)| !value.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.parts.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

fn identifier_of(entity: &dyn Model, depth: usize) -> Result<Identifier> {
    let meta = entity.metadata();
    let mut parts = Vec::new();

    for field in meta.fields.iter().filter(|f| f.primary_key) {
        let value = entity.field_value(field.name).ok_or_else(|| {
            Error::metadata(
                meta.name,
                format!("identifier field `{}` is not readable", field.name),
            )
        })?;
        parts.push((field.name, value));
    }

    for assoc in meta.associations.iter().filter(|a| a.id) {
        let join = assoc.join_columns.first().ok_or_else(|| {
            Error::metadata(
                meta.name,
                format!("identifier association `{}` has no join column", assoc.name),
            )
        })?;
        let value = match entity.association(assoc.name) {
            Some(target) => column_value(target, join.referenced_column, depth)?,
            None => Value::Null,
        };
        parts.push((assoc.name, value));
    }

    Ok(Identifier { parts })
}

/// Current value of `column` on `entity`, following foreign identifiers.
fn column_value(entity: &dyn Model, column: &str, depth: usize) -> Result<Value> {
    let meta = entity.metadata();
    if let Some(field) = meta.field_name_for_column(column) {
        return entity.field_value(field).ok_or_else(|| {
            Error::metadata(meta.name, format!("field `{field}` is not readable"))
        });
    }
    if depth == 0 {
        return Err(Error::metadata(
            meta.name,
            "foreign identifier nesting is too deep",
        ));
    }

    let found = meta
        .associations
        .iter()
        .filter(|a| a.holds_foreign_key())
        .find_map(|a| {
            a.join_columns
                .iter()
                .find(|jc| jc.source_column == column)
                .map(|jc| (a, jc))
        });
    match found {
        Some((assoc, jc)) => match entity.association(assoc.name) {
            Some(target) => column_value(target, jc.referenced_column, depth - 1),
            None => Ok(Value::Null),
        },
        None => Err(Error::metadata(
            meta.name,
            format!("column `{column}` is not mapped"),
        )),
    }
}
