//! Entity metadata and the `Model` trait.
//!
//! Every entity type publishes one static [`EntityMetadata`] describing its
//! table, fields, associations and identifier strategy. Instances expose their
//! state through [`Model`], which replaces runtime reflection with explicit,
//! per-type accessors.

use crate::error::Result;
use crate::field::FieldInfo;
use crate::relationship::AssociationInfo;
use crate::types::SqlType;
use crate::value::Value;

/// How an entity's identifier is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdGeneration {
    /// The application assigns the identifier.
    #[default]
    None,
    /// The database assigns it on insert (auto-increment, serial, identity).
    ///
    /// On PostgreSQL `sequence` names the backing sequence; without it the
    /// session's `lastval()` is used.
    Identity { sequence: Option<&'static str> },
}

impl IdGeneration {
    /// Whether the identifier is only known after the row is inserted.
    #[must_use]
    pub const fn is_post_insert(&self) -> bool {
        matches!(self, IdGeneration::Identity { .. })
    }
}

/// Static mapping metadata of one entity type.
#[derive(Debug)]
pub struct EntityMetadata {
    /// Entity name used in diagnostics.
    pub name: &'static str,
    /// Table the entity maps to.
    pub table_name: &'static str,
    /// Scalar fields in declaration order.
    pub fields: &'static [FieldInfo],
    /// Associations in declaration order.
    pub associations: &'static [AssociationInfo],
    /// Identifier generation strategy.
    pub id_generation: IdGeneration,
}

/// Bound on how far `type_of_column` follows foreign identifiers.
const MAX_COLUMN_HOPS: usize = 8;

impl EntityMetadata {
    /// Look up a scalar field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up an association by name.
    pub fn association(&self, name: &str) -> Option<&'static AssociationInfo> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Names of the identifier fields: scalar primary key fields first, then
    /// associations that are part of the identifier.
    pub fn identifier_field_names(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name)
            .chain(self.associations.iter().filter(|a| a.id).map(|a| a.name))
            .collect()
    }

    /// Field that receives a database generated identifier.
    pub fn generated_identifier_field(&self) -> Option<&'static str> {
        self.fields.iter().find(|f| f.primary_key).map(|f| f.name)
    }

    /// Whether the identifier is made (partly) of associations.
    pub fn contains_foreign_identifier(&self) -> bool {
        self.associations.iter().any(|a| a.id)
    }

    /// Whether the identifier is generated by the database on insert.
    pub fn is_post_insert_generated(&self) -> bool {
        self.id_generation.is_post_insert()
    }

    /// Scalar field mapped to `column`.
    pub fn field_name_for_column(&self, column: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.column_name == column)
            .map(|f| f.name)
    }

    /// Field or association mapped to `column`.
    ///
    /// Join columns of owning to-one associations resolve to the association
    /// name, which is how foreign identifiers are keyed.
    pub fn field_for_column(&self, column: &str) -> Option<&'static str> {
        self.field_name_for_column(column).or_else(|| {
            self.associations
                .iter()
                .filter(|a| a.holds_foreign_key())
                .find(|a| a.join_columns.iter().any(|jc| jc.source_column == column))
                .map(|a| a.name)
        })
    }

    /// Declared type of `column`.
    ///
    /// A join column takes the type of the column it references on the target.
    pub fn type_of_column(&self, column: &str) -> Option<SqlType> {
        self.type_of_column_bounded(column, MAX_COLUMN_HOPS)
    }

    fn type_of_column_bounded(&self, column: &str, hops: usize) -> Option<SqlType> {
        if let Some(field) = self.fields.iter().find(|f| f.column_name == column) {
            return Some(field.sql_type);
        }
        if hops == 0 {
            return None;
        }
        self.associations
            .iter()
            .filter(|a| a.holds_foreign_key())
            .find_map(|a| {
                a.join_columns
                    .iter()
                    .find(|jc| jc.source_column == column)
                    .map(|jc| (a, jc))
            })
            .and_then(|(a, jc)| {
                a.target()
                    .type_of_column_bounded(jc.referenced_column, hops - 1)
            })
    }
}

/// An entity instance.
///
/// Implemented per entity type; the session and the inserter only ever see
/// entities through this trait.
pub trait Model: Send + Sync + 'static {
    /// The static metadata of this entity's type.
    fn metadata(&self) -> &'static EntityMetadata;

    /// Current value of a scalar field, `None` if the field does not exist.
    fn field_value(&self, field: &str) -> Option<Value>;

    /// Overwrite a scalar field.
    fn set_field_value(&mut self, field: &str, value: Value) -> Result<()>;

    /// The entity a to-one association currently points at.
    fn association(&self, _name: &str) -> Option<&dyn Model> {
        None
    }
}
