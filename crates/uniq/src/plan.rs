//! Column selection for bare inserts.
//!
//! A bare insert supplies only what the database refuses to default: scalar
//! fields that are NOT NULL or UNIQUE, and foreign key columns of owning
//! single-valued associations that are both UNIQUE and NOT NULL. Identifier
//! columns are never part of it.

use serde::Serialize;
use uniq_core::{AssociationInfo, EntityMetadata, FieldInfo, JoinColumn, SqlType, Value};

/// Scalar fields a bare insert has to provide, in declaration order.
pub fn required_fields(meta: &EntityMetadata) -> Vec<&'static FieldInfo> {
    meta.fields
        .iter()
        .filter(|f| f.is_required_for_insert())
        .collect()
}

/// A foreign key column a bare insert has to provide.
#[derive(Debug, Clone, Copy)]
pub struct RequiredJoinColumn {
    pub association: &'static AssociationInfo,
    pub join_column: &'static JoinColumn,
}

/// Join columns a bare insert has to provide, in declaration order.
///
/// To-many and inverse-side associations hold no column here and identifier
/// associations are skipped.
pub fn required_join_columns(meta: &EntityMetadata) -> Vec<RequiredJoinColumn> {
    meta.associations
        .iter()
        .filter(|a| !a.id && a.holds_foreign_key())
        .flat_map(|association| {
            association
                .join_columns
                .iter()
                .filter(|jc| jc.unique && !jc.nullable)
                .map(move |join_column| RequiredJoinColumn {
                    association,
                    join_column,
                })
        })
        .collect()
}

/// A scalar field with the value read from the entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedField {
    pub field: &'static str,
    pub column: &'static str,
    pub sql_type: SqlType,
    pub value: Value,
}

/// A join column with the identifier value of the associated entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedJoinColumn {
    pub association: &'static str,
    pub column: &'static str,
    pub referenced_column: &'static str,
    /// Declared type of the referenced column on the target.
    pub sql_type: SqlType,
    pub value: Value,
}

/// Columns and values of one insert attempt. Built per call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InsertPlan {
    pub fields: Vec<PlannedField>,
    pub associations: Vec<PlannedJoinColumn>,
}

impl InsertPlan {
    /// Column names, fields first.
    pub fn columns(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .map(|f| f.column)
            .chain(self.associations.iter().map(|a| a.column))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
