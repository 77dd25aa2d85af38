//! Field and column definitions.

use crate::types::SqlType;

/// Metadata about a scalar entity field and the column it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Database column name (may differ from field name)
    pub column_name: &'static str,
    /// SQL type for this field
    pub sql_type: SqlType,
    /// Whether this field is nullable
    pub nullable: bool,
    /// Whether this field is (part of) the identifier
    pub primary_key: bool,
    /// Whether the database generates this field's value
    pub auto_increment: bool,
    /// Whether this field has a unique constraint
    pub unique: bool,
}

impl FieldInfo {
    /// Create a new field info: NOT NULL, not unique, not an identifier.
    pub const fn new(name: &'static str, column_name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            column_name,
            sql_type,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
        }
    }

    /// Set the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set auto-increment flag.
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Set unique flag.
    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Whether a bare insert has to provide this field.
    ///
    /// Identifier fields never qualify: their value is either absent or
    /// assigned after the insert.
    #[must_use]
    pub const fn is_required_for_insert(&self) -> bool {
        !self.primary_key && (!self.nullable || self.unique)
    }
}
