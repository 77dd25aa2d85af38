//! Association metadata.
//!
//! Associations are declared as static metadata on each entity, next to its
//! fields. Only the owning side of a single-valued association holds a
//! physical foreign key column; its join columns describe that column and the
//! column of the target entity it references.

use std::fmt;

use crate::model::EntityMetadata;

/// The cardinality of an association.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// One-to-one: `User` has one `Profile`.
    OneToOne,
    /// Many-to-one: many `Hero`s belong to one `Team`.
    #[default]
    ManyToOne,
    /// One-to-many: one `Team` has many `Hero`s.
    OneToMany,
    /// Many-to-many via a link table.
    ManyToMany,
}

impl RelationshipKind {
    /// Whether the association points at a single entity.
    #[must_use]
    pub const fn is_to_one(&self) -> bool {
        matches!(self, RelationshipKind::OneToOne | RelationshipKind::ManyToOne)
    }
}

/// A foreign key column on the owning side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinColumn {
    /// Column on the owning table (e.g. `"team_id"`).
    pub source_column: &'static str,
    /// Column on the target table it references (e.g. `"id"`).
    pub referenced_column: &'static str,
    pub nullable: bool,
    pub unique: bool,
}

impl JoinColumn {
    /// A nullable, non-unique join column.
    #[must_use]
    pub const fn new(source_column: &'static str, referenced_column: &'static str) -> Self {
        Self {
            source_column,
            referenced_column,
            nullable: true,
            unique: false,
        }
    }

    #[must_use]
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    #[must_use]
    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }
}

/// Metadata about an association between entities.
#[derive(Clone, Copy)]
pub struct AssociationInfo {
    /// Name of the association field.
    pub name: &'static str,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Metadata of the target entity.
    pub target: fn() -> &'static EntityMetadata,

    /// Whether this side holds the foreign key.
    pub owning_side: bool,

    /// Whether the association is part of the owner's identifier.
    pub id: bool,

    /// Foreign key columns (owning side of to-one associations only).
    pub join_columns: &'static [JoinColumn],
}

impl AssociationInfo {
    /// Create an owning association with no join columns yet.
    #[must_use]
    pub const fn new(
        name: &'static str,
        kind: RelationshipKind,
        target: fn() -> &'static EntityMetadata,
    ) -> Self {
        Self {
            name,
            kind,
            target,
            owning_side: true,
            id: false,
            join_columns: &[],
        }
    }

    /// Set whether this side owns the foreign key.
    #[must_use]
    pub const fn owning_side(mut self, value: bool) -> Self {
        self.owning_side = value;
        self
    }

    /// Mark the association as part of the identifier.
    #[must_use]
    pub const fn id(mut self, value: bool) -> Self {
        self.id = value;
        self
    }

    /// Set the join columns.
    #[must_use]
    pub const fn join_columns(mut self, columns: &'static [JoinColumn]) -> Self {
        self.join_columns = columns;
        self
    }

    /// Metadata of the target entity.
    pub fn target(&self) -> &'static EntityMetadata {
        (self.target)()
    }

    /// Whether this association maps to a physical column on this side.
    #[must_use]
    pub const fn holds_foreign_key(&self) -> bool {
        self.owning_side && self.kind.is_to_one()
    }
}

impl fmt::Debug for AssociationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("target", &self.target().name)
            .field("owning_side", &self.owning_side)
            .field("id", &self.id)
            .field("join_columns", &self.join_columns)
            .finish()
    }
}
