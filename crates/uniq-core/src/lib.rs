//! Core types and traits for uniq.
//!
//! `uniq-core` is the **foundation layer** of the workspace. It defines the
//! contracts the session and the unique inserter are written against.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Model` is implemented by user entities and exposes their
//!   static `EntityMetadata` plus field access; `Connection` is implemented by
//!   database drivers.
//! - **Data model**: `Value`, `SqlType`, `Row` and `Identifier` are shared by the
//!   session and the inserter.
//! - **Dialects**: `Dialect` knows how each supported engine quotes identifiers,
//!   spells placeholders and reports the last generated identity.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync so every
//!   database round-trip is cancel-correct and budget-aware.
//!
//! # Who Uses This Crate
//!
//! - `uniq-session` keeps an identity map of `Model` instances keyed by `Identifier`.
//! - `uniq` plans, builds and classifies unique inserts from `EntityMetadata`.
//! - Driver crates implement `Connection` and report native failures as `DriverError`.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome, RegionId, TaskId};

pub mod connection;
pub mod dialect;
pub mod error;
pub mod field;
pub mod identity;
pub mod model;
pub mod relationship;
pub mod row;
pub mod types;
pub mod value;

pub use connection::Connection;
pub use dialect::{Dialect, is_valid_identifier};
pub use error::{
    ConnectionError, ConnectionErrorKind, ConversionError, DriverError, Error, IdentityError,
    MetadataError, NativeErrorCode, QueryError, QueryErrorKind, Result,
};
pub use field::FieldInfo;
pub use identity::Identifier;
pub use model::{EntityMetadata, IdGeneration, Model};
pub use relationship::{AssociationInfo, JoinColumn, RelationshipKind};
pub use row::Row;
pub use types::SqlType;
pub use value::Value;
