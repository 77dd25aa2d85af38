//! Non-locking unique inserts.
//!
//! `uniq` inserts an entity whose columns are guarded by unique constraints
//! without locking and without checking for an existing row first. The insert
//! is attempted inside a transaction; when the database rejects it with a
//! unique violation the attempt is rolled back and reported as
//! [`InsertOutcome::Duplicate`].
//!
//! # Role In The Architecture
//!
//! - **Facade**: re-exports the contracts of `uniq-core` and the session of
//!   `uniq-session`.
//! - **Pipeline**: [`plan`] selects the columns a bare insert needs, [`resolve`]
//!   reads their values (including identifiers of associated entities),
//!   [`statement`] builds the INSERT and [`conflict`] classifies driver failures.
//! - **Entry point**: [`UniqueInserter::attempt_insert`].
//!
//! # Example
//!
//! ```ignore
//! use uniq::prelude::*;
//!
//! let mut session = Session::new(conn);
//! match UniqueInserter::new(&mut session).attempt_insert(&cx, user).await {
//!     Outcome::Ok(InsertOutcome::Inserted(user)) => println!("created {}", user.id),
//!     Outcome::Ok(InsertOutcome::Duplicate) => println!("already taken"),
//!     Outcome::Err(e) => return Err(e),
//!     _ => {}
//! }
//! ```

pub mod conflict;
pub mod inserter;
pub mod plan;
pub mod resolve;
pub mod statement;

pub use conflict::{ViolationKind, classify, driver_error, is_unique_violation, translate_error};
pub use inserter::{InsertOutcome, InserterConfig, UniqueInserter};
pub use plan::{InsertPlan, PlannedField, PlannedJoinColumn, required_fields, required_join_columns};
pub use resolve::resolve_plan;
pub use statement::{BoundParam, PreparedInsert};

pub use uniq_core::{
    AssociationInfo, Connection, Cx, Dialect, DriverError, EntityMetadata, Error, FieldInfo,
    IdGeneration, Identifier, JoinColumn, Model, NativeErrorCode, Outcome, QueryError,
    QueryErrorKind, RelationshipKind, Result, Row, SqlType, Value,
};
pub use uniq_session::{ObjectKey, ObjectState, Session, SessionConfig, SessionDebugInfo};

/// Everything needed to declare entities and run insert attempts.
pub mod prelude {
    pub use crate::{
        AssociationInfo, Connection, Cx, Dialect, EntityMetadata, Error, FieldInfo,
        IdGeneration, InsertOutcome, InserterConfig, JoinColumn, Model, Outcome,
        RelationshipKind, Result, Session, SessionConfig, SqlType, UniqueInserter, Value,
    };
}
