//! The unique inserter.
//!
//! An insert attempt runs inside its own transaction level:
//!
//! ```text
//! begin -> INSERT -> [read generated id] -> merge -> [flush merged] -> commit
//!                 \________________ any failure ________________/
//!                                     |
//!                                  rollback -> Duplicate | error
//! ```
//!
//! No lock is taken and existence is never checked up front. The unique index
//! decides, and a unique violation comes back as [`InsertOutcome::Duplicate`].

use asupersync::{Cx, Outcome};
use serde::{Deserialize, Serialize};
use uniq_core::{Connection, Error, Model};
use uniq_session::Session;

use crate::conflict::{is_unique_violation, translate_error};
use crate::resolve::resolve_plan;
use crate::statement::PreparedInsert;

/// Configuration for [`UniqueInserter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InserterConfig {
    /// Whether the merged entity is flushed before commit, writing the
    /// columns the bare insert left out.
    pub flush_merged: bool,
}

impl Default for InserterConfig {
    fn default() -> Self {
        Self { flush_merged: true }
    }
}

/// Result of an insert attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<M> {
    /// The row was inserted. Holds the entity managed by the session, with
    /// any generated identifier set; use it instead of the one passed in.
    Inserted(M),
    /// A row with the same unique values already exists.
    Duplicate,
}

impl<M> InsertOutcome<M> {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, InsertOutcome::Duplicate)
    }

    /// The inserted entity, `None` for a duplicate.
    pub fn inserted(self) -> Option<M> {
        match self {
            InsertOutcome::Inserted(m) => Some(m),
            InsertOutcome::Duplicate => None,
        }
    }
}

/// Inserts entities whose unique columns may already be taken, without
/// locking.
///
/// Borrows the caller's session for its connection, its identity map and its
/// transaction state.
pub struct UniqueInserter<'s, C: Connection> {
    session: &'s mut Session<C>,
    config: InserterConfig,
}

impl<'s, C: Connection> UniqueInserter<'s, C> {
    pub fn new(session: &'s mut Session<C>) -> Self {
        Self::with_config(session, InserterConfig::default())
    }

    pub fn with_config(session: &'s mut Session<C>, config: InserterConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &Session<C> {
        self.session
    }

    pub fn config(&self) -> &InserterConfig {
        &self.config
    }

    /// Try to insert `entity`.
    ///
    /// Returns `Inserted(merged)` once committed, `Duplicate` when a unique
    /// constraint rejected the row, or the error of any other failure. Every
    /// path except the committed one rolls its transaction level back; if that
    /// rollback fails, its error is returned.
    #[tracing::instrument(level = "debug", skip(self, cx, entity))]
    pub async fn attempt_insert<M: Model + Clone>(
        &mut self,
        cx: &Cx,
        entity: M,
    ) -> Outcome<InsertOutcome<M>, Error> {
        let meta = entity.metadata();

        match self.session.begin(cx).await {
            Outcome::Ok(()) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }

        let error = match self.insert_and_commit(cx, entity).await {
            Outcome::Ok(merged) => {
                tracing::info!(entity = meta.name, table = meta.table_name, "Inserted entity");
                return Outcome::Ok(InsertOutcome::Inserted(merged));
            }
            Outcome::Err(e) => e,
            Outcome::Cancelled(r) => {
                self.rollback_quietly(cx, "cancelled").await;
                return Outcome::Cancelled(r);
            }
            Outcome::Panicked(p) => {
                self.rollback_quietly(cx, "panicked").await;
                return Outcome::Panicked(p);
            }
        };

        match self.session.rollback(cx).await {
            Outcome::Ok(()) => {}
            Outcome::Err(rollback_error) => {
                tracing::warn!(
                    entity = meta.name,
                    error = %error,
                    rollback_error = %rollback_error,
                    "Rollback after failed insert failed"
                );
                return Outcome::Err(rollback_error);
            }
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }

        let dialect = self.session.connection().dialect();
        if is_unique_violation(dialect, &error) {
            tracing::info!(
                entity = meta.name,
                table = meta.table_name,
                "Duplicate entry, insert rolled back"
            );
            return Outcome::Ok(InsertOutcome::Duplicate);
        }

        tracing::debug!(entity = meta.name, error = %error, "Insert failed");
        Outcome::Err(translate_error(dialect, error, None))
    }

    async fn insert_and_commit<M: Model + Clone>(&mut self, cx: &Cx, mut entity: M) -> Outcome<M, Error> {
        let meta = entity.metadata();
        let dialect = self.session.connection().dialect();

        let plan = match resolve_plan(self.session, &entity) {
            Ok(plan) => plan,
            Err(e) => return Outcome::Err(e),
        };
        let insert = PreparedInsert::prepare(dialect, meta, &plan);

        match insert.execute(cx, self.session.connection()).await {
            Outcome::Ok(_) => {}
            Outcome::Err(e) => return Outcome::Err(translate_error(dialect, e, Some(insert.sql()))),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }

        if meta.is_post_insert_generated() {
            let id = match self.session.last_insert_id(cx, meta).await {
                Outcome::Ok(id) => id,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            let Some(field) = meta.generated_identifier_field() else {
                return Outcome::Err(Error::metadata(
                    meta.name,
                    "no field receives the generated identifier",
                ));
            };
            tracing::debug!(entity = meta.name, field, id = ?id, "Assigning generated identifier");
            if let Err(e) = entity.set_field_value(field, id) {
                return Outcome::Err(e);
            }
        }

        let merged = match self.session.merge(entity) {
            Ok(merged) => merged,
            Err(e) => return Outcome::Err(e),
        };

        if self.config.flush_merged {
            match self.session.flush_object(cx, &merged).await {
                Outcome::Ok(()) => {}
                Outcome::Err(e) => return Outcome::Err(translate_error(dialect, e, None)),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        match self.session.commit(cx).await {
            Outcome::Ok(()) => Outcome::Ok(merged),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    async fn rollback_quietly(&mut self, cx: &Cx, reason: &'static str) {
        if let Outcome::Err(e) = self.session.rollback(cx).await {
            tracing::warn!(reason, error = %e, "Rollback after interrupted insert failed");
        }
    }
}
