//! Session and unit of work for uniq.
//!
//! The session owns a database connection, tracks managed entities in an
//! identity map and drives transactions on that connection.
//!
//! # Design Philosophy
//!
//! - **Explicit over implicit**: nothing is written until `flush` or `flush_object`
//! - **Ownership clarity**: the session owns the connection
//! - **Type erasure**: the identity map stores boxed entities of any `Model` type
//! - **Nested transactions**: inner levels map to savepoints, and rolling a level
//!   back also reverts every identity map change made inside it
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::new(conn);
//!
//! session.begin(&cx).await?;
//! let hero = session.merge(hero)?;
//! session.flush_object(&cx, &hero).await?;
//! session.commit(&cx).await?;
//! ```

use asupersync::{Cx, Outcome};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use uniq_core::{
    AssociationInfo, Connection, Dialect, EntityMetadata, Error, Identifier, IdGeneration,
    JoinColumn, Model, QueryError, QueryErrorKind, Result, SqlType, Value, is_valid_identifier,
};

// ============================================================================
// Session Configuration
// ============================================================================

/// Configuration for Session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether `begin` inside an active transaction opens a savepoint.
    /// When disabled, nested `begin` is an error.
    pub use_savepoints: bool,
    /// Prefix of generated savepoint names (`{prefix}_{level}`).
    pub savepoint_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            use_savepoints: true,
            savepoint_prefix: "uniq_sp".to_string(),
        }
    }
}

// ============================================================================
// Object Key and State
// ============================================================================

/// Unique key for an object in the identity map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Table of the entity type.
    table: &'static str,
    /// Hash of the identifier values, or a sequence number for transient keys.
    pk_hash: u64,
    /// Whether the entity had no complete identifier when it was tracked.
    transient: bool,
}

impl ObjectKey {
    /// Key of an entity with a complete identifier.
    pub fn from_identifier(meta: &'static EntityMetadata, identifier: &Identifier) -> Self {
        Self::from_pk(meta, &identifier.values())
    }

    /// Key from table metadata and identifier values.
    pub fn from_pk(meta: &'static EntityMetadata, pk: &[Value]) -> Self {
        Self {
            table: meta.table_name,
            pk_hash: hash_values(pk),
            transient: false,
        }
    }

    fn transient(meta: &'static EntityMetadata, seq: u64) -> Self {
        Self {
            table: meta.table_name,
            pk_hash: seq,
            transient: true,
        }
    }

    /// Table of the keyed entity.
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Whether this key stands in for a not yet known identifier.
    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

/// Hash a slice of values for use as a primary key hash.
fn hash_values(values: &[Value]) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    values.len().hash(&mut hasher);
    for v in values {
        hash_value(v, &mut hasher);
    }
    hasher.finish()
}

/// Hash a single value into the hasher.
fn hash_value(v: &Value, hasher: &mut impl Hasher) {
    match v {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        // Integer widths share a tag so that `Int(7)` and `BigInt(7)` key the
        // same row.
        Value::SmallInt(i) => {
            2u8.hash(hasher);
            i64::from(*i).hash(hasher);
        }
        Value::Int(i) => {
            2u8.hash(hasher);
            i64::from(*i).hash(hasher);
        }
        Value::BigInt(i) => {
            2u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Double(f) => {
            3u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Decimal(s) => {
            4u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Text(s) => {
            5u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            6u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Timestamp(ts) => {
            7u8.hash(hasher);
            ts.hash(hasher);
        }
        Value::Uuid(u) => {
            8u8.hash(hasher);
            u.hash(hasher);
        }
        Value::Json(j) => {
            9u8.hash(hasher);
            j.to_string().hash(hasher);
        }
    }
}

/// State of an entity with respect to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectState {
    /// Tracked but never written, needs INSERT on flush.
    New,
    /// Known to exist in the database.
    Persistent,
    /// Not tracked by the session.
    Detached,
}

/// Type-erased access to a tracked entity.
trait Tracked: Send + Sync {
    fn model(&self) -> &dyn Model;
    fn model_mut(&mut self) -> &mut dyn Model;
    fn clone_boxed(&self) -> Box<dyn Tracked>;
    fn as_any(&self) -> &dyn Any;
}

impl<M: Model + Clone> Tracked for M {
    fn model(&self) -> &dyn Model {
        self
    }

    fn model_mut(&mut self) -> &mut dyn Model {
        self
    }

    fn clone_boxed(&self) -> Box<dyn Tracked> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A tracked object in the session.
struct TrackedObject {
    /// The entity (type-erased).
    entity: Box<dyn Tracked>,
    /// Identifier as known to the session.
    identifier: Identifier,
    state: ObjectState,
    /// Whether the in-memory state differs from the database.
    dirty: bool,
}

impl TrackedObject {
    fn new<M: Model + Clone>(entity: M, identifier: Identifier, state: ObjectState) -> Self {
        Self {
            entity: Box::new(entity),
            identifier,
            state,
            dirty: state == ObjectState::Persistent,
        }
    }
}

impl Clone for TrackedObject {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity.clone_boxed(),
            identifier: self.identifier.clone(),
            state: self.state,
            dirty: self.dirty,
        }
    }
}

/// Identity map entries as they were before the first change at one
/// transaction level. `None` means the key was absent.
type JournalLevel = Vec<(ObjectKey, Option<TrackedObject>)>;

// ============================================================================
// Session
// ============================================================================

/// The Session is the central unit-of-work manager.
///
/// It tracks entities persisted into or merged into it and writes them back
/// on flush.
pub struct Session<C: Connection> {
    /// The database connection.
    connection: C,
    /// Identity map: ObjectKey -> TrackedObject.
    identity_map: HashMap<ObjectKey, TrackedObject>,
    /// One journal level per open transaction level.
    journal: Vec<JournalLevel>,
    /// Sequence for transient keys.
    next_transient: u64,
    /// Transient keys re-keyed by a flush, mapped to their identifier key.
    rekeyed: HashMap<ObjectKey, ObjectKey>,
    /// Configuration.
    config: SessionConfig,
}

impl<C: Connection> Session<C> {
    /// Create a new session from an existing connection.
    pub fn new(connection: C) -> Self {
        Self::with_config(connection, SessionConfig::default())
    }

    /// Create a new session with custom configuration.
    pub fn with_config(connection: C, config: SessionConfig) -> Self {
        Self {
            connection,
            identity_map: HashMap::new(),
            journal: Vec::new(),
            next_transient: 0,
            rekeyed: HashMap::new(),
            config,
        }
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ========================================================================
    // Object Tracking
    // ========================================================================

    /// Start tracking an entity and return the key it is tracked under.
    ///
    /// An entity without a complete identifier is tracked under a transient key.
    /// The key stays usable with [`Session::find`] after a flush assigns the
    /// identifier. Persisting an already persistent entity replaces its state
    /// and marks it dirty.
    #[tracing::instrument(level = "debug", skip(self, entity))]
    pub fn persist<M: Model + Clone>(&mut self, entity: &M) -> Result<ObjectKey> {
        let meta = entity.metadata();
        let identifier = Identifier::of(entity)?;

        let key = if identifier.is_complete() {
            ObjectKey::from_identifier(meta, &identifier)
        } else {
            self.next_transient += 1;
            ObjectKey::transient(meta, self.next_transient)
        };

        tracing::info!(
            entity = meta.name,
            table = meta.table_name,
            transient = key.transient,
            "Persisting entity"
        );

        let state = match self.identity_map.get(&key) {
            Some(existing) if existing.state == ObjectState::Persistent => {
                ObjectState::Persistent
            }
            _ => ObjectState::New,
        };

        self.touch(key);
        self.identity_map
            .insert(key, TrackedObject::new(entity.clone(), identifier, state));
        Ok(key)
    }

    /// Attach an entity whose row already exists and return the managed copy.
    ///
    /// The entity must carry a complete identifier. Its state replaces whatever
    /// the session held for that identifier and is marked dirty.
    #[tracing::instrument(level = "debug", skip(self, entity))]
    pub fn merge<M: Model + Clone>(&mut self, entity: M) -> Result<M> {
        let meta = entity.metadata();
        let identifier = Identifier::of(&entity)?;
        if !identifier.is_complete() {
            return Err(Error::identity(
                meta.name,
                "cannot merge an entity without a complete identifier",
            ));
        }

        let key = ObjectKey::from_identifier(meta, &identifier);
        if let Some(existing) = self.identity_map.get(&key) {
            if !existing.entity.as_any().is::<M>() {
                return Err(Error::identity(
                    meta.name,
                    format!(
                        "identifier is already managed as a different type on `{}`",
                        meta.table_name
                    ),
                ));
            }
        }

        tracing::debug!(entity = meta.name, table = meta.table_name, "Merging entity");

        self.touch(key);
        self.identity_map.insert(
            key,
            TrackedObject::new(entity.clone(), identifier, ObjectState::Persistent),
        );
        Ok(entity)
    }

    /// The identifier the session holds for a managed entity.
    ///
    /// `None` if the entity is not managed or its identifier is not yet known.
    pub fn entity_identifier(&self, entity: &dyn Model) -> Option<Identifier> {
        let key = key_of(entity)?;
        self.identity_map
            .get(&key)
            .map(|tracked| tracked.identifier.clone())
    }

    /// Current key of an entry, following a transient key to the identifier
    /// key a flush moved it to.
    fn resolve_key(&self, key: &ObjectKey) -> Option<ObjectKey> {
        if self.identity_map.contains_key(key) {
            return Some(*key);
        }
        self.rekeyed
            .get(key)
            .filter(|current| self.identity_map.contains_key(current))
            .copied()
    }

    /// The managed copy of the entity tracked under `key`.
    ///
    /// `key` may be the transient key returned by [`Session::persist`]; after a
    /// flush the copy carries the generated identifier.
    pub fn find<M: Model + Clone>(&self, key: &ObjectKey) -> Option<M> {
        let key = self.resolve_key(key)?;
        self.identity_map
            .get(&key)?
            .entity
            .as_any()
            .downcast_ref::<M>()
            .cloned()
    }

    /// The identifier the session holds for the entry tracked under `key`.
    pub fn identifier(&self, key: &ObjectKey) -> Option<Identifier> {
        let key = self.resolve_key(key)?;
        self.identity_map
            .get(&key)
            .map(|tracked| tracked.identifier.clone())
            .filter(Identifier::is_complete)
    }

    /// The managed copy of an entity, looked up by identifier.
    pub fn managed<M: Model + Clone>(&self, entity: &M) -> Option<M> {
        let key = key_of(entity)?;
        self.identity_map
            .get(&key)?
            .entity
            .as_any()
            .downcast_ref::<M>()
            .cloned()
    }

    /// Check if an entity is tracked by this session.
    pub fn contains(&self, entity: &dyn Model) -> bool {
        key_of(entity).is_some_and(|key| self.identity_map.contains_key(&key))
    }

    /// State of an entity with respect to this session.
    pub fn state_of(&self, entity: &dyn Model) -> ObjectState {
        key_of(entity)
            .and_then(|key| self.identity_map.get(&key))
            .map_or(ObjectState::Detached, |tracked| tracked.state)
    }

    /// Stop tracking an entity. Pending writes for it are dropped.
    pub fn expunge(&mut self, entity: &dyn Model) {
        if let Some(key) = key_of(entity) {
            self.touch(key);
            self.identity_map.remove(&key);
        }
    }

    /// Record the current entry for `key` before its first change at the
    /// current transaction level.
    fn touch(&mut self, key: ObjectKey) {
        let Some(level) = self.journal.last_mut() else {
            return;
        };
        if level.iter().any(|(k, _)| *k == key) {
            return;
        }
        level.push((key, self.identity_map.get(&key).cloned()));
    }

    fn restore(&mut self, level: JournalLevel) {
        for (key, snapshot) in level.into_iter().rev() {
            match snapshot {
                Some(tracked) => {
                    self.identity_map.insert(key, tracked);
                }
                None => {
                    self.identity_map.remove(&key);
                }
            }
        }
    }

    // ========================================================================
    // Flushing
    // ========================================================================

    /// Write pending changes of one managed entity.
    ///
    /// New entities are INSERTed, dirty ones UPDATEd on their scalar columns.
    #[tracing::instrument(level = "debug", skip(self, cx, entity))]
    pub async fn flush_object<M: Model>(&mut self, cx: &Cx, entity: &M) -> Outcome<(), Error> {
        let meta = entity.metadata();
        let Some(key) = key_of(entity).filter(|key| self.identity_map.contains_key(key)) else {
            return Outcome::Err(Error::identity(
                meta.name,
                "entity is not managed by this session",
            ));
        };
        self.flush_key(cx, key).await
    }

    /// Write every pending change: inserts first, then updates.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn flush(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let start = std::time::Instant::now();

        let mut keys: Vec<(ObjectKey, ObjectState)> = self
            .identity_map
            .iter()
            .filter(|(_, t)| t.state == ObjectState::New || t.dirty)
            .map(|(k, t)| (*k, t.state))
            .collect();
        keys.sort_by_key(|(_, state)| *state != ObjectState::New);

        tracing::info!(pending = keys.len(), "Starting flush");

        for (key, _) in keys {
            match self.flush_key(cx, key).await {
                Outcome::Ok(()) => {}
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        tracing::info!(elapsed_ms = start.elapsed().as_millis(), "Flush completed");
        Outcome::Ok(())
    }

    async fn flush_key(&mut self, cx: &Cx, key: ObjectKey) -> Outcome<(), Error> {
        let dialect = self.connection.dialect();
        let Some(tracked) = self.identity_map.get(&key) else {
            return Outcome::Ok(());
        };
        let entity = tracked.entity.model();
        let meta = entity.metadata();
        let is_new = tracked.state == ObjectState::New;

        let statement = if is_new {
            self.insert_statement(dialect, entity).map(Some)
        } else if tracked.dirty {
            self.update_statement(dialect, entity, &tracked.identifier)
        } else {
            return Outcome::Ok(());
        };
        let needs_generated_id = is_new && !tracked.identifier.is_complete();

        match statement {
            Ok(Some((sql, params))) => {
                tracing::debug!(table = meta.table_name, sql = %sql, "Flushing entity");
                match self.connection.execute(cx, &sql, &params).await {
                    Outcome::Ok(_) => {}
                    Outcome::Err(e) => return Outcome::Err(e),
                    Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                    Outcome::Panicked(p) => return Outcome::Panicked(p),
                }
            }
            Ok(None) => {}
            Err(e) => return Outcome::Err(e),
        }

        if needs_generated_id && meta.is_post_insert_generated() {
            let id = match self.last_insert_id(cx, meta).await {
                Outcome::Ok(id) => id,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            return match self.assign_generated_identifier(key, id) {
                Ok(()) => Outcome::Ok(()),
                Err(e) => Outcome::Err(e),
            };
        }

        self.touch(key);
        if let Some(tracked) = self.identity_map.get_mut(&key) {
            tracked.state = ObjectState::Persistent;
            tracked.dirty = false;
        }
        Outcome::Ok(())
    }

    /// Store a generated identifier on a transient entry and re-key it.
    fn assign_generated_identifier(&mut self, key: ObjectKey, id: Value) -> Result<()> {
        let Some(mut tracked) = self.identity_map.get(&key).cloned() else {
            return Ok(());
        };
        let meta = tracked.entity.model().metadata();
        let field = meta
            .generated_identifier_field()
            .ok_or_else(|| Error::metadata(meta.name, "no field receives the generated identifier"))?;
        tracked.entity.model_mut().set_field_value(field, id)?;
        tracked.identifier = Identifier::of(tracked.entity.model())?;
        tracked.state = ObjectState::Persistent;
        tracked.dirty = false;

        let new_key = ObjectKey::from_identifier(meta, &tracked.identifier);
        self.touch(key);
        self.touch(new_key);
        self.identity_map.remove(&key);
        self.identity_map.insert(new_key, tracked);
        self.rekeyed.insert(key, new_key);
        Ok(())
    }

    /// Ask the database for the identifier generated by the last insert of
    /// an entity of type `meta` on this connection.
    #[tracing::instrument(level = "debug", skip(self, cx, meta), fields(entity = meta.name))]
    pub async fn last_insert_id(&self, cx: &Cx, meta: &EntityMetadata) -> Outcome<Value, Error> {
        let IdGeneration::Identity { sequence } = meta.id_generation else {
            return Outcome::Err(Error::metadata(
                meta.name,
                "identifier is not generated by the database",
            ));
        };
        let sql = self.connection.dialect().last_insert_id_sql(sequence);

        match self.connection.query_one(cx, &sql, &[]).await {
            Outcome::Ok(row) => match row.as_ref().and_then(|r| r.get(0)) {
                Some(value) if !value.is_null() => {
                    tracing::trace!(value = ?value, "Generated identifier");
                    Outcome::Ok(value.clone())
                }
                _ => Outcome::Err(Error::identity(
                    meta.name,
                    "database returned no generated identifier",
                )),
            },
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    // ========================================================================
    // Transaction Management
    // ========================================================================

    /// Begin a transaction, or a savepoint when one is already active.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn begin(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let depth = self.journal.len();
        let sql = if depth == 0 {
            "BEGIN".to_string()
        } else if self.config.use_savepoints {
            match self.savepoint_name(depth) {
                Ok(name) => format!("SAVEPOINT {name}"),
                Err(e) => return Outcome::Err(e),
            }
        } else {
            return Outcome::Err(Error::Custom(
                "a transaction is already active and savepoints are disabled".to_string(),
            ));
        };

        tracing::info!(depth = depth + 1, "Beginning transaction");

        match self.connection.execute(cx, &sql, &[]).await {
            Outcome::Ok(_) => {
                self.journal.push(Vec::new());
                Outcome::Ok(())
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Commit the innermost transaction level.
    ///
    /// If the statement fails the level stays open so it can be rolled back.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn commit(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let depth = self.journal.len();
        let sql = match depth {
            0 => return Outcome::Err(Error::Custom("no active transaction".to_string())),
            1 => "COMMIT".to_string(),
            _ => match self.savepoint_name(depth - 1) {
                Ok(name) => format!("RELEASE SAVEPOINT {name}"),
                Err(e) => return Outcome::Err(e),
            },
        };

        tracing::info!(depth, "Committing transaction");

        match self.connection.execute(cx, &sql, &[]).await {
            Outcome::Ok(_) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }

        let level = self.journal.pop().unwrap_or_default();
        if let Some(parent) = self.journal.last_mut() {
            for (key, snapshot) in level {
                if !parent.iter().any(|(k, _)| *k == key) {
                    parent.push((key, snapshot));
                }
            }
        }
        Outcome::Ok(())
    }

    /// Roll back the innermost transaction level.
    ///
    /// A savepoint level is rolled back to and then released. Identity map
    /// changes made at this level are reverted even when the statements fail.
    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn rollback(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let depth = self.journal.len();
        let savepoint = match depth {
            0 => return Outcome::Err(Error::Custom("no active transaction".to_string())),
            1 => None,
            _ => match self.savepoint_name(depth - 1) {
                Ok(name) => Some(name),
                Err(e) => return Outcome::Err(e),
            },
        };

        tracing::info!(depth, "Rolling back transaction");

        let result = match &savepoint {
            None => self.connection.execute(cx, "ROLLBACK", &[]).await,
            Some(name) => {
                let rolled_back = self
                    .connection
                    .execute(cx, &format!("ROLLBACK TO SAVEPOINT {name}"), &[])
                    .await;
                // ROLLBACK TO keeps the savepoint open
                match rolled_back {
                    Outcome::Ok(_) => {
                        self.connection
                            .execute(cx, &format!("RELEASE SAVEPOINT {name}"), &[])
                            .await
                    }
                    other => other,
                }
            }
        };

        let level = self.journal.pop().unwrap_or_default();
        tracing::debug!(reverted = level.len(), "Reverting identity map");
        self.restore(level);

        match result {
            Outcome::Ok(_) => Outcome::Ok(()),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    fn savepoint_name(&self, level: usize) -> Result<String> {
        let prefix = &self.config.savepoint_prefix;
        if !is_valid_identifier(prefix) {
            return Err(Error::Query(QueryError::new(
                QueryErrorKind::Syntax,
                format!("invalid savepoint prefix `{prefix}`"),
            )));
        }
        Ok(format!("{prefix}_{level}"))
    }

    // ========================================================================
    // Debug Diagnostics
    // ========================================================================

    /// Get count of entities pending INSERT.
    pub fn pending_new_count(&self) -> usize {
        self.identity_map
            .values()
            .filter(|t| t.state == ObjectState::New)
            .count()
    }

    /// Get count of dirty entities pending UPDATE.
    pub fn pending_dirty_count(&self) -> usize {
        self.identity_map
            .values()
            .filter(|t| t.state == ObjectState::Persistent && t.dirty)
            .count()
    }

    /// Get total tracked entity count.
    pub fn tracked_count(&self) -> usize {
        self.identity_map.len()
    }

    /// Number of open transaction levels.
    pub fn transaction_depth(&self) -> usize {
        self.journal.len()
    }

    /// Whether we're in a transaction.
    pub fn in_transaction(&self) -> bool {
        !self.journal.is_empty()
    }

    /// Dump session state for debugging.
    pub fn debug_state(&self) -> SessionDebugInfo {
        SessionDebugInfo {
            tracked: self.tracked_count(),
            pending_new: self.pending_new_count(),
            pending_dirty: self.pending_dirty_count(),
            transaction_depth: self.transaction_depth(),
            journaled: self.journal.iter().map(Vec::len).sum(),
        }
    }
}

/// Key of an entity with a complete identifier.
fn key_of(entity: &dyn Model) -> Option<ObjectKey> {
    let identifier = Identifier::of(entity).ok()?;
    identifier
        .is_complete()
        .then(|| ObjectKey::from_identifier(entity.metadata(), &identifier))
}

/// Debug information about session state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDebugInfo {
    /// Total tracked entities.
    pub tracked: usize,
    /// Entities pending INSERT.
    pub pending_new: usize,
    /// Entities pending UPDATE.
    pub pending_dirty: usize,
    /// Open transaction levels.
    pub transaction_depth: usize,
    /// Identity map entries that a rollback would restore.
    pub journaled: usize,
}

// ============================================================================
// Statement Building
// ============================================================================

fn read_field(entity: &dyn Model, field: &'static str) -> Result<Value> {
    entity.field_value(field).ok_or_else(|| {
        Error::metadata(
            entity.metadata().name,
            format!("field `{field}` is not readable"),
        )
    })
}

impl<C: Connection> Session<C> {
    /// Value bound to one join column of `entity`: the identifier value the
    /// session holds for the associated entity, with the declared type of the
    /// referenced column.
    ///
    /// An absent association binds NULL. An associated entity the session does
    /// not manage is an identity error; a join column that cannot be mapped
    /// onto the target is a metadata error.
    pub fn join_column_value(
        &self,
        entity: &dyn Model,
        association: &'static AssociationInfo,
        join_column: &JoinColumn,
    ) -> Result<(SqlType, Value)> {
        let meta = entity.metadata();
        let target_meta = association.target();

        let sql_type = target_meta
            .type_of_column(join_column.referenced_column)
            .ok_or_else(|| {
                Error::metadata(
                    target_meta.name,
                    format!(
                        "column `{}` referenced by `{}.{}` has no declared type",
                        join_column.referenced_column, meta.name, association.name
                    ),
                )
            })?;

        let Some(target) = entity.association(association.name) else {
            return Ok((sql_type, Value::Null));
        };
        let identifier = self.entity_identifier(target).ok_or_else(|| {
            Error::identity(
                target_meta.name,
                format!(
                    "entity referenced by `{}.{}` is not managed by the session",
                    meta.name, association.name
                ),
            )
        })?;

        // foreign identifiers are keyed by association name
        let field = if target_meta.contains_foreign_identifier() {
            target_meta.field_for_column(join_column.referenced_column)
        } else {
            target_meta.field_name_for_column(join_column.referenced_column)
        };
        let value = field
            .and_then(|field| identifier.get(field))
            .cloned()
            .ok_or_else(|| {
                Error::metadata(
                    target_meta.name,
                    format!(
                        "column `{}` is not part of the identifier",
                        join_column.referenced_column
                    ),
                )
            })?;
        Ok((sql_type, value))
    }

    /// Join columns of the owning to-one associations of `entity` with their
    /// bound values. Identifier associations are skipped unless `with_identifier`.
    fn join_column_params(
        &self,
        entity: &dyn Model,
        with_identifier: bool,
    ) -> Result<Vec<(&'static str, Value)>> {
        let mut params = Vec::new();
        for association in entity
            .metadata()
            .associations
            .iter()
            .filter(|a| a.holds_foreign_key() && (with_identifier || !a.id))
        {
            for join_column in association.join_columns {
                let (sql_type, value) = self.join_column_value(entity, association, join_column)?;
                params.push((
                    join_column.source_column,
                    sql_type.to_database_value(&value)?,
                ));
            }
        }
        Ok(params)
    }

    fn insert_statement(&self, dialect: Dialect, entity: &dyn Model) -> Result<(String, Vec<Value>)> {
        let meta = entity.metadata();
        let mut columns = Vec::new();
        let mut params = Vec::new();

        for field in meta.fields {
            let value = read_field(entity, field.name)?;
            if field.auto_increment && value.is_null() {
                continue;
            }
            columns.push(field.column_name);
            params.push(field.sql_type.to_database_value(&value)?);
        }
        for (column, value) in self.join_column_params(entity, true)? {
            columns.push(column);
            params.push(value);
        }

        Ok((dialect.insert_sql(meta.table_name, &columns), params))
    }

    /// UPDATE of every non-identifier column, scalar and join, `None` if
    /// there is none.
    fn update_statement(
        &self,
        dialect: Dialect,
        entity: &dyn Model,
        identifier: &Identifier,
    ) -> Result<Option<(String, Vec<Value>)>> {
        let meta = entity.metadata();
        let mut columns = Vec::new();
        let mut params = Vec::new();

        for field in meta.fields.iter().filter(|f| !f.primary_key) {
            let value = read_field(entity, field.name)?;
            columns.push(field.column_name);
            params.push(field.sql_type.to_database_value(&value)?);
        }
        for (column, value) in self.join_column_params(entity, false)? {
            columns.push(column);
            params.push(value);
        }
        if columns.is_empty() {
            return Ok(None);
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                format!(
                    "{} = {}",
                    dialect.quote_identifier(column),
                    dialect.placeholder(i + 1)
                )
            })
            .collect();

        let mut conditions = Vec::new();
        for (name, value) in identifier.iter() {
            let (column, sql_type) = identifier_column(meta, name)?;
            params.push(sql_type.to_database_value(value)?);
            conditions.push(format!(
                "{} = {}",
                dialect.quote_identifier(column),
                dialect.placeholder(params.len())
            ));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            dialect.quote_identifier(meta.table_name),
            assignments.join(", "),
            conditions.join(" AND ")
        );
        Ok(Some((sql, params)))
    }
}

/// Column and type backing one identifier field.
fn identifier_column(meta: &EntityMetadata, name: &str) -> Result<(&'static str, SqlType)> {
    if let Some(field) = meta.field(name) {
        return Ok((field.column_name, field.sql_type));
    }
    let column = meta
        .association(name)
        .and_then(|assoc| assoc.join_columns.first())
        .map(|jc| jc.source_column)
        .ok_or_else(|| Error::metadata(meta.name, format!("identifier `{name}` has no column")))?;
    let sql_type = meta
        .type_of_column(column)
        .ok_or_else(|| Error::metadata(meta.name, format!("column `{column}` has no type")))?;
    Ok((column, sql_type))
}

// ============================================================================
// Unit Tests
// ============================================================================
