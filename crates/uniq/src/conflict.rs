//! Classification of driver failures.
//!
//! Engines report constraint violations with their own codes: MySQL with
//! numeric server error codes, PostgreSQL with SQLSTATE classes, SQLite with
//! extended result codes. Each dialect has one static table mapping those codes
//! to a [`ViolationKind`]. Codes are always read in the dialect of the
//! connection that ran the statement.

use serde::Serialize;
use uniq_core::{Dialect, DriverError, Error, NativeErrorCode, QueryError, QueryErrorKind};

/// The kind of constraint a driver failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    Unique,
    NotNull,
    ForeignKey,
    /// Another integrity constraint (CHECK, or an engine's generic code).
    Constraint,
    /// Not a constraint violation.
    Other,
}

// ER_DUP_ENTRY, ER_DUP_ENTRY_WITH_KEY_NAME, ER_BAD_NULL_ERROR,
// ER_NO_DEFAULT_FOR_FIELD, ER_ROW_IS_REFERENCED(_2), ER_NO_REFERENCED_ROW(_2),
// ER_CHECK_CONSTRAINT_VIOLATED
static MYSQL_CODES: &[(i64, ViolationKind)] = &[
    (1062, ViolationKind::Unique),
    (1586, ViolationKind::Unique),
    (1048, ViolationKind::NotNull),
    (1364, ViolationKind::NotNull),
    (1451, ViolationKind::ForeignKey),
    (1452, ViolationKind::ForeignKey),
    (1216, ViolationKind::ForeignKey),
    (1217, ViolationKind::ForeignKey),
    (3819, ViolationKind::Constraint),
];

static POSTGRES_STATES: &[(&str, ViolationKind)] = &[
    ("23505", ViolationKind::Unique),
    ("23502", ViolationKind::NotNull),
    ("23503", ViolationKind::ForeignKey),
    ("23514", ViolationKind::Constraint),
    ("23000", ViolationKind::Constraint),
];

// SQLITE_CONSTRAINT_UNIQUE, _PRIMARYKEY, _NOTNULL, _FOREIGNKEY, _CHECK and the
// bare SQLITE_CONSTRAINT, which does not say which constraint failed.
static SQLITE_CODES: &[(i64, ViolationKind)] = &[
    (2067, ViolationKind::Unique),
    (1555, ViolationKind::Unique),
    (1299, ViolationKind::NotNull),
    (787, ViolationKind::ForeignKey),
    (275, ViolationKind::Constraint),
    (19, ViolationKind::Constraint),
];

/// Classify a native error code of `dialect`.
pub fn classify(dialect: Dialect, code: &NativeErrorCode) -> ViolationKind {
    let found = match (dialect, code) {
        (Dialect::Mysql, NativeErrorCode::Numeric(n)) => lookup(MYSQL_CODES, n),
        (Dialect::Sqlite, NativeErrorCode::Numeric(n)) => lookup(SQLITE_CODES, n),
        (Dialect::Postgres, NativeErrorCode::SqlState(state)) => POSTGRES_STATES
            .iter()
            .find(|(s, _)| *s == state.as_str())
            .map(|(_, kind)| *kind),
        _ => None,
    };
    found.unwrap_or(ViolationKind::Other)
}

fn lookup(table: &[(i64, ViolationKind)], code: &i64) -> Option<ViolationKind> {
    table.iter().find(|(c, _)| c == code).map(|(_, kind)| *kind)
}

/// The driver failure behind `err`, looking through one level of wrapping.
pub fn driver_error(err: &Error) -> Option<&DriverError> {
    match err {
        Error::Driver(driver) => Some(driver),
        other => std::error::Error::source(other)?.downcast_ref::<DriverError>(),
    }
}

/// Classify `driver` in the connection's `dialect`.
fn classify_driver(dialect: Dialect, driver: &DriverError) -> ViolationKind {
    if driver.dialect != dialect {
        tracing::warn!(
            connection = ?dialect,
            reported = ?driver.dialect,
            code = %driver.code,
            "Driver error tagged with another dialect"
        );
    }
    classify(dialect, &driver.code)
}

/// Whether `err`, raised by a `dialect` connection, reports a unique
/// constraint violation.
///
/// Errors without a driver error behind them count only if already translated
/// to [`QueryErrorKind::UniqueViolation`].
pub fn is_unique_violation(dialect: Dialect, err: &Error) -> bool {
    match driver_error(err) {
        Some(driver) => classify_driver(dialect, driver) == ViolationKind::Unique,
        None => matches!(
            err,
            Error::Query(QueryError {
                kind: QueryErrorKind::UniqueViolation,
                ..
            })
        ),
    }
}

/// Turn a raw driver failure of a `dialect` connection into a dialect-neutral
/// [`Error::Query`].
///
/// The driver error is kept as the source. Other errors are returned as they
/// are.
pub fn translate_error(dialect: Dialect, err: Error, sql: Option<&str>) -> Error {
    let Error::Driver(driver) = err else {
        return err;
    };

    let kind = match classify_driver(dialect, &driver) {
        ViolationKind::Unique => QueryErrorKind::UniqueViolation,
        ViolationKind::NotNull => QueryErrorKind::NotNullViolation,
        ViolationKind::ForeignKey => QueryErrorKind::ForeignKeyViolation,
        ViolationKind::Constraint => QueryErrorKind::Constraint,
        ViolationKind::Other => QueryErrorKind::Database,
    };

    let mut query = QueryError::new(kind, driver.message.clone());
    if let Some(state) = driver.sqlstate() {
        query = query.with_sqlstate(state);
    }
    if let Some(sql) = sql {
        query = query.with_sql(sql);
    }
    Error::Query(query.with_source(driver))
}
