//! The driver contract.
//!
//! Transactions are driven by the session through plain `BEGIN` / `COMMIT` /
//! `ROLLBACK` / `SAVEPOINT` statements, so a driver only needs to execute
//! statements and report which engine it talks to.

use std::future::Future;

use asupersync::{Cx, Outcome};

use crate::dialect::Dialect;
use crate::error::Error;
use crate::row::Row;
use crate::value::Value;

/// A database connection.
///
/// Failures coming from the engine should be reported as
/// [`Error::Driver`](crate::Error::Driver), or wrapped once as the `source` of a
/// [`QueryError`](crate::QueryError), so the native error code stays reachable.
pub trait Connection: Send + Sync {
    /// The engine this connection talks to.
    fn dialect(&self) -> Dialect;

    /// Run a query and collect every row.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Run a query and return the first row, if any.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;
}
