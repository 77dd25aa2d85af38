//! The INSERT statement of an insert plan.

use asupersync::{Cx, Outcome};
use serde::Serialize;
use uniq_core::{Connection, Dialect, EntityMetadata, Error, Result, SqlType, Value};

use crate::plan::InsertPlan;

/// A parameter and the column type it is bound as.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParam {
    pub value: Value,
    pub sql_type: SqlType,
}

/// A built but not yet executed INSERT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedInsert {
    sql: String,
    columns: Vec<&'static str>,
    params: Vec<BoundParam>,
}

impl PreparedInsert {
    /// Build the statement for `plan` on `meta`'s table.
    ///
    /// Field columns come first, join columns second; parameters follow the
    /// same order.
    pub fn prepare(dialect: Dialect, meta: &EntityMetadata, plan: &InsertPlan) -> Self {
        let columns = plan.columns();
        let params = plan
            .fields
            .iter()
            .map(|f| BoundParam {
                value: f.value.clone(),
                sql_type: f.sql_type,
            })
            .chain(plan.associations.iter().map(|a| BoundParam {
                value: a.value.clone(),
                sql_type: a.sql_type,
            }))
            .collect();

        Self {
            sql: dialect.insert_sql(meta.table_name, &columns),
            columns,
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn params(&self) -> &[BoundParam] {
        &self.params
    }

    /// Parameter values converted to their column types.
    pub fn database_values(&self) -> Result<Vec<Value>> {
        self.params
            .iter()
            .map(|p| p.sql_type.to_database_value(&p.value))
            .collect()
    }

    /// Run the statement on `conn`.
    #[tracing::instrument(level = "debug", skip(self, cx, conn))]
    pub async fn execute<C: Connection>(&self, cx: &Cx, conn: &C) -> Outcome<u64, Error> {
        let values = match self.database_values() {
            Ok(values) => values,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(sql = %self.sql, params = values.len(), "Executing insert");
        conn.execute(cx, &self.sql, &values).await
    }
}
