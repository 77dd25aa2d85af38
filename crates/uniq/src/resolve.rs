//! Reading insert values from an entity.

use uniq_core::{Connection, Error, Model, Result};
use uniq_session::Session;

use crate::plan::{
    InsertPlan, PlannedField, PlannedJoinColumn, RequiredJoinColumn, required_fields,
    required_join_columns,
};

/// Build the insert plan of `entity`.
///
/// Scalar values are taken as they are. Join column values are the identifier
/// values the session holds for the associated entities, so an associated
/// entity only has to be known to the session, not flushed.
pub fn resolve_plan<C: Connection>(session: &Session<C>, entity: &dyn Model) -> Result<InsertPlan> {
    let meta = entity.metadata();
    let mut plan = InsertPlan::default();

    for field in required_fields(meta) {
        let value = entity.field_value(field.name).ok_or_else(|| {
            Error::metadata(meta.name, format!("field `{}` is not readable", field.name))
        })?;
        plan.fields.push(PlannedField {
            field: field.name,
            column: field.column_name,
            sql_type: field.sql_type,
            value,
        });
    }

    for required in required_join_columns(meta) {
        plan.associations
            .push(resolve_join_column(session, entity, required)?);
    }

    tracing::trace!(
        entity = meta.name,
        fields = plan.fields.len(),
        associations = plan.associations.len(),
        "Resolved insert plan"
    );
    Ok(plan)
}

fn resolve_join_column<C: Connection>(
    session: &Session<C>,
    entity: &dyn Model,
    required: RequiredJoinColumn,
) -> Result<PlannedJoinColumn> {
    let RequiredJoinColumn {
        association,
        join_column,
    } = required;
    let (sql_type, value) = session.join_column_value(entity, association, join_column)?;

    Ok(PlannedJoinColumn {
        association: association.name,
        column: join_column.source_column,
        referenced_column: join_column.referenced_column,
        sql_type,
        value,
    })
}
