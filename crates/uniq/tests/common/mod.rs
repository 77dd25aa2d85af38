//! Shared fixtures: an in-memory connection and a few mapped entities.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use uniq::{
    AssociationInfo, Connection, Cx, Dialect, DriverError, EntityMetadata, Error, FieldInfo,
    IdGeneration, JoinColumn, Model, NativeErrorCode, Outcome, QueryError, QueryErrorKind,
    RelationshipKind, Result, Row, SqlType, Value,
};

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn expect_err<T: std::fmt::Debug>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Err(e) => e,
        other => panic!("expected an error, got {other:?}"),
    }
}

// ============================================================================
// MockConnection
// ============================================================================

/// Constraints of one mock table. Unique constraints are single-column.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableSchema {
    pub unique: &'static [&'static str],
    pub not_null: &'static [&'static str],
    pub auto_id: Option<&'static str>,
}

pub type Record = HashMap<String, Value>;

#[derive(Debug, Clone, Default)]
struct Table {
    rows: Vec<Record>,
    next_id: i64,
}

#[derive(Default)]
struct State {
    schemas: HashMap<String, TableSchema>,
    tables: HashMap<String, Table>,
    /// Snapshots taken by BEGIN (`None`) and SAVEPOINT (`Some(name)`).
    tx: Vec<(Option<String>, HashMap<String, Table>)>,
    log: Vec<String>,
    last_insert_id: Option<i64>,
    failures: Vec<(String, DriverError)>,
}

/// In-memory database enforcing unique and NOT NULL constraints the way the
/// configured engine reports them.
pub struct MockConnection {
    dialect: Dialect,
    wrap_errors: bool,
    state: Mutex<State>,
}

impl MockConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            wrap_errors: false,
            state: Mutex::default(),
        }
    }

    /// Connection with the tables of the fixture entities.
    pub fn with_fixture_tables(dialect: Dialect) -> Self {
        Self::new(dialect)
            .with_table(
                "user",
                TableSchema {
                    unique: &["email", "nick"],
                    not_null: &["id", "email"],
                    auto_id: Some("id"),
                },
            )
            .with_table(
                "account",
                TableSchema {
                    unique: &["login"],
                    not_null: &["login"],
                    auto_id: None,
                },
            )
            .with_table(
                "membership",
                TableSchema {
                    unique: &["user_id"],
                    not_null: &["id", "role"],
                    auto_id: Some("id"),
                },
            )
            .with_table(
                "ticket",
                TableSchema {
                    unique: &["code"],
                    not_null: &["id", "code"],
                    auto_id: Some("id"),
                },
            )
    }

    pub fn with_table(self, name: &str, schema: TableSchema) -> Self {
        self.state
            .lock()
            .unwrap()
            .schemas
            .insert(name.to_string(), schema);
        self
    }

    /// Report driver failures wrapped once inside a `QueryError`.
    pub fn wrapping_errors(mut self) -> Self {
        self.wrap_errors = true;
        self
    }

    pub fn dialect_code_unique(dialect: Dialect) -> NativeErrorCode {
        match dialect {
            Dialect::Mysql => NativeErrorCode::Numeric(1062),
            Dialect::Postgres => NativeErrorCode::SqlState("23505".to_string()),
            Dialect::Sqlite => NativeErrorCode::Numeric(2067),
        }
    }

    pub fn dialect_code_not_null(dialect: Dialect) -> NativeErrorCode {
        match dialect {
            Dialect::Mysql => NativeErrorCode::Numeric(1048),
            Dialect::Postgres => NativeErrorCode::SqlState("23502".to_string()),
            Dialect::Sqlite => NativeErrorCode::Numeric(1299),
        }
    }

    /// Fail the next statement starting with `prefix`.
    pub fn fail_next(&self, prefix: &str, code: NativeErrorCode, message: &str) {
        self.state.lock().unwrap().failures.push((
            prefix.to_string(),
            DriverError::new(self.dialect, code, message),
        ));
    }

    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn log_contains(&self, sql: &str) -> bool {
        self.log().iter().any(|s| s == sql)
    }

    pub fn in_transaction(&self) -> bool {
        !self.state.lock().unwrap().tx.is_empty()
    }

    /// Put a row in place without going through SQL.
    pub fn seed(&self, table: &str, record: &[(&str, Value)]) {
        let mut state = self.state.lock().unwrap();
        let table = state.tables.entry(table.to_string()).or_default();
        table.rows.push(
            record
                .iter()
                .map(|(c, v)| ((*c).to_string(), v.clone()))
                .collect(),
        );
    }

    fn fail(&self, driver: DriverError) -> Error {
        if self.wrap_errors {
            Error::Query(
                QueryError::new(QueryErrorKind::Database, "statement failed").with_source(driver),
            )
        } else {
            Error::Driver(driver)
        }
    }

    fn take_failure(&self, state: &mut State, sql: &str) -> Option<Error> {
        let pos = state
            .failures
            .iter()
            .position(|(prefix, _)| sql.starts_with(prefix.as_str()))?;
        let (_, driver) = state.failures.remove(pos);
        Some(self.fail(driver))
    }

    fn run(&self, sql: &str, params: &[Value]) -> std::result::Result<u64, Error> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.log.push(sql.to_string());
        if let Some(err) = self.take_failure(state, sql) {
            return Err(err);
        }

        match sql {
            "BEGIN" => {
                let snapshot = state.tables.clone();
                state.tx.push((None, snapshot));
                return Ok(0);
            }
            "COMMIT" => {
                state.tx.clear();
                return Ok(0);
            }
            "ROLLBACK" => {
                if let Some((_, snapshot)) = state.tx.drain(..).next() {
                    state.tables = snapshot;
                }
                return Ok(0);
            }
            _ => {}
        }

        if let Some(name) = sql.strip_prefix("SAVEPOINT ") {
            let snapshot = state.tables.clone();
            state.tx.push((Some(name.to_string()), snapshot));
            return Ok(0);
        }
        if let Some(name) = sql.strip_prefix("RELEASE SAVEPOINT ") {
            let pos = savepoint_position(state, name)?;
            state.tx.truncate(pos);
            return Ok(0);
        }
        if let Some(name) = sql.strip_prefix("ROLLBACK TO SAVEPOINT ") {
            let pos = savepoint_position(state, name)?;
            state.tables = state.tx[pos].1.clone();
            state.tx.truncate(pos + 1);
            return Ok(0);
        }

        if let Some(caps) = insert_pattern().captures(sql) {
            let table = unquote(&caps[1]);
            let columns: Vec<String> = caps
                .get(2)
                .map(|m| m.as_str().split(", ").map(unquote).collect())
                .unwrap_or_default();
            return self.insert(state, &table, &columns, params);
        }
        if let Some(caps) = update_pattern().captures(sql) {
            let table = unquote(&caps[1]);
            let mut next = 0;
            let assignments = parse_pairs(&caps[2], ", ", &mut next);
            let conditions = parse_pairs(&caps[3], " AND ", &mut next);
            return self.update(state, &table, &assignments, &conditions, params);
        }

        Err(Error::Custom(format!("mock cannot execute `{sql}`")))
    }

    fn insert(
        &self,
        state: &mut State,
        table: &str,
        columns: &[String],
        params: &[Value],
    ) -> std::result::Result<u64, Error> {
        let schema = *state
            .schemas
            .get(table)
            .ok_or_else(|| Error::Custom(format!("no such table `{table}`")))?;
        let data = state.tables.entry(table.to_string()).or_default();

        let mut record: Record = columns.iter().cloned().zip(params.iter().cloned()).collect();
        if let Some(id_column) = schema.auto_id {
            if record.get(id_column).is_none_or(Value::is_null) {
                data.next_id += 1;
                record.insert(id_column.to_string(), Value::BigInt(data.next_id));
                state.last_insert_id = Some(data.next_id);
            }
        }

        for column in schema.not_null {
            if record.get(*column).is_none_or(Value::is_null) {
                return Err(self.fail(DriverError::new(
                    self.dialect,
                    Self::dialect_code_not_null(self.dialect),
                    format!("column `{column}` cannot be null"),
                )));
            }
        }
        for column in schema.unique {
            let Some(value) = record.get(*column).filter(|v| !v.is_null()) else {
                continue;
            };
            if data.rows.iter().any(|row| row.get(*column) == Some(value)) {
                return Err(self.fail(DriverError::new(
                    self.dialect,
                    Self::dialect_code_unique(self.dialect),
                    format!("duplicate entry for `{table}.{column}`"),
                )));
            }
        }

        data.rows.push(record);
        Ok(1)
    }

    fn update(
        &self,
        state: &mut State,
        table: &str,
        assignments: &[(String, usize)],
        conditions: &[(String, usize)],
        params: &[Value],
    ) -> std::result::Result<u64, Error> {
        let schema = *state
            .schemas
            .get(table)
            .ok_or_else(|| Error::Custom(format!("no such table `{table}`")))?;
        let data = state.tables.entry(table.to_string()).or_default();
        let param = |idx: usize| params.get(idx - 1).cloned().unwrap_or(Value::Null);

        let is_target = |row: &Record| {
            conditions
                .iter()
                .all(|(column, idx)| row.get(column) == Some(&param(*idx)))
        };

        for (column, idx) in assignments {
            let value = param(*idx);
            if value.is_null() {
                if schema.not_null.contains(&column.as_str()) {
                    return Err(self.fail(DriverError::new(
                        self.dialect,
                        Self::dialect_code_not_null(self.dialect),
                        format!("column `{column}` cannot be null"),
                    )));
                }
                continue;
            }
            if schema.unique.contains(&column.as_str())
                && data
                    .rows
                    .iter()
                    .any(|row| !is_target(row) && row.get(column) == Some(&value))
            {
                return Err(self.fail(DriverError::new(
                    self.dialect,
                    Self::dialect_code_unique(self.dialect),
                    format!("duplicate entry for `{table}.{column}`"),
                )));
            }
        }

        let mut affected = 0;
        for row in data.rows.iter_mut().filter(|row| is_target(&**row)) {
            for (column, idx) in assignments {
                row.insert(column.clone(), param(*idx));
            }
            affected += 1;
        }
        Ok(affected)
    }

    fn select(&self, sql: &str) -> std::result::Result<Option<Row>, Error> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.log.push(sql.to_string());
        if let Some(err) = self.take_failure(state, sql) {
            return Err(err);
        }

        let is_identity_query = matches!(
            sql,
            "SELECT lastval()" | "SELECT LAST_INSERT_ID()" | "SELECT last_insert_rowid()"
        ) || sql.starts_with("SELECT currval(");
        if !is_identity_query {
            return Err(Error::Custom(format!("mock cannot answer `{sql}`")));
        }

        let value = state.last_insert_id.map_or(Value::Null, Value::BigInt);
        Ok(Some(Row::new(vec!["id".to_string()], vec![value])))
    }
}

fn savepoint_position(state: &State, name: &str) -> std::result::Result<usize, Error> {
    state
        .tx
        .iter()
        .rposition(|(n, _)| n.as_deref() == Some(name))
        .ok_or_else(|| Error::Custom(format!("no savepoint `{name}`")))
}

fn insert_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^INSERT INTO (\S+) (?:\((.+)\) VALUES \((.+)\)|DEFAULT VALUES|\(\) VALUES \(\))$")
            .unwrap()
    })
}

fn update_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^UPDATE (\S+) SET (.+) WHERE (.+)$").unwrap())
}

fn unquote(name: &str) -> String {
    name.trim_matches(|c| c == '"' || c == '`').to_string()
}

/// Parse `col = <placeholder>` pairs into column and 1-based parameter index.
fn parse_pairs(text: &str, separator: &str, next: &mut usize) -> Vec<(String, usize)> {
    text.split(separator)
        .filter_map(|pair| pair.split_once(" = "))
        .map(|(column, placeholder)| {
            *next += 1;
            let idx = match placeholder {
                "?" => *next,
                other => other[1..].parse().unwrap_or(*next),
            };
            (unquote(column), idx)
        })
        .collect()
}

impl Connection for MockConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query(
        &self,
        _cx: &Cx,
        sql: &str,
        _params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let result = self.select(sql);
        async move {
            match result {
                Ok(row) => Outcome::Ok(row.into_iter().collect()),
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn query_one(
        &self,
        _cx: &Cx,
        sql: &str,
        _params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let result = self.select(sql);
        async move {
            match result {
                Ok(row) => Outcome::Ok(row),
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn execute(
        &self,
        _cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let result = self.run(sql, params);
        async move {
            match result {
                Ok(n) => Outcome::Ok(n),
                Err(e) => Outcome::Err(e),
            }
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

fn text(entity: &'static str, field: &str, value: Value) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(Error::metadata(
            entity,
            format!("`{field}` expects text, got {}", other.kind_name()),
        )),
    }
}

fn optional_text(entity: &'static str, field: &str, value: Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        other => text(entity, field, other).map(Some),
    }
}

/// `user`: generated id, a required unique email, an optional unique nick and
/// an optional bio that a bare insert leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    pub nick: Option<String>,
    pub bio: Option<String>,
}

impl User {
    pub fn new(email: &str) -> Self {
        Self {
            id: None,
            email: email.to_string(),
            nick: None,
            bio: None,
        }
    }
}

const USER_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", "id", SqlType::BigInt)
        .primary_key(true)
        .auto_increment(true),
    FieldInfo::new("email", "email", SqlType::VarChar(120)).unique(true),
    FieldInfo::new("nick", "nick", SqlType::Text)
        .nullable(true)
        .unique(true),
    FieldInfo::new("bio", "bio", SqlType::Text).nullable(true),
];

pub static USER: EntityMetadata = EntityMetadata {
    name: "User",
    table_name: "user",
    fields: USER_FIELDS,
    associations: &[],
    id_generation: IdGeneration::Identity {
        sequence: Some("user_id_seq"),
    },
};

pub fn user_meta() -> &'static EntityMetadata {
    &USER
}

impl Model for User {
    fn metadata(&self) -> &'static EntityMetadata {
        &USER
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "email" => Some(self.email.clone().into()),
            "nick" => Some(self.nick.clone().into()),
            "bio" => Some(self.bio.clone().into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.as_i64(),
            "email" => self.email = text("User", field, value)?,
            "nick" => self.nick = optional_text("User", field, value)?,
            "bio" => self.bio = optional_text("User", field, value)?,
            _ => return Err(Error::metadata("User", format!("no field `{field}`"))),
        }
        Ok(())
    }
}

/// `account`: application-assigned UUID identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub uuid: [u8; 16],
    pub login: String,
}

const ACCOUNT_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("uuid", "uuid", SqlType::Uuid).primary_key(true),
    FieldInfo::new("login", "login", SqlType::Text).unique(true),
];

pub static ACCOUNT: EntityMetadata = EntityMetadata {
    name: "Account",
    table_name: "account",
    fields: ACCOUNT_FIELDS,
    associations: &[],
    id_generation: IdGeneration::None,
};

pub fn account_meta() -> &'static EntityMetadata {
    &ACCOUNT
}

impl Model for Account {
    fn metadata(&self) -> &'static EntityMetadata {
        &ACCOUNT
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "uuid" => Some(Value::Uuid(self.uuid)),
            "login" => Some(self.login.clone().into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, field: &str, value: Value) -> Result<()> {
        match (field, value) {
            ("uuid", Value::Uuid(u)) => self.uuid = u,
            ("login", v) => self.login = text("Account", field, v)?,
            _ => return Err(Error::metadata("Account", format!("cannot set `{field}`"))),
        }
        Ok(())
    }
}

/// `passport`: identified by the account it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Passport {
    pub account: Account,
    pub issued: String,
}

const PASSPORT_JOIN: &[JoinColumn] = &[JoinColumn::new("account_uuid", "uuid").nullable(false)];

const PASSPORT_ASSOCIATIONS: &[AssociationInfo] = &[AssociationInfo::new(
    "account",
    RelationshipKind::OneToOne,
    account_meta,
)
.id(true)
.join_columns(PASSPORT_JOIN)];

pub static PASSPORT: EntityMetadata = EntityMetadata {
    name: "Passport",
    table_name: "passport",
    fields: &[FieldInfo::new("issued", "issued", SqlType::Text)],
    associations: PASSPORT_ASSOCIATIONS,
    id_generation: IdGeneration::None,
};

pub fn passport_meta() -> &'static EntityMetadata {
    &PASSPORT
}

impl Model for Passport {
    fn metadata(&self) -> &'static EntityMetadata {
        &PASSPORT
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "issued" => Some(self.issued.clone().into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "issued" => self.issued = text("Passport", field, value)?,
            _ => return Err(Error::metadata("Passport", format!("cannot set `{field}`"))),
        }
        Ok(())
    }

    fn association(&self, name: &str) -> Option<&dyn Model> {
        match name {
            "account" => Some(&self.account as &dyn Model),
            _ => None,
        }
    }
}

/// `membership`: required unique links to a user, an account and a passport.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub id: Option<i64>,
    pub role: String,
    pub user: Option<User>,
    pub account: Option<Account>,
    pub passport: Option<Passport>,
}

impl Membership {
    pub fn new(role: &str) -> Self {
        Self {
            id: None,
            role: role.to_string(),
            user: None,
            account: None,
            passport: None,
        }
    }
}

const MEMBERSHIP_FIELDS: &[FieldInfo] = &[
    FieldInfo::new("id", "id", SqlType::BigInt)
        .primary_key(true)
        .auto_increment(true),
    FieldInfo::new("role", "role", SqlType::Text),
];

const MEMBERSHIP_USER_JOIN: &[JoinColumn] = &[JoinColumn::new("user_id", "id")
    .nullable(false)
    .unique(true)];
const MEMBERSHIP_ACCOUNT_JOIN: &[JoinColumn] = &[JoinColumn::new("account_uuid", "uuid")
    .nullable(false)
    .unique(true)];
const MEMBERSHIP_PASSPORT_JOIN: &[JoinColumn] = &[JoinColumn::new("passport_account", "account_uuid")
    .nullable(false)
    .unique(true)];

const MEMBERSHIP_ASSOCIATIONS: &[AssociationInfo] = &[
    AssociationInfo::new("user", RelationshipKind::ManyToOne, user_meta)
        .join_columns(MEMBERSHIP_USER_JOIN),
    AssociationInfo::new("account", RelationshipKind::ManyToOne, account_meta)
        .join_columns(MEMBERSHIP_ACCOUNT_JOIN),
    AssociationInfo::new("passport", RelationshipKind::ManyToOne, passport_meta)
        .join_columns(MEMBERSHIP_PASSPORT_JOIN),
];

pub static MEMBERSHIP: EntityMetadata = EntityMetadata {
    name: "Membership",
    table_name: "membership",
    fields: MEMBERSHIP_FIELDS,
    associations: MEMBERSHIP_ASSOCIATIONS,
    id_generation: IdGeneration::Identity { sequence: None },
};

impl Model for Membership {
    fn metadata(&self) -> &'static EntityMetadata {
        &MEMBERSHIP
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "role" => Some(self.role.clone().into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.as_i64(),
            "role" => self.role = text("Membership", field, value)?,
            _ => return Err(Error::metadata("Membership", format!("no field `{field}`"))),
        }
        Ok(())
    }

    fn association(&self, name: &str) -> Option<&dyn Model> {
        match name {
            "user" => self.user.as_ref().map(|u| u as &dyn Model),
            "account" => self.account.as_ref().map(|a| a as &dyn Model),
            "passport" => self.passport.as_ref().map(|p| p as &dyn Model),
            _ => None,
        }
    }
}

/// `badge`: its owner join column references a column `user` does not have.
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub id: Option<i64>,
    pub owner: Option<User>,
}

const BADGE_OWNER_JOIN: &[JoinColumn] = &[JoinColumn::new("owner_id", "missing")
    .nullable(false)
    .unique(true)];

const BADGE_ASSOCIATIONS: &[AssociationInfo] =
    &[AssociationInfo::new("owner", RelationshipKind::OneToOne, user_meta)
        .join_columns(BADGE_OWNER_JOIN)];

pub static BADGE: EntityMetadata = EntityMetadata {
    name: "Badge",
    table_name: "badge",
    fields: &[FieldInfo::new("id", "id", SqlType::BigInt)
        .primary_key(true)
        .auto_increment(true)],
    associations: BADGE_ASSOCIATIONS,
    id_generation: IdGeneration::Identity { sequence: None },
};

impl Model for Badge {
    fn metadata(&self) -> &'static EntityMetadata {
        &BADGE
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.as_i64(),
            _ => return Err(Error::metadata("Badge", format!("no field `{field}`"))),
        }
        Ok(())
    }

    fn association(&self, name: &str) -> Option<&dyn Model> {
        match name {
            "owner" => self.owner.as_ref().map(|u| u as &dyn Model),
            _ => None,
        }
    }
}

/// `ticket`: an optional assignee that a bare insert leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: Option<i64>,
    pub code: String,
    pub assignee: Option<User>,
}

impl Ticket {
    pub fn new(code: &str) -> Self {
        Self {
            id: None,
            code: code.to_string(),
            assignee: None,
        }
    }
}

const TICKET_ASSIGNEE_JOIN: &[JoinColumn] = &[JoinColumn::new("assignee_id", "id")];

const TICKET_ASSOCIATIONS: &[AssociationInfo] =
    &[AssociationInfo::new("assignee", RelationshipKind::ManyToOne, user_meta)
        .join_columns(TICKET_ASSIGNEE_JOIN)];

pub static TICKET: EntityMetadata = EntityMetadata {
    name: "Ticket",
    table_name: "ticket",
    fields: &[
        FieldInfo::new("id", "id", SqlType::BigInt)
            .primary_key(true)
            .auto_increment(true),
        FieldInfo::new("code", "code", SqlType::Text).unique(true),
    ],
    associations: TICKET_ASSOCIATIONS,
    id_generation: IdGeneration::Identity { sequence: None },
};

impl Model for Ticket {
    fn metadata(&self) -> &'static EntityMetadata {
        &TICKET
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "code" => Some(self.code.clone().into()),
            _ => None,
        }
    }

    fn set_field_value(&mut self, field: &str, value: Value) -> Result<()> {
        match field {
            "id" => self.id = value.as_i64(),
            "code" => self.code = text("Ticket", field, value)?,
            _ => return Err(Error::metadata("Ticket", format!("no field `{field}`"))),
        }
        Ok(())
    }

    fn association(&self, name: &str) -> Option<&dyn Model> {
        match name {
            "assignee" => self.assignee.as_ref().map(|u| u as &dyn Model),
            _ => None,
        }
    }
}
