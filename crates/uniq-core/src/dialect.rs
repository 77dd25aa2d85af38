//! SQL dialects.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Database engine a connection talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

impl Dialect {
    /// Lowercase engine name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Quote an identifier so reserved words and mixed case survive.
    ///
    /// Embedded quote characters are doubled.
    #[must_use]
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Dialect::Mysql => format!("`{}`", ident.replace('`', "``")),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Positional placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Mysql => "?".to_string(),
        }
    }

    /// Query returning the identity value generated by the last insert on
    /// this connection.
    ///
    /// PostgreSQL reads `currval` of the given sequence, or `lastval()` when
    /// the column's sequence is not named.
    #[must_use]
    pub fn last_insert_id_sql(&self, sequence: Option<&str>) -> String {
        match (self, sequence) {
            (Dialect::Postgres, Some(seq)) => {
                format!("SELECT currval('{}')", seq.replace('\'', "''"))
            }
            (Dialect::Postgres, None) => "SELECT lastval()".to_string(),
            (Dialect::Mysql, _) => "SELECT LAST_INSERT_ID()".to_string(),
            (Dialect::Sqlite, _) => "SELECT last_insert_rowid()".to_string(),
        }
    }

    /// INSERT of one row into `table` with one placeholder per column.
    ///
    /// Names are quoted here; pass them raw. With no columns the row is
    /// inserted with defaults only.
    #[must_use]
    pub fn insert_sql(&self, table: &str, columns: &[&str]) -> String {
        let table = self.quote_identifier(table);
        if columns.is_empty() {
            return match self {
                Dialect::Mysql => format!("INSERT INTO {table} () VALUES ()"),
                Dialect::Postgres | Dialect::Sqlite => {
                    format!("INSERT INTO {table} DEFAULT VALUES")
                }
            };
        }
        let quoted: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| self.placeholder(i)).collect();
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            quoted.join(", "),
            placeholders.join(", ")
        )
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier pattern is valid")
    })
}

/// Whether `name` is safe to splice unquoted into SQL (savepoint names and the like).
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}
