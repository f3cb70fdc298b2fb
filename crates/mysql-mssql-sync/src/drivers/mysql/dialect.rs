//! MySQL/MariaDB SQL for the records table.
//!
//! All statements use `?` placeholders; only the (validated) table name is
//! interpolated.

use crate::core::page::SearchFilter;
use crate::core::record::MAX_PAYLOAD_LEN;

/// MySQL SQL builder bound to one records table.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    table: String,
}

impl MysqlDialect {
    /// Create a dialect for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Quote a MySQL identifier with backticks.
    pub fn quote_ident(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn table_ref(&self) -> String {
        Self::quote_ident(&self.table)
    }

    /// DDL for the records table. Idempotent.
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                pk BIGINT NOT NULL PRIMARY KEY,
                payload VARCHAR({}) NOT NULL
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            self.table_ref(),
            MAX_PAYLOAD_LEN
        )
    }

    /// Binds: pk, payload.
    pub fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (pk, payload) VALUES (?, ?)", self.table_ref())
    }

    /// Search predicate. Binds: pattern, escape, pattern, escape.
    /// A `'\\'` literal would not survive `NO_BACKSLASH_ESCAPES`.
    fn search_clause(search: Option<&SearchFilter>) -> &'static str {
        match search {
            Some(_) => " WHERE (CAST(pk AS CHAR) LIKE ? ESCAPE ? OR payload LIKE ? ESCAPE ?)",
            None => "",
        }
    }

    /// LIKE pattern for the search term, escaped with [`crate::core::page::LIKE_ESCAPE`].
    pub fn like_pattern(search: &SearchFilter) -> String {
        search.like_pattern(&[])
    }

    /// Binds: [pattern, escape, pattern, escape].
    pub fn count_sql(&self, search: Option<&SearchFilter>) -> String {
        format!(
            "SELECT COUNT(*) AS cnt FROM {}{}",
            self.table_ref(),
            Self::search_clause(search)
        )
    }

    /// Binds: [pattern, escape, pattern, escape,] limit, offset.
    pub fn select_page_sql(&self, search: Option<&SearchFilter>) -> String {
        format!(
            "SELECT pk, payload FROM {}{} ORDER BY pk LIMIT ? OFFSET ?",
            self.table_ref(),
            Self::search_clause(search)
        )
    }

    /// Keyset read. Binds: [after,] limit.
    pub fn select_after_sql(&self, has_after: bool) -> String {
        let condition = if has_after { " WHERE pk > ?" } else { "" };
        format!(
            "SELECT pk, payload FROM {}{} ORDER BY pk LIMIT ?",
            self.table_ref(),
            condition
        )
    }
}
