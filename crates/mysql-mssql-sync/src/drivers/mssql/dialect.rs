//! SQL Server T-SQL for the replicated records table.

use crate::core::page::SearchFilter;
use crate::core::record::Record;
use crate::error::{Result, SyncError};

/// T-SQL builder bound to one `[schema].[table]`.
#[derive(Debug, Clone)]
pub struct MssqlDialect {
    schema: String,
    table: String,
    payload_width: Option<usize>,
}

impl MssqlDialect {
    /// Create a dialect. `payload_width: None` declares NVARCHAR(MAX).
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        payload_width: Option<usize>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            payload_width,
        }
    }

    /// Quote an MSSQL identifier with brackets.
    pub fn quote_ident(name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    /// Schema-qualified, quoted table name.
    pub fn qualified_table(&self) -> String {
        format!(
            "{}.{}",
            Self::quote_ident(&self.schema),
            Self::quote_ident(&self.table)
        )
    }

    /// Escape a value for use inside an N'...' literal.
    fn literal(value: &str) -> String {
        value.replace('\'', "''")
    }

    /// Declared type of the payload column.
    pub fn payload_type(&self) -> String {
        match self.payload_width {
            Some(width) => format!("NVARCHAR({})", width),
            None => "NVARCHAR(MAX)".to_string(),
        }
    }

    /// Create the table if absent. Idempotent.
    pub fn ensure_table_sql(&self) -> String {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.tables WHERE name = N'{}' AND schema_id = SCHEMA_ID(N'{}'))
             BEGIN
                 CREATE TABLE {} (
                     pk BIGINT NOT NULL PRIMARY KEY,
                     payload {} NOT NULL
                 )
             END",
            Self::literal(&self.table),
            Self::literal(&self.schema),
            self.qualified_table(),
            self.payload_type()
        )
    }

    /// Single-row MERGE. Binds: @P1 pk, @P2 payload.
    ///
    /// A matched row always takes the incoming payload. A comparison would run
    /// under the column collation, which ignores case and trailing spaces.
    /// HOLDLOCK serializes concurrent merges on the same key.
    pub fn merge_sql(&self) -> String {
        format!(
            r#"MERGE INTO {} WITH (HOLDLOCK) AS target
               USING (VALUES (@P1, @P2)) AS source (pk, payload)
               ON target.pk = source.pk
               WHEN MATCHED THEN
                   UPDATE SET payload = source.payload
               WHEN NOT MATCHED THEN
                   INSERT (pk, payload) VALUES (source.pk, source.payload);"#,
            self.qualified_table()
        )
    }

    /// LIKE pattern for the search term. `[` opens a character class in T-SQL.
    pub fn like_pattern(search: &SearchFilter) -> String {
        search.like_pattern(&['['])
    }

    /// Search predicate. Binds: @P1 pattern.
    fn search_clause(search: Option<&SearchFilter>) -> &'static str {
        match search {
            Some(_) => {
                " WHERE (CAST(pk AS NVARCHAR(20)) LIKE @P1 ESCAPE '\\' OR payload LIKE @P1 ESCAPE '\\')"
            }
            None => "",
        }
    }

    /// Binds: [@P1 pattern].
    pub fn count_sql(&self, search: Option<&SearchFilter>) -> String {
        format!(
            "SELECT COUNT_BIG(*) AS cnt FROM {}{}",
            self.qualified_table(),
            Self::search_clause(search)
        )
    }

    /// Binds: [@P1 pattern,] offset, fetch.
    pub fn select_page_sql(&self, search: Option<&SearchFilter>) -> String {
        let (offset, fetch) = if search.is_some() {
            ("@P2", "@P3")
        } else {
            ("@P1", "@P2")
        };
        format!(
            "SELECT pk, payload FROM {}{} ORDER BY pk OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            self.qualified_table(),
            Self::search_clause(search),
            offset,
            fetch
        )
    }

    /// Reject a payload wider than the declared column.
    ///
    /// NVARCHAR(n) counts UTF-16 code units, not characters.
    pub fn check_width(&self, record: &Record) -> Result<()> {
        if let Some(width) = self.payload_width {
            let units: usize = record.payload.chars().map(char::len_utf16).sum();
            if units > width {
                return Err(SyncError::Validation(format!(
                    "payload for primary key {} is {} UTF-16 units; column {} allows {}",
                    record.primary_key,
                    units,
                    self.payload_type(),
                    width
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> MssqlDialect {
        MssqlDialect::new("dbo", "records", Some(1000))
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(MssqlDialect::quote_ident("records"), "[records]");
        assert_eq!(MssqlDialect::quote_ident("odd]name"), "[odd]]name]");
        assert_eq!(dialect().qualified_table(), "[dbo].[records]");
    }

    #[test]
    fn test_ensure_table_sql() {
        let sql = dialect().ensure_table_sql();
        assert!(sql.contains("IF NOT EXISTS (SELECT * FROM sys.tables WHERE name = N'records'"));
        assert!(sql.contains("SCHEMA_ID(N'dbo')"));
        assert!(sql.contains("CREATE TABLE [dbo].[records]"));
        assert!(sql.contains("payload NVARCHAR(1000) NOT NULL"));

        let sql = MssqlDialect::new("dbo", "records", None).ensure_table_sql();
        assert!(sql.contains("payload NVARCHAR(MAX) NOT NULL"));
    }

    #[test]
    fn test_merge_sql() {
        let sql = dialect().merge_sql();
        assert!(sql.contains("MERGE INTO [dbo].[records] WITH (HOLDLOCK) AS target"));
        assert!(sql.contains("USING (VALUES (@P1, @P2)) AS source (pk, payload)"));
        assert!(sql.contains("ON target.pk = source.pk"));
        assert!(sql.contains("WHEN MATCHED THEN\n                   UPDATE SET payload = source.payload"));
        assert!(!sql.contains("target.payload <>"));
        assert!(sql.contains("INSERT (pk, payload) VALUES (source.pk, source.payload);"));
    }

    #[test]
    fn test_page_parameters_shift_with_search() {
        let d = dialect();
        let plain = d.select_page_sql(None);
        assert!(plain.ends_with("ORDER BY pk OFFSET @P1 ROWS FETCH NEXT @P2 ROWS ONLY"));
        assert!(!plain.contains("WHERE"));

        let filter = SearchFilter::parse(Some("a"));
        let searched = d.select_page_sql(filter.as_ref());
        assert!(searched.contains("LIKE @P1 ESCAPE '\\'"));
        assert!(searched.ends_with("OFFSET @P2 ROWS FETCH NEXT @P3 ROWS ONLY"));
        assert!(d.count_sql(filter.as_ref()).contains("payload LIKE @P1"));
    }

    #[test]
    fn test_like_pattern_escapes_bracket() {
        let filter = SearchFilter::parse(Some("[x]")).unwrap();
        assert_eq!(MssqlDialect::like_pattern(&filter), "%\\[x]%");
    }

    #[test]
    fn test_check_width() {
        let d = MssqlDialect::new("dbo", "records", Some(5));
        assert!(d.check_width(&Record::new(1, "abcde")).is_ok());
        assert!(d.check_width(&Record::new(2, "abcdef")).is_err());
        // A non-BMP character takes two UTF-16 units
        assert!(d.check_width(&Record::new(3, "abc😀")).is_ok());
        assert!(d.check_width(&Record::new(4, "abcd😀")).is_err());

        let unbounded = MssqlDialect::new("dbo", "records", None);
        assert!(unbounded.check_width(&Record::new(5, "x".repeat(10_000))).is_ok());
    }
}
