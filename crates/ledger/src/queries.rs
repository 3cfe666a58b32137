//! SQL text for every statement the ledger issues
//!
//! Table names arrive from configuration, so they are always quoted. The
//! filter fragment is operator-supplied SQL and is appended verbatim inside
//! parentheses.

use crate::models::Side;

/// Quote an identifier for use in SQL, doubling embedded quotes
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[must_use]
pub fn create_table(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            filename text,
            changed timestamp,
            size bigint,
            hash_new text,
            hash_old text
        )
        "#
    )
}

/// Non-unique index backing the per-filename point updates
#[must_use]
pub fn create_filename_index(table_name: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (filename)",
        quote_identifier(&format!("{table_name}_filename_idx")),
        quote_identifier(table_name)
    )
}

#[must_use]
pub fn count(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table}")
}

/// Head of the multi-row insert; values are appended by the query builder
#[must_use]
pub fn insert_head(table: &str) -> String {
    format!("INSERT INTO {table} (filename, size, changed) ")
}

/// One keyset page of filenames still missing `side`'s digest
///
/// Binds `?1` to the last rowid seen and `?2` to the page size.
#[must_use]
pub fn select_pending(table: &str, side: Side, filter: Option<&str>) -> String {
    let mut sql = format!(
        "SELECT rowid, filename FROM {table} WHERE {} IS NULL AND rowid > ?1",
        side.column()
    );
    if let Some(filter) = filter {
        sql.push_str(" AND (");
        sql.push_str(filter);
        sql.push(')');
    }
    sql.push_str(" ORDER BY rowid LIMIT ?2");
    sql
}

/// Statement that compiles `filter` against the table without reading rows
#[must_use]
pub fn filter_check(table: &str, filter: &str) -> String {
    format!("SELECT 1 FROM {table} WHERE ({filter}) LIMIT 0")
}

/// Point update that never overwrites an existing digest
#[must_use]
pub fn set_hash(table: &str, side: Side) -> String {
    let column = side.column();
    format!("UPDATE {table} SET {column} = ?1 WHERE filename = ?2 AND {column} IS NULL")
}

#[must_use]
pub fn select_entry(table: &str) -> String {
    format!(
        "SELECT filename, size, changed, hash_new, hash_old FROM {table} WHERE filename = ?1"
    )
}

#[must_use]
pub fn select_entries(table: &str) -> String {
    format!(
        "SELECT filename, size, changed, hash_new, hash_old FROM {table} ORDER BY filename"
    )
}

#[must_use]
pub fn status(table: &str, filter: Option<&str>) -> String {
    let mut sql = format!(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN hash_new IS NULL THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN hash_old IS NULL THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN hash_new IS NOT NULL AND hash_old IS NOT NULL THEN 1 ELSE 0 END), 0)
        FROM {table}"#
    );
    if let Some(filter) = filter {
        sql.push_str(" WHERE (");
        sql.push_str(filter);
        sql.push(')');
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("files"), "\"files\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_identifier("has space"), "\"has space\"");
    }

    #[test]
    fn test_pending_without_filter() {
        let sql = select_pending("\"files\"", Side::New, None);
        assert_eq!(
            sql,
            "SELECT rowid, filename FROM \"files\" WHERE hash_new IS NULL AND rowid > ?1 \
             ORDER BY rowid LIMIT ?2"
        );
    }

    #[test]
    fn test_pending_filter_is_parenthesized() {
        let sql = select_pending(
            "\"files\"",
            Side::Old,
            Some("filename like 'a/%' or filename like 'b/%'"),
        );
        assert_eq!(
            sql,
            "SELECT rowid, filename FROM \"files\" WHERE hash_old IS NULL AND rowid > ?1 \
             AND (filename like 'a/%' or filename like 'b/%') ORDER BY rowid LIMIT ?2"
        );
    }

    #[test]
    fn test_filter_check_reads_nothing() {
        assert_eq!(
            filter_check("\"files\"", "size > 0"),
            "SELECT 1 FROM \"files\" WHERE (size > 0) LIMIT 0"
        );
    }

    #[test]
    fn test_set_hash_guards_existing_value() {
        let sql = set_hash("\"files\"", Side::Old);
        assert!(sql.starts_with("UPDATE \"files\" SET hash_old = ?1"));
        assert!(sql.ends_with("AND hash_old IS NULL"));
    }

    #[test]
    fn test_schema_columns() {
        let sql = create_table("\"files\"");
        for column in [
            "filename text",
            "changed timestamp",
            "size bigint",
            "hash_new text",
            "hash_old text",
        ] {
            assert!(sql.contains(column), "missing `{column}`");
        }
        assert!(sql.contains("IF NOT EXISTS"));
    }

    #[test]
    fn test_index_name_is_quoted() {
        assert_eq!(
            create_filename_index("my files"),
            "CREATE INDEX IF NOT EXISTS \"my files_filename_idx\" ON \"my files\" (filename)"
        );
    }
}
