//! Failures reported by the external data store.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Network, pool or transport failure.
    Connection,
    /// Unique, not-null or check constraint rejected the write.
    Constraint,
    /// The table the application expects does not exist (migration not run).
    MissingTable,
    /// A column the application expects is absent from the table.
    MissingColumn,
    Permission,
    /// An update targeted an id with no live row.
    RowNotFound,
    /// A value the store could not accept for its column type.
    InvalidInput,
    Other,
}

impl StoreErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorKind::Connection => "connection",
            StoreErrorKind::Constraint => "constraint",
            StoreErrorKind::MissingTable => "missing_table",
            StoreErrorKind::MissingColumn => "missing_column",
            StoreErrorKind::Permission => "permission",
            StoreErrorKind::RowNotFound => "row_not_found",
            StoreErrorKind::InvalidInput => "invalid_input",
            StoreErrorKind::Other => "other",
        }
    }

    /// Table or column the application expects is missing in the store.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, StoreErrorKind::MissingTable | StoreErrorKind::MissingColumn)
    }
}

#[derive(Error, Debug, Clone)]
#[error("{table}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub table: String,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, table: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError {
            kind,
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn missing_table(table: &str) -> Self {
        StoreError::new(
            StoreErrorKind::MissingTable,
            table,
            format!("relation \"{}\" does not exist", table),
        )
    }

    pub fn missing_column(table: &str, column: &str) -> Self {
        StoreError::new(
            StoreErrorKind::MissingColumn,
            table,
            format!("column \"{}\" of relation \"{}\" does not exist", column, table),
        )
    }

    pub fn row_not_found(table: &str, id: &str) -> Self {
        StoreError::new(StoreErrorKind::RowNotFound, table, format!("no row with id '{}'", id))
    }

    /// Maps an sqlx failure by SQLSTATE so callers can tell schema mismatches from other errors.
    pub fn from_sqlx(table: &str, err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::Database(db) => db.code().map(|c| kind_for_sqlstate(&c)).unwrap_or(StoreErrorKind::Other),
            sqlx::Error::RowNotFound => StoreErrorKind::RowNotFound,
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreErrorKind::Connection,
            _ => StoreErrorKind::Other,
        };
        StoreError::new(kind, table, err.to_string())
    }
}

/// Classifies a PostgreSQL SQLSTATE.
pub(crate) fn kind_for_sqlstate(code: &str) -> StoreErrorKind {
    match code {
        "42P01" => StoreErrorKind::MissingTable,
        "42703" => StoreErrorKind::MissingColumn,
        "42501" => StoreErrorKind::Permission,
        c if c.starts_with("23") => StoreErrorKind::Constraint,
        // data exceptions (22P02 bad text representation, 22007 bad datetime, ...)
        // and 42804 datatype mismatch come from the caller's values
        c if c.starts_with("22") || c == "42804" => StoreErrorKind::InvalidInput,
        _ => StoreErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_table() {
        let e = StoreError::missing_column("documents", "content");
        assert_eq!(e.kind, StoreErrorKind::MissingColumn);
        assert!(e.to_string().starts_with("documents: "));
        assert!(e.to_string().contains("\"content\""));
    }

    #[test]
    fn pool_timeout_is_a_connection_failure() {
        let e = StoreError::from_sqlx("banks", sqlx::Error::PoolTimedOut);
        assert_eq!(e.kind, StoreErrorKind::Connection);
        assert_eq!(e.table, "banks");
    }

    #[test]
    fn sqlstate_classes() {
        assert_eq!(kind_for_sqlstate("42P01"), StoreErrorKind::MissingTable);
        assert_eq!(kind_for_sqlstate("23505"), StoreErrorKind::Constraint);
        assert_eq!(kind_for_sqlstate("22P02"), StoreErrorKind::InvalidInput);
        assert_eq!(kind_for_sqlstate("22007"), StoreErrorKind::InvalidInput);
        assert_eq!(kind_for_sqlstate("42804"), StoreErrorKind::InvalidInput);
        assert_eq!(kind_for_sqlstate("XX000"), StoreErrorKind::Other);
    }

    #[test]
    fn schema_mismatch_kinds() {
        assert!(StoreErrorKind::MissingTable.is_schema_mismatch());
        assert!(StoreErrorKind::MissingColumn.is_schema_mismatch());
        assert!(!StoreErrorKind::Constraint.is_schema_mismatch());
    }
}
