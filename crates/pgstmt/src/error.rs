//! Error types for pgstmt

use thiserror::Error;

/// Result type alias for pgstmt operations
pub type StmtResult<T> = Result<T, StmtError>;

/// Errors raised while building or executing a statement.
///
/// Construction errors (`ArityMismatch`, `MarkerMismatch`, `NothingToUpdate`, ...)
/// come from the builder itself and never touch the database. Everything else
/// comes from the execution helpers.
#[derive(Debug, Error)]
pub enum StmtError {
    /// An insert row did not supply a value for every declared field
    #[error("Arity mismatch: expected {expected} values, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// A template's `?` markers do not line up with its arguments
    #[error("Marker mismatch in '{template}': {markers} markers, {args} arguments")]
    MarkerMismatch {
        template: String,
        markers: usize,
        args: usize,
    },

    /// A condition was rejected when it was added to a bracket
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// An UPDATE (or upsert) has no assignments
    #[error("cannot update without new value")]
    NothingToUpdate,

    /// An INSERT has no declared fields
    #[error("cannot insert without fields")]
    NoInsertFields,

    /// An INSERT has fields but no value rows
    #[error("cannot insert without values")]
    NoInsertValues,

    /// Two tables in one statement share an alias
    #[error("Duplicate alias: '{0}'")]
    DuplicateAlias(String),

    /// Builder state that cannot form a valid statement
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// Identifier failed validation
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// A raw SQL expression reached the argument list
    #[error("raw SQL expression cannot be bound as a parameter: {0}")]
    UnboundRaw(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// More rows than expected
    #[error("Multiple rows found: expected {expected}, got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Statement timeout
    #[error("Statement timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Transaction control failed (begin, commit or rollback)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl StmtError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a too-many-rows error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Check if this is a construction-time error raised by the builder
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::ArityMismatch { .. }
                | Self::MarkerMismatch { .. }
                | Self::InvalidCondition(_)
                | Self::NothingToUpdate
                | Self::NoInsertFields
                | Self::NoInsertValues
                | Self::DuplicateAlias(_)
                | Self::InvalidStatement(_)
                | Self::InvalidIdentifier(_)
                | Self::UnboundRaw(_)
        )
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Parse a tokio_postgres error into a more specific StmtError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for StmtError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
