//! Statement assembly.
//!
//! [`QueryBuilder`] holds everything one INSERT, UPDATE, SELECT or DELETE
//! needs and renders it with [`QueryBuilder::generate_sql`]:
//!
//! ```ignore
//! use pgstmt::{QueryBuilder, args};
//!
//! let mut qb = QueryBuilder::insert_into("banks");
//! qb.set_insert_fields(&["code", "name"])
//!     .set_insert_values(args!["ABNA", "ABN AMRO"])?
//!     .set_return_fields(&["*"]);
//! let stmt = qb.generate_sql()?;
//! // INSERT INTO banks (code, name) VALUES ($1, $2) RETURNING *
//! ```
//!
//! Clauses are first collected as [`Fragment`]s with generic markers and only
//! numbered once, at the very end, so the `$n` order always follows the text
//! order regardless of the order the builder methods were called in.

mod insert;
mod join;
mod select;
mod update;

pub use join::{Join, JoinKind};

use crate::bracket::FilterBracket;
use crate::descriptor::Selection;
use crate::error::{StmtError, StmtResult};
use crate::sequencer::Fragment;
use crate::value::Value;
use std::collections::HashSet;
use tokio_postgres::types::ToSql;

/// Statement kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Insert,
    Update,
    Select,
    Delete,
}

impl Mode {
    fn keyword(self) -> &'static str {
        match self {
            Mode::Insert => "INSERT",
            Mode::Update => "UPDATE",
            Mode::Select => "SELECT",
            Mode::Delete => "DELETE",
        }
    }
}

/// One `SET` entry.
#[derive(Clone, Debug)]
pub(crate) struct Assignment {
    field: String,
    /// `None`: the assignment is computed in SQL and `field` is emitted as is.
    value: Option<Value>,
}

/// ON CONFLICT behaviour for inserts.
#[derive(Clone, Debug)]
pub(crate) enum ConflictAction {
    DoNothing,
    /// Apply the builder's assignments.
    DoUpdate,
}

#[derive(Clone, Debug)]
pub(crate) struct Conflict {
    target: Vec<String>,
    action: ConflictAction,
}

/// Extra FROM source for UPDATE (e.g. a JSON array expanded to rows).
#[derive(Clone, Debug)]
pub(crate) struct FromSource {
    /// Everything after `FROM `, alias included.
    clause: Fragment,
    alias: String,
}

/// A rendered statement: numbered SQL, its arguments and a description of
/// the rows it selects.
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub sql: String,
    pub args: Vec<Value>,
    pub selection: Selection,
}

impl Rendered {
    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
    }
}

/// Deferred construction error, surfaced by `generate_sql()`.
#[derive(Clone, Debug)]
enum BuildError {
    Identifier(String),
    /// `set_from_column` before any `update_from*`
    MissingFromSource(String),
    /// A builder call that has no meaning for the statement kind
    WrongMode { call: &'static str, mode: Mode },
}

impl From<BuildError> for StmtError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Identifier(ident) => StmtError::InvalidIdentifier(ident),
            BuildError::MissingFromSource(field) => StmtError::InvalidStatement(format!(
                "set_from_column({}) requires a FROM source",
                field
            )),
            BuildError::WrongMode { call, mode } => StmtError::InvalidStatement(format!(
                "{} is not supported on {}",
                call,
                mode.keyword()
            )),
        }
    }
}

/// Builder for a single statement. Create one per database operation.
#[derive(Clone, Debug)]
pub struct QueryBuilder {
    mode: Mode,
    table: String,
    alias: Option<String>,
    /// Insert columns or SELECT projection
    fields: Vec<String>,
    /// Insert rows, each aligned to `fields`
    rows: Vec<Vec<Value>>,
    /// UPDATE SET, or ON CONFLICT DO UPDATE SET for inserts
    assignments: Vec<Assignment>,
    joins: Vec<Join>,
    filter: FilterBracket,
    conflict: Option<Conflict>,
    from_source: Option<FromSource>,
    group_by: Option<String>,
    order_clauses: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    return_fields: Vec<String>,
    allow_delete_all: bool,
    build_error: Option<BuildError>,
}

impl QueryBuilder {
    fn new(mode: Mode, table: &str) -> Self {
        Self {
            mode,
            table: table.to_string(),
            alias: None,
            fields: Vec::new(),
            rows: Vec::new(),
            assignments: Vec::new(),
            joins: Vec::new(),
            filter: FilterBracket::and(),
            conflict: None,
            from_source: None,
            group_by: None,
            order_clauses: Vec::new(),
            limit: None,
            offset: None,
            return_fields: Vec::new(),
            allow_delete_all: false,
            build_error: None,
        }
    }

    /// Start an INSERT into `table`.
    pub fn insert_into(table: &str) -> Self {
        Self::new(Mode::Insert, table)
    }

    /// Start an UPDATE of `table`.
    pub fn update_table(table: &str) -> Self {
        Self::new(Mode::Update, table)
    }

    /// Start a SELECT from `table`.
    pub fn select_from(table: &str) -> Self {
        Self::new(Mode::Select, table)
    }

    /// Start a DELETE from `table`.
    ///
    /// Without a filter the statement renders `WHERE 1=0` unless
    /// [`QueryBuilder::allow_delete_all`] was called.
    pub fn delete_from(table: &str) -> Self {
        Self::new(Mode::Delete, table)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name the target table (`FROM banks AS b`).
    pub fn with_alias(&mut self, alias: &str) -> &mut Self {
        if !is_valid_ident(alias) {
            self.record_error(BuildError::Identifier(alias.to_string()));
        }
        self.alias = Some(alias.to_string());
        self
    }

    /// Qualify a column with the target table's alias (or name).
    pub fn col(&self, column: &str) -> String {
        format!(
            "{}.{}",
            self.alias.as_deref().unwrap_or(self.table.as_str()),
            column
        )
    }

    // ==================== WHERE ====================

    /// Add a WHERE condition (generic `?` markers), ANDed with the others.
    pub fn where_(&mut self, template: &str, args: Vec<Value>) -> &mut Self {
        self.filter.add_condition(template, args);
        self
    }

    /// Merge a bracket built elsewhere (e.g. another repository's filter).
    pub fn where_bracket(&mut self, bracket: FilterBracket) -> &mut Self {
        self.filter.add_bracket(bracket);
        self
    }

    /// WHERE column = value
    pub fn where_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.filter.eq(column, value);
        self
    }

    /// WHERE column = value, if value is Some
    pub fn where_eq_opt<V: Into<Value>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        self.filter.eq_opt(column, value);
        self
    }

    /// WHERE column IN (values...)
    pub fn where_in<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.filter.in_list(column, values);
        self
    }

    /// Direct access to the statement's filter for the less common helpers.
    pub fn filter_mut(&mut self) -> &mut FilterBracket {
        &mut self.filter
    }

    pub fn filter(&self) -> &FilterBracket {
        &self.filter
    }

    // ==================== Assignments ====================

    /// Add an assignment.
    ///
    /// `Some(value)` renders `field = $n` (or the expression for
    /// `Value::Raw`). `None` marks a computed assignment: `field` already holds
    /// the full `column = expression` text and is emitted unchanged.
    ///
    /// On an UPDATE this fills `SET`; on an INSERT after
    /// [`QueryBuilder::on_conflict`] it fills `ON CONFLICT ... DO UPDATE SET`.
    pub fn set_update(&mut self, field: &str, value: Option<Value>) -> &mut Self {
        self.require_mode("set_update", &[Mode::Insert, Mode::Update]);
        self.assignments.push(Assignment {
            field: field.to_string(),
            value,
        });
        self
    }

    /// Add an assignment only when a value was supplied.
    ///
    /// This is the partial-update helper: omitted fields stay untouched.
    pub fn set_update_opt<V: Into<Value>>(&mut self, field: &str, value: Option<V>) -> &mut Self {
        self.require_mode("set_update_opt", &[Mode::Insert, Mode::Update]);
        match value {
            Some(v) => self.set_update(field, Some(v.into())),
            None => self,
        }
    }

    /// True iff at least one assignment was added.
    pub fn is_updatable(&self) -> bool {
        !self.assignments.is_empty()
    }

    // ==================== RETURNING ====================

    /// Columns to return from INSERT/UPDATE/DELETE. `"*"` returns all columns.
    pub fn set_return_fields(&mut self, fields: &[&str]) -> &mut Self {
        self.require_mode(
            "set_return_fields",
            &[Mode::Insert, Mode::Update, Mode::Delete],
        );
        self.return_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    // ==================== DELETE ====================

    /// Allow a DELETE without filter to remove every row.
    pub fn allow_delete_all(&mut self, allow: bool) -> &mut Self {
        self.require_mode("allow_delete_all", &[Mode::Delete]);
        self.allow_delete_all = allow;
        self
    }

    // ==================== Rendering ====================

    /// Render the statement.
    ///
    /// Pure: calling it twice on an unmodified builder yields identical output.
    /// Errors only when the builder is in an invalid state (a rejected
    /// condition or alias, a call that does not fit the statement kind, an
    /// UPDATE without assignments, an INSERT without fields or rows).
    pub fn generate_sql(&self) -> StmtResult<Rendered> {
        let fragment = self.render_fragment()?;
        let (sql, args) = fragment.number();
        Ok(Rendered {
            sql,
            args,
            selection: self.selection(),
        })
    }

    /// Render with generic markers, for use as a sub-query in another builder.
    pub fn to_fragment(&self) -> StmtResult<Fragment> {
        self.render_fragment()
    }

    /// Debug helper: the SQL text only.
    pub fn to_sql(&self) -> StmtResult<String> {
        Ok(self.generate_sql()?.sql)
    }

    fn render_fragment(&self) -> StmtResult<Fragment> {
        self.validate()?;
        let mut out = Fragment::empty();
        match self.mode {
            Mode::Insert => self.render_insert(&mut out)?,
            Mode::Update => self.render_update(&mut out)?,
            Mode::Select => self.render_select(&mut out),
            Mode::Delete => self.render_delete(&mut out),
        }
        Ok(out)
    }

    fn validate(&self) -> StmtResult<()> {
        if let Some(err) = &self.build_error {
            return Err(err.clone().into());
        }
        self.filter.validate()?;
        if !self.joins.is_empty() && self.mode != Mode::Select {
            return Err(StmtError::InvalidStatement(
                "joins are only supported on SELECT".to_string(),
            ));
        }
        if self.from_source.is_some() && self.mode != Mode::Update {
            return Err(StmtError::InvalidStatement(
                "a FROM source is only supported on UPDATE".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        seen.insert(self.alias.as_deref().unwrap_or(self.table.as_str()));
        if let Some(from) = &self.from_source {
            if !seen.insert(from.alias.as_str()) {
                return Err(StmtError::DuplicateAlias(from.alias.clone()));
            }
        }
        for join in &self.joins {
            join.on_filter().validate()?;
            if let Some(alias) = join.alias() {
                if !seen.insert(alias) {
                    return Err(StmtError::DuplicateAlias(alias.to_string()));
                }
            }
        }
        Ok(())
    }

    fn selection(&self) -> Selection {
        match self.mode {
            Mode::Insert if self.conflict.is_none() || self.filter.is_empty() => {
                self.insert_selection()
            }
            _ => Selection::from_fragment(&self.filter.render_unwrapped()),
        }
    }

    fn push_target(&self, out: &mut Fragment) {
        out.push_sql(&self.table);
        if let Some(alias) = &self.alias {
            out.push_sql(" AS ");
            out.push_sql(alias);
        }
    }

    fn push_where(&self, out: &mut Fragment) {
        let filter = self.filter.render_unwrapped();
        if !filter.is_empty() {
            out.push_sql(" WHERE ");
            out.push_fragment(&filter);
        }
    }

    fn push_returning(&self, out: &mut Fragment) {
        if !self.return_fields.is_empty() {
            out.push_sql(" RETURNING ");
            out.push_sql(&self.return_fields.join(", "));
        }
    }

    /// Render `SET a = ?, b = ?` entries (without the keyword).
    fn push_assignments(&self, out: &mut Fragment) {
        for (i, assignment) in self.assignments.iter().enumerate() {
            if i > 0 {
                out.push_sql(", ");
            }
            out.push_sql(&assignment.field);
            if let Some(value) = &assignment.value {
                out.push_sql(" = ");
                out.push_value(value.clone());
            }
        }
    }

    fn render_delete(&self, out: &mut Fragment) {
        out.push_sql("DELETE FROM ");
        self.push_target(out);
        if self.filter.is_empty() && !self.allow_delete_all {
            out.push_sql(" WHERE 1=0");
        } else {
            self.push_where(out);
        }
        self.push_returning(out);
    }

    fn record_error(&mut self, err: BuildError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    /// Record a deferred error unless the statement kind is one of `allowed`.
    fn require_mode(&mut self, call: &'static str, allowed: &[Mode]) -> bool {
        if allowed.contains(&self.mode) {
            return true;
        }
        self.record_error(BuildError::WrongMode {
            call,
            mode: self.mode,
        });
        false
    }
}

/// Create a SELECT builder for `table`.
pub fn select(table: &str) -> QueryBuilder {
    QueryBuilder::select_from(table)
}

/// Create an INSERT builder for `table`.
pub fn insert(table: &str) -> QueryBuilder {
    QueryBuilder::insert_into(table)
}

/// Create an UPDATE builder for `table`.
pub fn update(table: &str) -> QueryBuilder {
    QueryBuilder::update_table(table)
}

/// Create a DELETE builder for `table`.
pub fn delete(table: &str) -> QueryBuilder {
    QueryBuilder::delete_from(table)
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_valid_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
