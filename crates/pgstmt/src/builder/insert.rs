//! INSERT rendering: multi-row VALUES, ON CONFLICT, RETURNING.

use super::{BuildError, Conflict, ConflictAction, Mode, QueryBuilder};
use crate::descriptor::Selection;
use crate::error::{StmtError, StmtResult};
use crate::sequencer::Fragment;
use crate::value::Value;

impl QueryBuilder {
    /// Declare one insert column. The column list is append-only.
    pub fn set_insert_field(&mut self, name: &str) -> &mut Self {
        if !self.require_mode("set_insert_field", &[Mode::Insert]) {
            return self;
        }
        self.fields.push(name.to_string());
        self
    }

    /// Declare several insert columns.
    pub fn set_insert_fields(&mut self, names: &[&str]) -> &mut Self {
        if !self.require_mode("set_insert_fields", &[Mode::Insert]) {
            return self;
        }
        self.fields.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Append one row. It must hold exactly one value per declared column,
    /// in column order.
    pub fn set_insert_values(&mut self, row: Vec<Value>) -> StmtResult<&mut Self> {
        if !self.require_mode("set_insert_values", &[Mode::Insert]) {
            return Err(BuildError::WrongMode {
                call: "set_insert_values",
                mode: self.mode,
            }
            .into());
        }
        if row.len() != self.fields.len() {
            return Err(StmtError::ArityMismatch {
                expected: self.fields.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(self)
    }

    /// Append several rows (bulk insert). Stops at the first mismatched row;
    /// rows before it are kept.
    pub fn set_insert_rows(
        &mut self,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) -> StmtResult<&mut Self> {
        for row in rows {
            self.set_insert_values(row)?;
        }
        Ok(self)
    }

    /// Number of value rows added so far.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Turn the insert into an upsert: on a collision on `fields`, apply the
    /// assignments added with [`QueryBuilder::set_update`] instead of failing.
    pub fn on_conflict(&mut self, fields: &[&str]) -> &mut Self {
        self.require_mode("on_conflict", &[Mode::Insert]);
        self.conflict = Some(Conflict {
            target: fields.iter().map(|f| f.to_string()).collect(),
            action: ConflictAction::DoUpdate,
        });
        self
    }

    /// On a collision on `fields`, skip the row.
    pub fn on_conflict_do_nothing(&mut self, fields: &[&str]) -> &mut Self {
        self.require_mode("on_conflict_do_nothing", &[Mode::Insert]);
        self.conflict = Some(Conflict {
            target: fields.iter().map(|f| f.to_string()).collect(),
            action: ConflictAction::DoNothing,
        });
        self
    }

    /// Upsert assignment taking the proposed row's value: `field = EXCLUDED.field`.
    pub fn set_excluded(&mut self, field: &str) -> &mut Self {
        self.require_mode("set_excluded", &[Mode::Insert]);
        self.set_update(&format!("{} = EXCLUDED.{}", field, field), None)
    }

    pub(super) fn render_insert(&self, out: &mut Fragment) -> StmtResult<()> {
        if self.fields.is_empty() {
            return Err(StmtError::NoInsertFields);
        }
        if self.rows.is_empty() {
            return Err(StmtError::NoInsertValues);
        }
        // Fields may have been declared after some rows were added.
        if let Some(row) = self.rows.iter().find(|r| r.len() != self.fields.len()) {
            return Err(StmtError::ArityMismatch {
                expected: self.fields.len(),
                got: row.len(),
            });
        }

        out.push_sql("INSERT INTO ");
        self.push_target(out);
        out.push_sql(" (");
        out.push_sql(&self.fields.join(", "));
        out.push_sql(") VALUES ");

        // Row-major: markers number straight through all rows.
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                out.push_sql(", ");
            }
            out.push_sql("(");
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    out.push_sql(", ");
                }
                out.push_value(value.clone());
            }
            out.push_sql(")");
        }

        match &self.conflict {
            Some(conflict) => {
                out.push_sql(" ON CONFLICT");
                if !conflict.target.is_empty() {
                    out.push_sql(" (");
                    out.push_sql(&conflict.target.join(", "));
                    out.push_sql(")");
                }
                match conflict.action {
                    ConflictAction::DoNothing => {
                        out.push_sql(" DO NOTHING");
                    }
                    ConflictAction::DoUpdate => {
                        if self.assignments.is_empty() {
                            return Err(StmtError::NothingToUpdate);
                        }
                        out.push_sql(" DO UPDATE SET ");
                        self.push_assignments(out);
                        self.push_where(out);
                    }
                }
            }
            None => {
                if !self.assignments.is_empty() {
                    return Err(StmtError::InvalidStatement(
                        "INSERT assignments require on_conflict".to_string(),
                    ));
                }
                if !self.filter.is_empty() {
                    return Err(StmtError::InvalidStatement(
                        "INSERT filter requires on_conflict".to_string(),
                    ));
                }
            }
        }

        self.push_returning(out);
        Ok(())
    }

    /// Describe an insert by its first row, keyed on the conflict target
    /// when there is one (that is what a duplicate-key error is about).
    pub(super) fn insert_selection(&self) -> Selection {
        let Some(row) = self.rows.first() else {
            return Selection::default();
        };
        let keys: Vec<&str> = match &self.conflict {
            Some(conflict) if !conflict.target.is_empty() => {
                conflict.target.iter().map(String::as_str).collect()
            }
            _ => self.fields.iter().map(String::as_str).collect(),
        };

        let mut described = Fragment::empty();
        for (field, value) in self.fields.iter().zip(row) {
            if !keys.contains(&field.as_str()) {
                continue;
            }
            if !described.is_empty() {
                described.push_sql(" AND ");
            }
            described.push_sql(field);
            described.push_sql(" = ");
            described.push_value(value.clone());
        }
        Selection::from_fragment(&described)
    }
}
