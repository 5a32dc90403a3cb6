//! UPDATE rendering, including updates driven by a FROM source.

use super::{BuildError, FromSource, QueryBuilder, is_valid_ident};
use crate::error::{StmtError, StmtResult};
use crate::sequencer::Fragment;
use crate::value::Value;

impl QueryBuilder {
    /// Add a sub-query as the update's FROM source under `alias`.
    ///
    /// Its arguments land between the SET arguments and the WHERE arguments,
    /// which is where its text sits.
    pub fn update_from(&mut self, subquery: Fragment, alias: &str) -> &mut Self {
        let mut clause = Fragment::raw("(");
        clause.push_fragment(&subquery);
        clause.push_sql(") AS ");
        clause.push_sql(alias);
        self.set_from_source(clause, alias)
    }

    /// Expand a JSON array of objects into rows and use them as the FROM
    /// source: `FROM jsonb_to_recordset($n) AS alias(col type, ...)`.
    ///
    /// Pair it with [`QueryBuilder::set_from_column`] and a WHERE that
    /// correlates the target row with the source row:
    ///
    /// ```ignore
    /// let mut qb = QueryBuilder::update_table("user_preferences");
    /// qb.update_from_json_rows(payload, "src", &[("key", "text"), ("value", "text")])
    ///     .set_from_column("value")
    ///     .where_eq("user_id", user_id)
    ///     .where_("user_preferences.key = src.key", vec![]);
    /// ```
    pub fn update_from_json_rows(
        &mut self,
        payload: serde_json::Value,
        alias: &str,
        columns: &[(&str, &str)],
    ) -> &mut Self {
        if let Some((bad, _)) = columns.iter().find(|(name, _)| !is_valid_ident(name)) {
            self.record_error(BuildError::Identifier(bad.to_string()));
        }
        let defs: Vec<String> = columns
            .iter()
            .map(|(name, ty)| format!("{} {}", name, ty))
            .collect();

        let mut clause = Fragment::raw("jsonb_to_recordset(");
        clause.push_value(Value::Json(payload));
        clause.push_sql(") AS ");
        clause.push_sql(alias);
        clause.push_sql("(");
        clause.push_sql(&defs.join(", "));
        clause.push_sql(")");
        self.set_from_source(clause, alias)
    }

    /// `field = <from alias>.field`. Recorded as a computed assignment, so
    /// it must follow the `update_from*` call.
    pub fn set_from_column(&mut self, field: &str) -> &mut Self {
        let source = match &self.from_source {
            Some(from) => from.alias.clone(),
            None => {
                self.record_error(BuildError::MissingFromSource(field.to_string()));
                return self;
            }
        };
        self.set_update(&format!("{} = {}.{}", field, source, field), None)
    }

    fn set_from_source(&mut self, clause: Fragment, alias: &str) -> &mut Self {
        if !is_valid_ident(alias) {
            self.record_error(BuildError::Identifier(alias.to_string()));
        }
        self.from_source = Some(FromSource {
            clause,
            alias: alias.to_string(),
        });
        self
    }

    pub(super) fn render_update(&self, out: &mut Fragment) -> StmtResult<()> {
        if self.assignments.is_empty() {
            return Err(StmtError::NothingToUpdate);
        }

        out.push_sql("UPDATE ");
        self.push_target(out);
        out.push_sql(" SET ");
        self.push_assignments(out);

        if let Some(from) = &self.from_source {
            out.push_sql(" FROM ");
            out.push_fragment(&from.clause);
        }

        self.push_where(out);
        self.push_returning(out);
        Ok(())
    }
}
