//! SELECT rendering: projection, joins, ordering and paging.

use super::join::{Join, JoinKind};
use super::{BuildError, Mode, QueryBuilder, is_valid_ident};
use crate::bracket::FilterBracket;
use crate::sequencer::Fragment;

impl QueryBuilder {
    /// Append columns to the projection. An empty projection renders `*`.
    ///
    /// Accepts plain names as well as the output of [`Join::select_cols`].
    pub fn select<S: AsRef<str>>(&mut self, fields: &[S]) -> &mut Self {
        if !self.require_mode("select", &[Mode::Select]) {
            return self;
        }
        self.fields
            .extend(fields.iter().map(|f| f.as_ref().to_string()));
        self
    }

    /// Append columns qualified with `alias` (`alias.field`).
    pub fn select_as(&mut self, alias: &str, fields: &[&str]) -> &mut Self {
        if !self.require_mode("select_as", &[Mode::Select]) {
            return self;
        }
        self.fields
            .extend(fields.iter().map(|f| format!("{}.{}", alias, f)));
        self
    }

    /// Add a join. Its alias must be a plain identifier and unique within
    /// the statement.
    pub fn join(&mut self, join: Join) -> &mut Self {
        if let Some(alias) = join.alias() {
            if !is_valid_ident(alias) {
                self.record_error(BuildError::Identifier(alias.to_string()));
            }
        }
        self.joins.push(join);
        self
    }

    /// Add a caller-written join clause, emitted as is.
    pub fn join_raw(&mut self, clause: &str) -> &mut Self {
        self.join(Join::raw(clause))
    }

    /// Join a sub-query (for example another builder's
    /// [`QueryBuilder::to_fragment`]) under `alias`. Its arguments are
    /// numbered where its text lands.
    pub fn join_fragment(
        &mut self,
        kind: JoinKind,
        subquery: Fragment,
        alias: &str,
        on: FilterBracket,
    ) -> &mut Self {
        self.join(Join::subquery(kind, subquery, alias).on_bracket(on))
    }

    pub fn order_by(&mut self, clause: &str) -> &mut Self {
        self.require_mode("order_by", &[Mode::Select]);
        self.order_clauses.push(clause.to_string());
        self
    }

    pub fn group_by(&mut self, clause: &str) -> &mut Self {
        self.require_mode("group_by", &[Mode::Select]);
        self.group_by = Some(clause.to_string());
        self
    }

    /// Negative limits are clamped to 0.
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.require_mode("limit", &[Mode::Select]);
        self.limit = Some(limit.max(0));
        self
    }

    /// Negative offsets are clamped to 0.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.require_mode("offset", &[Mode::Select]);
        self.offset = Some(offset.max(0));
        self
    }

    /// Pagination helper.
    ///
    /// `page` is 1-based (clamped to >= 1).
    /// `per_page` is clamped to >= 1.
    /// The offset saturates at `i64::MAX` for absurd page numbers.
    pub fn paginate(&mut self, page: i64, per_page: i64) -> &mut Self {
        let p = page.max(1);
        let size = per_page.max(1);
        self.limit(size).offset((p - 1).saturating_mul(size))
    }

    pub(super) fn render_select(&self, out: &mut Fragment) {
        out.push_sql("SELECT ");
        if self.fields.is_empty() {
            out.push_sql("*");
        } else {
            out.push_sql(&self.fields.join(", "));
        }
        out.push_sql(" FROM ");
        self.push_target(out);

        for join in &self.joins {
            out.push_sql(" ");
            out.push_fragment(&join.render());
        }

        self.push_where(out);

        if let Some(group) = &self.group_by {
            out.push_sql(" GROUP BY ");
            out.push_sql(group);
        }
        if !self.order_clauses.is_empty() {
            out.push_sql(" ORDER BY ");
            out.push_sql(&self.order_clauses.join(", "));
        }
        if let Some(limit) = self.limit {
            out.push_sql(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            out.push_sql(&format!(" OFFSET {}", offset));
        }
    }
}
