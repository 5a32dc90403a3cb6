//! JOIN clauses with first-class aliases.
//!
//! Joining the same physical table more than once (three contact slots on one
//! bank row, say) only needs distinct aliases. Column references are produced
//! from the join itself via [`Join::col`], so no text substitution is involved.

use crate::bracket::FilterBracket;
use crate::sequencer::Fragment;
use crate::value::Value;

/// JOIN flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

#[derive(Clone, Debug)]
enum JoinSource {
    Table(String),
    /// Sub-query; its arguments splice in where its text appears.
    Subquery(Fragment),
    /// Caller-written clause, emitted as is.
    Raw(String),
}

/// One JOIN clause.
#[derive(Clone, Debug)]
pub struct Join {
    kind: JoinKind,
    source: JoinSource,
    alias: Option<String>,
    on: FilterBracket,
}

impl Join {
    fn new(kind: JoinKind, source: JoinSource, alias: Option<String>) -> Self {
        Self {
            kind,
            source,
            alias,
            on: FilterBracket::and(),
        }
    }

    /// `INNER JOIN table AS alias`
    pub fn inner(table: &str, alias: &str) -> Self {
        Self::new(
            JoinKind::Inner,
            JoinSource::Table(table.to_string()),
            Some(alias.to_string()),
        )
    }

    /// `LEFT JOIN table AS alias`
    pub fn left(table: &str, alias: &str) -> Self {
        Self::new(
            JoinKind::Left,
            JoinSource::Table(table.to_string()),
            Some(alias.to_string()),
        )
    }

    /// Join a sub-query under `alias`.
    pub fn subquery(kind: JoinKind, subquery: Fragment, alias: &str) -> Self {
        Self::new(kind, JoinSource::Subquery(subquery), Some(alias.to_string()))
    }

    /// A complete join clause written by the caller (`"LEFT JOIN x ON ..."`).
    pub fn raw(clause: &str) -> Self {
        Self::new(JoinKind::Inner, JoinSource::Raw(clause.to_string()), None)
    }

    /// Add an ON condition template (generic `?` markers).
    pub fn on(mut self, template: &str, args: Vec<Value>) -> Self {
        self.on.add_condition(template, args);
        self
    }

    /// Add `alias.column = other` as an ON condition, where `other` is a
    /// column reference (not a bound value).
    pub fn on_col(self, column: &str, other: &str) -> Self {
        let cond = format!("{} = {}", self.col(column), other);
        self.on_raw(&cond)
    }

    /// Add a raw ON condition.
    pub fn on_raw(mut self, sql: &str) -> Self {
        self.on.raw(sql);
        self
    }

    /// Merge a prebuilt bracket into the ON clause.
    pub fn on_bracket(mut self, bracket: FilterBracket) -> Self {
        self.on.add_bracket(bracket);
        self
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// The name this join is referenced by: its alias, or the table name.
    pub fn alias(&self) -> Option<&str> {
        match (&self.alias, &self.source) {
            (Some(alias), _) => Some(alias.as_str()),
            (None, JoinSource::Table(table)) => Some(table.as_str()),
            _ => None,
        }
    }

    /// Qualify a column with this join's alias.
    pub fn col(&self, column: &str) -> String {
        match self.alias() {
            Some(alias) => format!("{}.{}", alias, column),
            None => column.to_string(),
        }
    }

    /// Qualified projection of `columns`, each exposed as `<alias>_<column>`
    /// so repeated joins of one table yield distinct result names.
    pub fn select_cols(&self, columns: &[&str]) -> Vec<String> {
        columns
            .iter()
            .map(|c| match self.alias() {
                Some(alias) => format!("{}.{} AS {}_{}", alias, c, alias, c),
                None => c.to_string(),
            })
            .collect()
    }

    pub(crate) fn on_filter(&self) -> &FilterBracket {
        &self.on
    }

    pub(crate) fn render(&self) -> Fragment {
        let mut out = Fragment::empty();
        match &self.source {
            JoinSource::Raw(clause) => {
                out.push_sql(clause);
                return out;
            }
            JoinSource::Table(table) => {
                out.push_sql(self.kind.keyword());
                out.push_sql(" ");
                out.push_sql(table);
            }
            JoinSource::Subquery(sub) => {
                out.push_sql(self.kind.keyword());
                out.push_sql(" (");
                out.push_fragment(sub);
                out.push_sql(")");
            }
        }
        if let Some(alias) = &self.alias {
            out.push_sql(" AS ");
            out.push_sql(alias);
        }
        let on = self.on.render_unwrapped();
        if on.is_empty() {
            // Postgres requires a join condition for INNER/LEFT JOIN.
            out.push_sql(" ON TRUE");
        } else {
            out.push_sql(" ON ");
            out.push_fragment(&on);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_aliased_table() {
        let j = Join::left("contacts", "c1")
            .on_col("id", "banks.primary_contact_id")
            .on("c1.deleted = ?", vec![false.into()]);
        let f = j.render();
        assert_eq!(
            f.sql(),
            "LEFT JOIN contacts AS c1 ON c1.id = banks.primary_contact_id AND c1.deleted = ?"
        );
        assert_eq!(f.args(), &[Value::Bool(false)]);
    }

    #[test]
    fn select_cols_are_prefixed_by_alias() {
        let j = Join::left("contacts", "c2");
        assert_eq!(
            j.select_cols(&["name", "email"]),
            vec!["c2.name AS c2_name", "c2.email AS c2_email"]
        );
        assert_eq!(j.col("phone"), "c2.phone");
    }

    #[test]
    fn raw_join_passes_through() {
        let j = Join::raw("LEFT JOIN countries ON countries.id = addresses.country_id");
        assert_eq!(j.alias(), None);
        assert_eq!(
            j.render().sql(),
            "LEFT JOIN countries ON countries.id = addresses.country_id"
        );
    }

    #[test]
    fn subquery_keeps_its_args() {
        let sub = Fragment::new(
            "SELECT bank_id, COUNT(*) AS n FROM branches WHERE city = ? GROUP BY bank_id",
            vec!["Utrecht".into()],
        )
        .unwrap();
        let j = Join::subquery(JoinKind::Inner, sub, "bc").on_col("bank_id", "banks.id");
        let f = j.render();
        assert!(f.sql().starts_with("INNER JOIN (SELECT bank_id"));
        assert!(f.sql().ends_with(") AS bc ON bc.bank_id = banks.id"));
        assert_eq!(f.args().len(), 1);
    }
}
