//! Filter brackets: composable AND/OR predicate groups.
//!
//! A [`FilterBracket`] is independent of any statement. It collects condition
//! templates (generic `?` markers) and nested brackets, and renders to a
//! [`Fragment`] on demand. The same machinery backs WHERE clauses, JOIN ... ON
//! restrictions, and filters one repository hands to another so a listing can
//! say "the related entity also matches" without knowing its columns.
//!
//! Rendering rules:
//! - no conditions: empty fragment, no arguments (no restriction, not `FALSE`)
//! - one condition: its text, unparenthesized
//! - several: parenthesized and joined by the combinator
//!
//! Templates are inserted verbatim, so a template containing `OR` should be
//! expressed as a nested OR bracket instead.

use crate::error::{StmtError, StmtResult};
use crate::sequencer::Fragment;
use crate::value::Value;
use std::fmt;

/// Boolean operator applied between a bracket's conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    fn separator(self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => f.write_str("AND"),
            Combinator::Or => f.write_str("OR"),
        }
    }
}

#[derive(Clone, Debug)]
enum Condition {
    Fragment(Fragment),
    Bracket(FilterBracket),
}

impl Condition {
    fn render(&self) -> Fragment {
        match self {
            Condition::Fragment(f) => f.clone(),
            Condition::Bracket(b) => b.render(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Condition::Fragment(f) => f.is_empty(),
            Condition::Bracket(b) => b.is_empty(),
        }
    }
}

/// A group of conditions joined by one [`Combinator`].
#[derive(Clone, Debug, Default)]
pub struct FilterBracket {
    combinator: Combinator,
    conditions: Vec<Condition>,
    /// First rejected condition, reported by `validate()`
    build_error: Option<String>,
}

impl FilterBracket {
    /// Create an empty bracket.
    pub fn new(combinator: Combinator) -> Self {
        Self {
            combinator,
            conditions: Vec::new(),
            build_error: None,
        }
    }

    /// Create an empty AND bracket.
    pub fn and() -> Self {
        Self::new(Combinator::And)
    }

    /// Create an empty OR bracket.
    pub fn or() -> Self {
        Self::new(Combinator::Or)
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// Number of conditions that render to something.
    pub fn len(&self) -> usize {
        self.conditions.iter().filter(|c| !c.is_empty()).count()
    }

    /// True when rendering would produce no restriction.
    pub fn is_empty(&self) -> bool {
        self.conditions.iter().all(Condition::is_empty)
    }

    // ==================== Adding conditions ====================

    /// Add a condition template with generic `?` markers.
    ///
    /// A template whose marker count differs from `args.len()` is dropped and
    /// recorded; [`FilterBracket::validate`] reports it.
    pub fn add_condition(&mut self, template: &str, args: Vec<Value>) -> &mut Self {
        match Fragment::new(template, args) {
            Ok(fragment) => self.add_fragment(fragment),
            Err(err) => {
                self.record_error(err.to_string());
                self
            }
        }
    }

    /// Add an already-built fragment (e.g. a rendered sub-query predicate).
    pub fn add_fragment(&mut self, fragment: Fragment) -> &mut Self {
        if !fragment.is_empty() {
            self.conditions.push(Condition::Fragment(fragment));
        }
        self
    }

    /// Nest another bracket as a single condition.
    pub fn add_bracket(&mut self, child: FilterBracket) -> &mut Self {
        if let Some(err) = &child.build_error {
            let err = err.clone();
            self.record_error(err);
        }
        self.conditions.push(Condition::Bracket(child));
        self
    }

    /// Add a raw SQL condition without arguments.
    pub fn raw(&mut self, sql: &str) -> &mut Self {
        self.add_fragment(Fragment::raw(sql))
    }

    fn compare(&mut self, column: &str, op: &str, value: Value) -> &mut Self {
        self.add_condition(&format!("{} {} ?", column, op), vec![value])
    }

    /// column = value
    pub fn eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.compare(column, "=", value.into())
    }

    /// column != value
    pub fn ne(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.compare(column, "!=", value.into())
    }

    /// column > value
    pub fn gt(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.compare(column, ">", value.into())
    }

    /// column >= value
    pub fn gte(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.compare(column, ">=", value.into())
    }

    /// column < value
    pub fn lt(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.compare(column, "<", value.into())
    }

    /// column <= value
    pub fn lte(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.compare(column, "<=", value.into())
    }

    /// column LIKE pattern
    pub fn like(&mut self, column: &str, pattern: impl Into<Value>) -> &mut Self {
        self.compare(column, "LIKE", pattern.into())
    }

    /// column ILIKE pattern
    pub fn ilike(&mut self, column: &str, pattern: impl Into<Value>) -> &mut Self {
        self.compare(column, "ILIKE", pattern.into())
    }

    /// column IS NULL
    pub fn is_null(&mut self, column: &str) -> &mut Self {
        self.add_fragment(Fragment::raw(format!("{} IS NULL", column)))
    }

    /// column IS NOT NULL
    pub fn is_not_null(&mut self, column: &str) -> &mut Self {
        self.add_fragment(Fragment::raw(format!("{} IS NOT NULL", column)))
    }

    /// column IN (values...). An empty list matches nothing.
    pub fn in_list<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.list(column, "IN", "1=0", values)
    }

    /// column NOT IN (values...). An empty list matches everything.
    pub fn not_in<V: Into<Value>>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.list(column, "NOT IN", "1=1", values)
    }

    fn list<V: Into<Value>>(
        &mut self,
        column: &str,
        op: &str,
        when_empty: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self.raw(when_empty);
        }
        let markers = vec!["?"; values.len()].join(", ");
        self.add_condition(&format!("{} {} ({})", column, op, markers), values)
    }

    /// column IN (sub-query). The sub-query's arguments stay with its text.
    pub fn in_subquery(&mut self, column: &str, subquery: Fragment) -> &mut Self {
        let mut cond = Fragment::raw(format!("{} IN ", column));
        cond.push_fragment(&subquery.parenthesized());
        self.add_fragment(cond)
    }

    /// Match `pattern` against any of `columns` (nested OR bracket).
    pub fn multi_ilike(&mut self, columns: &[&str], pattern: impl Into<Value>) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let pattern = pattern.into();
        let mut any = FilterBracket::or();
        for column in columns {
            any.ilike(column, pattern.clone());
        }
        self.add_bracket(any)
    }

    // ==================== Optional value helpers ====================

    /// column = value, if value is Some
    pub fn eq_opt<V: Into<Value>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// column ILIKE pattern, if pattern is Some
    pub fn ilike_opt<V: Into<Value>>(&mut self, column: &str, pattern: Option<V>) -> &mut Self {
        match pattern {
            Some(p) => self.ilike(column, p),
            None => self,
        }
    }

    /// column >= value, if value is Some
    pub fn gte_opt<V: Into<Value>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        match value {
            Some(v) => self.gte(column, v),
            None => self,
        }
    }

    /// column <= value, if value is Some
    pub fn lte_opt<V: Into<Value>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        match value {
            Some(v) => self.lte(column, v),
            None => self,
        }
    }

    /// column IN (values...), if values is Some and non-empty
    pub fn in_opt<V: Into<Value>>(&mut self, column: &str, values: Option<Vec<V>>) -> &mut Self {
        match values {
            Some(v) if !v.is_empty() => self.in_list(column, v),
            _ => self,
        }
    }

    // ==================== Rendering ====================

    /// Render to a fragment with generic markers.
    pub fn render(&self) -> Fragment {
        let mut parts = self.rendered_parts();
        match parts.len() {
            0 => Fragment::empty(),
            1 => parts.remove(0),
            _ => Fragment::join(parts, self.combinator.separator()).parenthesized(),
        }
    }

    /// Render without the outer parentheses, for use directly after
    /// `WHERE` or `ON`.
    pub fn render_unwrapped(&self) -> Fragment {
        Fragment::join(self.rendered_parts(), self.combinator.separator())
    }

    fn rendered_parts(&self) -> Vec<Fragment> {
        self.conditions
            .iter()
            .map(Condition::render)
            .filter(|f| !f.is_empty())
            .collect()
    }

    /// Report the first condition rejected while building.
    pub fn validate(&self) -> StmtResult<()> {
        match &self.build_error {
            Some(err) => Err(StmtError::InvalidCondition(err.clone())),
            None => Ok(()),
        }
    }

    fn record_error(&mut self, err: String) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }
}
