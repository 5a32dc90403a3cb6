//! Placeholder numbering.
//!
//! Callers write conditions with generic `?` markers. [`ArgSequencer`] turns
//! them into Postgres `$1, $2, ...` placeholders while appending the matching
//! arguments, so the text and the argument list can never drift apart no
//! matter which clause contributed a value. Use `??` for a literal `?`
//! (e.g. the JSONB `?` operator).
//!
//! A [`Fragment`] is SQL that still uses generic markers, paired with its own
//! arguments. Rendered brackets and sub-statements travel as fragments and are
//! numbered only when the final statement is assembled, which is what keeps a
//! spliced sub-query's arguments at the position its text is inlined.

use crate::error::{StmtError, StmtResult};
use crate::value::Value;
use std::fmt::Write;

/// The generic placeholder marker.
pub const MARKER: char = '?';

/// Count the generic markers in a template (`??` is an escape, not a marker).
pub fn count_markers(template: &str) -> usize {
    let mut count = 0;
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == MARKER {
            if chars.peek() == Some(&MARKER) {
                chars.next();
            } else {
                count += 1;
            }
        }
    }
    count
}

/// SQL text with generic markers plus the arguments for those markers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment {
    sql: String,
    args: Vec<Value>,
}

impl Fragment {
    /// Create a fragment, checking that markers and arguments line up.
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> StmtResult<Self> {
        let sql = sql.into();
        let markers = count_markers(&sql);
        if markers != args.len() {
            return Err(StmtError::MarkerMismatch {
                template: sql,
                markers,
                args: args.len(),
            });
        }
        Ok(Self { sql, args })
    }

    /// A fragment without arguments. Any `?` in `sql` is kept literally.
    pub fn raw(sql: impl Into<String>) -> Self {
        let mut out = Self::empty();
        out.push_sql(&sql.into());
        out
    }

    /// The empty fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }

    /// Append literal SQL, escaping any `?` so it is not read as a marker.
    pub(crate) fn push_sql(&mut self, sql: &str) -> &mut Self {
        if sql.contains(MARKER) {
            self.sql.push_str(&sql.replace(MARKER, "??"));
        } else {
            self.sql.push_str(sql);
        }
        self
    }

    /// Append one marker bound to `value`.
    pub(crate) fn push_value(&mut self, value: Value) -> &mut Self {
        self.sql.push(MARKER);
        self.args.push(value);
        self
    }

    /// Append another fragment, markers and arguments included.
    pub(crate) fn push_fragment(&mut self, other: &Fragment) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.args.extend(other.args.iter().cloned());
        self
    }

    /// Wrap the fragment in parentheses (no-op when empty).
    pub fn parenthesized(self) -> Self {
        if self.sql.is_empty() {
            return self;
        }
        Self {
            sql: format!("({})", self.sql),
            args: self.args,
        }
    }

    /// Join fragments with `sep`, skipping empty ones.
    pub fn join(parts: impl IntoIterator<Item = Fragment>, sep: &str) -> Self {
        let mut out = Fragment::empty();
        for part in parts {
            if part.is_empty() {
                continue;
            }
            if !out.sql.is_empty() {
                out.sql.push_str(sep);
            }
            out.sql.push_str(&part.sql);
            out.args.extend(part.args);
        }
        out
    }

    /// Number the markers from `$1`, producing final SQL and arguments.
    pub fn number(&self) -> (String, Vec<Value>) {
        let mut seq = ArgSequencer::new();
        seq.append_fragment(self);
        seq.finish()
    }
}

/// Running SQL text and argument list with sequential placeholder numbering.
#[derive(Clone, Debug, Default)]
pub struct ArgSequencer {
    sql: String,
    args: Vec<Value>,
}

impl ArgSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal SQL. Markers are not interpreted.
    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a template, replacing each marker with the next placeholder.
    ///
    /// `Value::Raw` arguments are inlined in place of their marker and take
    /// no placeholder number. Nothing is appended on error.
    pub fn append(&mut self, template: &str, args: Vec<Value>) -> StmtResult<&mut Self> {
        let markers = count_markers(template);
        if markers != args.len() {
            return Err(StmtError::MarkerMismatch {
                template: template.to_string(),
                markers,
                args: args.len(),
            });
        }
        self.write_numbered(template, args.iter());
        Ok(self)
    }

    /// Splice a fragment at the current position.
    pub fn append_fragment(&mut self, fragment: &Fragment) -> &mut Self {
        // Fragments are checked on construction, so markers == args here.
        self.write_numbered(&fragment.sql, fragment.args.iter());
        self
    }

    /// Append a single value: a placeholder, or the expression for `Raw`.
    pub fn push_value(&mut self, value: &Value) -> &mut Self {
        match value {
            Value::Raw(expr) => self.sql.push_str(expr),
            other => {
                self.args.push(other.clone());
                let _ = write!(self.sql, "${}", self.args.len());
            }
        }
        self
    }

    /// Number of arguments bound so far.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Current SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }

    fn write_numbered<'a>(&mut self, template: &str, mut args: impl Iterator<Item = &'a Value>) {
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != MARKER {
                self.sql.push(ch);
                continue;
            }
            if chars.peek() == Some(&MARKER) {
                chars.next();
                self.sql.push(MARKER);
                continue;
            }
            match args.next() {
                Some(value) => {
                    self.push_value(value);
                }
                None => self.sql.push(MARKER),
            }
        }
    }
}
