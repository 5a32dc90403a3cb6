//! Human-readable summary of which predicate selected a statement's rows.
//!
//! Only for error text and logs. It is never parsed back into SQL.

use crate::sequencer::{Fragment, MARKER};
use std::fmt;

/// Selection descriptor, e.g. `id = 42 AND name = "acme"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    text: String,
}

impl Selection {
    /// Describe a filter fragment by substituting each marker with the
    /// escaped display form of its argument.
    pub fn from_fragment(fragment: &Fragment) -> Self {
        let mut text = String::with_capacity(fragment.sql().len());
        let mut args = fragment.args().iter();
        let mut chars = fragment.sql().chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != MARKER {
                text.push(ch);
                continue;
            }
            if chars.peek() == Some(&MARKER) {
                chars.next();
                text.push(MARKER);
                continue;
            }
            match args.next() {
                Some(value) => text.push_str(&value.to_string()),
                None => text.push(MARKER),
            }
        }
        Self { text }
    }

    /// Whether the statement had no restriction at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            f.write_str("<all rows>")
        } else {
            f.write_str(&self.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn substitutes_values() {
        let frag = Fragment::new(
            "id = ? AND name = ?",
            vec![Value::from(42), Value::from("acme")],
        )
        .unwrap();
        assert_eq!(
            Selection::from_fragment(&frag).to_string(),
            r#"id = 42 AND name = "acme""#
        );
    }

    #[test]
    fn quotes_hostile_text() {
        let frag = Fragment::new("name = ?", vec![Value::from("\" OR 1=1 --")]).unwrap();
        assert_eq!(
            Selection::from_fragment(&frag).as_str(),
            r#"name = "\" OR 1=1 --""#
        );
    }

    #[test]
    fn empty_selection_reads_all_rows() {
        let sel = Selection::from_fragment(&Fragment::empty());
        assert!(sel.is_empty());
        assert_eq!(sel.to_string(), "<all rows>");
    }
}
