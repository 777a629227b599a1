//! Typed values returned by the read-only query engine.

use std::collections::HashMap;

/// A single dynamically-typed SQLite value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Null,
}

/// One result row: column name mapped to its value.
pub type Row = HashMap<String, SqlValue>;

impl SqlValue {
    /// Text content, if this value is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content. Real values are truncated; text is not coerced.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Real(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Floating-point content, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Real(f) => Some(*f),
            SqlValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Blob content, if this value is a blob.
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// True when the value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// Fetch a column from a row as text, treating NULL and absence alike.
pub fn row_text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(|v| v.as_str()).map(str::to_string)
}

/// Fetch a column from a row as an integer.
pub fn row_i64(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(|v| v.as_i64())
}

/// Fetch a column from a row as a blob.
pub fn row_blob(row: &Row, column: &str) -> Option<Vec<u8>> {
    row.get(column).and_then(|v| v.as_blob()).map(<[u8]>::to_vec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(SqlValue::Integer(7).as_i64(), Some(7));
        assert_eq!(SqlValue::Real(1.5).as_f64(), Some(1.5));
        assert_eq!(SqlValue::Real(1.9).as_i64(), Some(1));
        assert_eq!(SqlValue::Text("hi".into()).as_str(), Some("hi"));
        assert_eq!(SqlValue::Text("7".into()).as_i64(), None);
        assert!(SqlValue::Null.is_null());
    }

    #[test]
    fn test_row_helpers() {
        let mut row = Row::new();
        row.insert("guid".into(), SqlValue::Text("ABC".into()));
        row.insert("date".into(), SqlValue::Integer(42));
        row.insert("body".into(), SqlValue::Null);

        assert_eq!(row_text(&row, "guid"), Some("ABC".into()));
        assert_eq!(row_i64(&row, "date"), Some(42));
        assert_eq!(row_text(&row, "body"), None);
        assert_eq!(row_text(&row, "absent"), None);
    }
}
