//! Guards for SQL that has to interpolate identifiers and literals.
//!
//! Postgres cannot bind role or database names as parameters, so DDL/DCL has to be
//! built as text. The only way to get text into such a statement is through the
//! newtypes below: [`QuotedIdentifier`] is produced by [`quote_identifier`] after the
//! identifier grammar check, and [`QuotedLiteral`] by [`quote_literal`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Postgres truncates identifiers longer than `NAMEDATALEN - 1` bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafeIdentifierError {
    #[error("{label} must not be empty")]
    Empty { label: String },
    #[error("{label} is {len} characters long, the limit is 63")]
    TooLong { label: String, len: usize },
    #[error("{label} {value:?} must match ^[A-Za-z_][A-Za-z0-9_]*$")]
    InvalidCharacters { label: String, value: String },
}

/// Fails unless `value` is a plain ASCII identifier of at most 63 characters.
pub fn assert_safe_identifier(value: &str, label: &str) -> Result<(), UnsafeIdentifierError> {
    if value.is_empty() {
        return Err(UnsafeIdentifierError::Empty {
            label: label.to_string(),
        });
    }
    if !IDENTIFIER_RE.is_match(value) {
        return Err(UnsafeIdentifierError::InvalidCharacters {
            label: label.to_string(),
            value: value.to_string(),
        });
    }
    // The grammar is ASCII-only, so byte length equals character count here.
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(UnsafeIdentifierError::TooLong {
            label: label.to_string(),
            len: value.len(),
        });
    }
    Ok(())
}

/// A validated identifier wrapped in double quotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuotedIdentifier {
    raw: String,
    quoted: String,
}

impl QuotedIdentifier {
    /// The identifier as it appears in the catalog.
    pub fn name(&self) -> &str {
        &self.raw
    }

    pub fn as_sql(&self) -> &str {
        &self.quoted
    }
}

impl fmt::Display for QuotedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted)
    }
}

pub fn quote_identifier(
    value: &str,
    label: &str,
) -> Result<QuotedIdentifier, UnsafeIdentifierError> {
    assert_safe_identifier(value, label)?;
    Ok(QuotedIdentifier {
        raw: value.to_string(),
        quoted: format!("\"{value}\""),
    })
}

/// A string literal with its single quotes doubled.
///
/// Only for positions where the driver cannot bind a parameter, such as the
/// password in `ALTER ROLE ... PASSWORD`. `Debug` never prints the content.
#[derive(Clone, PartialEq, Eq)]
pub struct QuotedLiteral(String);

impl QuotedLiteral {
    pub fn as_sql(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QuotedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QuotedLiteral(<redacted>)")
    }
}

impl fmt::Display for QuotedLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn quote_literal(value: &str) -> QuotedLiteral {
    QuotedLiteral(format!("'{}'", value.replace('\'', "''")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unquote_literal(quoted: &str) -> String {
        quoted[1..quoted.len() - 1].replace("''", "'")
    }

    #[test]
    fn test_accepts_plain_identifiers() {
        for value in ["medusa", "_tenant", "App_Role_2", "a", "_"] {
            assert!(assert_safe_identifier(value, "role").is_ok(), "{value}");
        }
    }

    #[test]
    fn test_rejects_injection_shaped_identifiers() {
        for value in [
            "",
            "1role",
            "has space",
            "tab\there",
            "quote\"d",
            "single'q",
            "semi;colon",
            "medusa\"; DROP ROLE postgres; --",
            "dash-ed",
            "ünicode",
        ] {
            assert!(assert_safe_identifier(value, "role").is_err(), "{value:?}");
        }
    }

    #[test]
    fn test_identifier_length_boundary() {
        let max = "a".repeat(MAX_IDENTIFIER_LEN);
        assert!(assert_safe_identifier(&max, "role").is_ok());

        let over = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert_eq!(
            assert_safe_identifier(&over, "role"),
            Err(UnsafeIdentifierError::TooLong {
                label: "role".to_string(),
                len: 64
            })
        );
    }

    #[test]
    fn test_error_names_the_label() {
        let err = assert_safe_identifier("bad name", "BOOTSTRAP_TEMPLATE_DB").unwrap_err();
        assert!(err.to_string().starts_with("BOOTSTRAP_TEMPLATE_DB"));
    }

    #[test]
    fn test_quote_identifier() {
        let quoted = quote_identifier("template_medusa", "template").unwrap();
        assert_eq!(quoted.as_sql(), "\"template_medusa\"");
        assert_eq!(quoted.name(), "template_medusa");
        assert!(quote_identifier("x\"y", "template").is_err());
    }

    #[test]
    fn test_quote_literal_doubles_quotes() {
        assert_eq!(quote_literal("O'Brien").as_sql(), "'O''Brien'");
        assert_eq!(quote_literal("").as_sql(), "''");
        assert_eq!(quote_literal("''").as_sql(), "''''''");
    }

    #[test]
    fn test_quote_literal_unquotes_to_original() {
        for value in ["plain", "O'Brien", "'leading", "trailing'", "a''b", "'; DROP ROLE x; --"] {
            let quoted = quote_literal(value);
            assert_eq!(unquote_literal(quoted.as_sql()), value);
        }
    }

    #[test]
    fn test_quoted_literal_debug_is_redacted() {
        let quoted = quote_literal("hunter2");
        assert!(!format!("{quoted:?}").contains("hunter2"));
    }
}
