//! Input hardening for everything that ends up inside generated SQL.
//!
//! Column names, table names, filter predicates and patterns all come from
//! check configuration, so they are validated before being spliced into the
//! aggregate queries the constraints run.

use crate::error::{DdlxError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_IDENTIFIER_LENGTH: usize = 128;
const MAX_PATTERN_LENGTH: usize = 1000;
const MAX_EXPRESSION_LENGTH: usize = 5000;

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
        .expect("Hard-coded regex pattern should be valid")
});

static DANGEROUS_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"(?i)\b(drop|create|alter|truncate|insert|update|delete|merge|grant|revoke|exec|execute|declare|cursor|commit|rollback|transaction|copy|attach|detach|information_schema)\b",
    )
    .expect("Hard-coded regex pattern should be valid")
});

static SUSPICIOUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"(?i)union\s+select", r"(?i)\(\s*select\s"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// SQL identifier, expression and pattern validation.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates and double-quotes a SQL identifier.
    ///
    /// Dotted names are quoted part by part, so `schema.table` becomes
    /// `"schema"."table"`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddlx_check::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("Price").unwrap(), "\"Price\"");
    /// assert!(SqlSecurity::escape_identifier("id; DROP TABLE users--").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;

        Ok(identifier
            .split('.')
            .map(|part| format!("\"{part}\""))
            .collect::<Vec<_>>()
            .join("."))
    }

    /// Validates a SQL identifier without escaping it.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(DdlxError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(DdlxError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(DdlxError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers, underscores, and dots"
            )));
        }

        Ok(())
    }

    /// Validates a regex pattern and escapes it for use in a SQL string literal.
    pub fn validate_regex_pattern(pattern: &str) -> Result<String> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(DdlxError::SecurityError(format!(
                "Regex pattern too long (max {MAX_PATTERN_LENGTH} characters)"
            )));
        }

        if pattern.contains('\0') {
            return Err(DdlxError::SecurityError(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }

        Regex::new(pattern)
            .map_err(|e| DdlxError::SecurityError(format!("Invalid regex pattern: {e}")))?;

        for dangerous in ["(.*)*", "(.*)+", "(.+)+", "(.+)*"] {
            if pattern.contains(dangerous) {
                return Err(DdlxError::SecurityError(
                    "Regex pattern might cause catastrophic backtracking".to_string(),
                ));
            }
        }

        Ok(Self::escape_string_literal(pattern))
    }

    /// Escapes a value for use inside a single-quoted SQL string literal.
    pub fn escape_string_literal(value: &str) -> String {
        value.replace('\'', "''")
    }

    /// Validates a boolean SQL expression such as a row filter.
    ///
    /// Rejects statement separators, comments, subqueries and keywords that
    /// could modify data or schema. Text inside quoted literals and quoted
    /// identifiers is not scanned, so `note = 'please update'` is accepted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddlx_check::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_sql_expression("note = 'please update'").is_ok());
    /// assert!(SqlSecurity::validate_sql_expression("1 = 1; UPDATE data SET a = 1").is_err());
    /// ```
    pub fn validate_sql_expression(expression: &str) -> Result<()> {
        if expression.trim().is_empty() {
            return Err(DdlxError::SecurityError(
                "SQL expression cannot be empty".to_string(),
            ));
        }

        if expression.len() > MAX_EXPRESSION_LENGTH {
            return Err(DdlxError::SecurityError(format!(
                "SQL expression too long (max {MAX_EXPRESSION_LENGTH} characters)"
            )));
        }

        if expression.contains('\0') {
            return Err(DdlxError::SecurityError(
                "SQL expression cannot contain null bytes".to_string(),
            ));
        }

        let code = Self::mask_quoted(expression)?;

        if code.contains(';') {
            return Err(DdlxError::SecurityError(
                "SQL expression cannot contain semicolons".to_string(),
            ));
        }

        if code.contains("--") || code.contains("/*") || code.contains("*/") {
            return Err(DdlxError::SecurityError(
                "SQL expression cannot contain comments".to_string(),
            ));
        }

        if let Some(keyword) = DANGEROUS_KEYWORDS.find(&code) {
            return Err(DdlxError::SecurityError(format!(
                "SQL expression contains dangerous keyword: '{}'",
                keyword.as_str().to_lowercase()
            )));
        }

        for pattern in SUSPICIOUS_PATTERNS.iter() {
            if pattern.is_match(&code) {
                return Err(DdlxError::SecurityError(format!(
                    "SQL expression contains suspicious pattern matching: {}",
                    pattern.as_str()
                )));
            }
        }

        Ok(())
    }

    /// Empties every `'...'` literal and `"..."` identifier, keeping the quotes.
    ///
    /// A doubled quote inside a quoted span is an escaped quote.
    fn mask_quoted(expression: &str) -> Result<String> {
        let mut masked = String::with_capacity(expression.len());
        let mut chars = expression.chars().peekable();
        let mut open: Option<char> = None;

        while let Some(c) = chars.next() {
            match open {
                Some(quote) if c == quote => {
                    if chars.peek() == Some(&quote) {
                        chars.next();
                    } else {
                        masked.push(c);
                        open = None;
                    }
                }
                Some(_) => {}
                None => {
                    if c == '\'' || c == '"' {
                        open = Some(c);
                    }
                    masked.push(c);
                }
            }
        }

        if open.is_some() {
            return Err(DdlxError::SecurityError(
                "SQL expression has an unterminated quote".to_string(),
            ));
        }
        Ok(masked)
    }
}

/// Validation for numeric inputs.
pub struct InputValidator;

impl InputValidator {
    /// Validates a ratio threshold (0.0 to 1.0).
    pub fn validate_percentage(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(DdlxError::Configuration(format!(
                "Invalid {name} value: must be finite (not NaN or infinite)"
            )));
        }

        if !(0.0..=1.0).contains(&value) {
            return Err(DdlxError::Configuration(format!(
                "Invalid {name} value: must be between 0.0 and 1.0, got {value}"
            )));
        }
        Ok(())
    }
}
