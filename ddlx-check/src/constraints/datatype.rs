//! Declared-type conformance.
//!
//! A column declared as e.g. `VARCHAR(10)` or `DECIMAL(10, 2)` is mapped to a
//! [`DataClass`], which in turn picks the [`ConstrainableType`] the column's
//! values must conform to.

use super::{current_table, evaluate_ratio, resolve_column};
use crate::core::{Constraint, ConstraintResult};
use crate::prelude::*;
use crate::security::{InputValidator, SqlSecurity};
use arrow::datatypes::DataType;
use async_trait::async_trait;
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

const FRACTIONAL_PATTERN: &str = r"^(-|\+)? ?(\d+\.\d*|\.\d+)$";
const NUMERIC_PATTERN: &str = r"^(-|\+)? ?(\d+|\d+\.\d*|\.\d+)$";
const BOOLEAN_PATTERN: &str = r"^(?i)(true|false)$";

/// A SQL column type as written in a table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClass {
    Bit,
    Bool,
    Char,
    VarChar,
    Binary,
    VarBinary,
    TinyBlob,
    TinyText,
    Text,
    Blob,
    MediumText,
    MediumBlob,
    LongText,
    LongBlob,
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    Integer,
    BigInt,
    Float,
    Double,
    DoublePrecision,
    Decimal,
    Dec,
    Date,
    Time,
    DateTime,
    Timestamp,
    Year,
}

impl DataClass {
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            DataClass::Char
                | DataClass::VarChar
                | DataClass::Binary
                | DataClass::VarBinary
                | DataClass::TinyBlob
                | DataClass::TinyText
                | DataClass::Text
                | DataClass::Blob
                | DataClass::MediumText
                | DataClass::MediumBlob
                | DataClass::LongText
                | DataClass::LongBlob
        )
    }

    pub fn is_boolean_like(&self) -> bool {
        matches!(self, DataClass::Bit | DataClass::Bool)
    }

    pub fn is_fraction_like(&self) -> bool {
        matches!(
            self,
            DataClass::Float
                | DataClass::Double
                | DataClass::DoublePrecision
                | DataClass::Decimal
                | DataClass::Dec
        )
    }

    pub fn is_integral_like(&self) -> bool {
        matches!(
            self,
            DataClass::TinyInt
                | DataClass::SmallInt
                | DataClass::MediumInt
                | DataClass::Int
                | DataClass::Integer
                | DataClass::BigInt
        )
    }

    pub fn is_date_like(&self) -> bool {
        matches!(
            self,
            DataClass::Date
                | DataClass::Time
                | DataClass::DateTime
                | DataClass::Timestamp
                | DataClass::Year
        )
    }

    /// The value class a column of this type must conform to.
    ///
    /// Fractional types are checked before the broader numeric class, so
    /// `DECIMAL` requires fractional values while `INT` accepts any number.
    /// Date-like types have no value class and are rejected.
    pub fn constrainable_type(&self) -> Result<ConstrainableType> {
        if self.is_string_like() {
            Ok(ConstrainableType::String)
        } else if self.is_fraction_like() {
            Ok(ConstrainableType::Fractional)
        } else if self.is_integral_like() {
            Ok(ConstrainableType::Numeric)
        } else if self.is_boolean_like() {
            Ok(ConstrainableType::Boolean)
        } else {
            Err(DdlxError::Configuration(format!(
                "Type check is not supported for {self} columns"
            )))
        }
    }
}

impl fmt::Display for DataClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for DataClass {
    type Err = DdlxError;

    /// Parses a declared SQL type, ignoring case and any `(length, scale)` suffix.
    fn from_str(s: &str) -> Result<Self> {
        let base = s.split('(').next().unwrap_or_default();
        let normalized: String = base
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        let class = match normalized.as_str() {
            "BIT" => DataClass::Bit,
            "BOOL" | "BOOLEAN" => DataClass::Bool,
            "CHAR" => DataClass::Char,
            "VARCHAR" => DataClass::VarChar,
            "BINARY" => DataClass::Binary,
            "VARBINARY" => DataClass::VarBinary,
            "TINYBLOB" => DataClass::TinyBlob,
            "TINYTEXT" => DataClass::TinyText,
            "TEXT" => DataClass::Text,
            "BLOB" => DataClass::Blob,
            "MEDIUMTEXT" => DataClass::MediumText,
            "MEDIUMBLOB" => DataClass::MediumBlob,
            "LONGTEXT" => DataClass::LongText,
            "LONGBLOB" => DataClass::LongBlob,
            "TINYINT" => DataClass::TinyInt,
            "SMALLINT" => DataClass::SmallInt,
            "MEDIUMINT" => DataClass::MediumInt,
            "INT" => DataClass::Int,
            "INTEGER" => DataClass::Integer,
            "BIGINT" => DataClass::BigInt,
            "FLOAT" => DataClass::Float,
            "DOUBLE" => DataClass::Double,
            "DOUBLE PRECISION" => DataClass::DoublePrecision,
            "DECIMAL" => DataClass::Decimal,
            "DEC" => DataClass::Dec,
            "DATE" => DataClass::Date,
            "TIME" => DataClass::Time,
            "DATETIME" => DataClass::DateTime,
            "TIMESTAMP" => DataClass::Timestamp,
            "YEAR" => DataClass::Year,
            _ => return Err(DdlxError::Parse(format!("Unknown column type '{s}'"))),
        };
        Ok(class)
    }
}

/// Value classes a column can be required to conform to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstrainableType {
    String,
    Numeric,
    Fractional,
    Boolean,
}

impl ConstrainableType {
    fn as_str(&self) -> &'static str {
        match self {
            ConstrainableType::String => "string",
            ConstrainableType::Numeric => "numeric",
            ConstrainableType::Fractional => "fractional",
            ConstrainableType::Boolean => "boolean",
        }
    }

    /// Regex a textual value must match, `None` when any text conforms.
    fn text_pattern(&self) -> Option<&'static str> {
        match self {
            ConstrainableType::String => None,
            ConstrainableType::Numeric => Some(NUMERIC_PATTERN),
            ConstrainableType::Fractional => Some(FRACTIONAL_PATTERN),
            ConstrainableType::Boolean => Some(BOOLEAN_PATTERN),
        }
    }

    /// Whether every non-null value of a typed Arrow column conforms.
    fn accepts(&self, data_type: &DataType) -> bool {
        let integral = data_type.is_integer();
        let fractional = data_type.is_floating()
            || matches!(
                data_type,
                DataType::Decimal128(_, _) | DataType::Decimal256(_, _)
            );
        match self {
            ConstrainableType::String => false,
            ConstrainableType::Numeric => integral || fractional,
            ConstrainableType::Fractional => fractional,
            ConstrainableType::Boolean => matches!(data_type, DataType::Boolean),
        }
    }
}

impl fmt::Display for ConstrainableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_text(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

/// Checks the fraction of rows whose value conforms to a [`ConstrainableType`].
///
/// Text columns are scored value by value; a string such as `"1.5"` conforms
/// to `Fractional`. Typed columns conform as a whole by their Arrow type.
/// Nulls never conform.
#[derive(Debug, Clone)]
pub struct DataTypeConstraint {
    column: String,
    expected: ConstrainableType,
    threshold: f64,
}

impl DataTypeConstraint {
    pub fn new(column: impl Into<String>, expected: ConstrainableType, threshold: f64) -> Result<Self> {
        let column = column.into();
        SqlSecurity::validate_identifier(&column)?;
        InputValidator::validate_percentage(threshold, "threshold")?;
        Ok(Self {
            column,
            expected,
            threshold,
        })
    }

    /// Builds the constraint from a declared SQL type such as `VARCHAR(10)`.
    pub fn for_declared_type(column: impl Into<String>, declared: &str, threshold: f64) -> Result<Self> {
        let class: DataClass = declared.parse()?;
        Self::new(column, class.constrainable_type()?, threshold)
    }

    pub fn expected(&self) -> ConstrainableType {
        self.expected
    }

    fn matched_expression(&self, column: &str, data_type: &DataType) -> String {
        if is_text(data_type) {
            match self.expected.text_pattern() {
                Some(pattern) => {
                    format!("COUNT(CASE WHEN {column} ~ '{pattern}' THEN 1 END)")
                }
                None => format!("COUNT({column})"),
            }
        } else if self.expected.accepts(data_type) {
            format!("COUNT({column})")
        } else {
            "CAST(0 AS BIGINT)".to_string()
        }
    }
}

#[async_trait]
impl Constraint for DataTypeConstraint {
    #[instrument(skip(self, ctx), fields(
        constraint.name = %self.name(),
        constraint.column = %self.column,
        expected = %self.expected
    ))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<ConstraintResult> {
        let data_type = resolve_column(ctx, &self.column).await?;
        debug!(actual = %data_type, "Resolved column type");

        let column = SqlSecurity::escape_identifier(&self.column)?;
        let table = current_table()?;
        let sql = format!(
            "SELECT {matched} AS matched, COUNT(*) AS total FROM {table}",
            matched = self.matched_expression(&column, &data_type)
        );

        let Some(ratio) = evaluate_ratio(ctx, self.name(), &sql).await? else {
            return Ok(ConstraintResult::skipped("No data to validate"));
        };

        Ok(ConstraintResult::from_ratio(ratio, self.threshold, || {
            format!(
                "{:.2}% of values in column '{}' ({data_type}) are {}, expected at least {:.2}%",
                ratio * 100.0,
                self.column,
                self.expected,
                self.threshold * 100.0
            )
        }))
    }

    fn name(&self) -> &str {
        "data_type"
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }
}
