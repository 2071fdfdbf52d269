//! Logical-to-physical type mapping.
//!
//! Each dialect gets a [`TypeMapper`] holding one physical template per
//! logical type. Templates may carry `{length}`, `{precision}` and `{scale}`
//! placeholders. The mapper also normalizes physical type strings so a
//! declared `VARCHAR(255)` and an introspected `character varying(255)` are
//! recognized as the same type.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnDefinition, DefaultValue, LogicalType};

/// Length used when a bounded string declares none.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// MySQL / MariaDB.
    MySql,
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
}

impl DialectKind {
    /// Returns the dialect name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

/// Rewrites default values for types the dialect stores in another form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueConverter {
    /// Booleans stored as 0/1.
    BooleanAsInteger,
    /// Timestamps stored as text; `NOW()` is spelled `CURRENT_TIMESTAMP`.
    DateTimeAsText,
    /// Points stored as WKT text.
    PointAsText,
}

impl ValueConverter {
    /// Converts a declared default into the stored representation.
    #[must_use]
    pub fn convert_default(self, value: &DefaultValue) -> DefaultValue {
        match (self, value) {
            (Self::BooleanAsInteger, DefaultValue::Bool(b)) => DefaultValue::Integer(i64::from(*b)),
            (Self::DateTimeAsText, DefaultValue::Expression(expr))
                if expr.eq_ignore_ascii_case("now()") =>
            {
                DefaultValue::Expression("CURRENT_TIMESTAMP".to_string())
            }
            (Self::PointAsText, DefaultValue::Expression(expr)) => {
                DefaultValue::String(expr.clone())
            }
            _ => value.clone(),
        }
    }
}

/// Resolves logical types to one physical type per dialect.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    dialect: DialectKind,
    templates: HashMap<String, String>,
    converters: HashMap<String, ValueConverter>,
}

impl TypeMapper {
    /// Creates the built-in mapper for a dialect.
    #[must_use]
    pub fn for_dialect(dialect: DialectKind) -> Self {
        let (templates, converters) = match dialect {
            DialectKind::MySql => (MYSQL_TYPES, MYSQL_CONVERTERS),
            DialectKind::Postgres => (POSTGRES_TYPES, POSTGRES_CONVERTERS),
            DialectKind::Sqlite => (SQLITE_TYPES, SQLITE_CONVERTERS),
        };
        Self {
            dialect,
            templates: templates
                .iter()
                .map(|(logical, physical)| ((*logical).to_string(), (*physical).to_string()))
                .collect(),
            converters: converters
                .iter()
                .map(|(logical, converter)| ((*logical).to_string(), *converter))
                .collect(),
        }
    }

    /// Maps a logical type (built-in or custom) to a physical template.
    #[must_use]
    pub fn with_type(mut self, logical: impl Into<String>, physical: impl Into<String>) -> Self {
        self.templates.insert(logical.into(), physical.into());
        self
    }

    /// Registers a default-value converter for a logical type.
    #[must_use]
    pub fn with_converter(mut self, logical: impl Into<String>, converter: ValueConverter) -> Self {
        self.converters.insert(logical.into(), converter);
        self
    }

    /// Returns the dialect this mapper targets.
    #[must_use]
    pub const fn dialect(&self) -> DialectKind {
        self.dialect
    }

    /// Resolves a logical type to its physical spelling.
    ///
    /// Unmapped custom types pass through verbatim.
    #[must_use]
    pub fn resolve(&self, logical: &LogicalType, length: Option<u32>) -> String {
        let Some(template) = self.templates.get(logical.key()) else {
            return logical.key().to_string();
        };
        let (precision, scale) = match logical {
            LogicalType::Decimal { precision, scale } => (*precision, *scale),
            _ => (10, 0),
        };
        template
            .replace(
                "{length}",
                &length.unwrap_or(DEFAULT_STRING_LENGTH).to_string(),
            )
            .replace("{precision}", &precision.to_string())
            .replace("{scale}", &scale.to_string())
    }

    /// Returns the physical type of a column, honoring a pinned type.
    #[must_use]
    pub fn column_type(&self, column: &ColumnDefinition) -> String {
        column
            .physical_type
            .clone()
            .unwrap_or_else(|| self.resolve(&column.logical_type, column.length))
    }

    /// Returns the converter registered for a logical type.
    #[must_use]
    pub fn converter(&self, logical: &LogicalType) -> Option<ValueConverter> {
        self.converters.get(logical.key()).copied()
    }

    /// Returns a column's default in its stored representation.
    #[must_use]
    pub fn stored_default(&self, column: &ColumnDefinition) -> Option<DefaultValue> {
        let default = column.default.as_ref()?;
        Some(match self.converter(&column.logical_type) {
            Some(converter) => converter.convert_default(default),
            None => default.clone(),
        })
    }

    /// Normalizes a physical type for comparison.
    ///
    /// Case and whitespace are folded and dialect aliases collapse to one
    /// canonical spelling.
    #[must_use]
    pub fn normalize(&self, physical: &str) -> String {
        let folded = physical
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        let (base, args) = match folded.find('(') {
            Some(open) => (
                folded[..open].trim_end().to_string(),
                folded[open..].replace(' ', ""),
            ),
            None => (folded, String::new()),
        };

        let aliases = match self.dialect {
            DialectKind::MySql => MYSQL_ALIASES,
            DialectKind::Postgres => POSTGRES_ALIASES,
            DialectKind::Sqlite => SQLITE_ALIASES,
        };
        let base = aliases
            .iter()
            .find(|(alias, _)| *alias == base)
            .map_or(base.clone(), |(_, canonical)| (*canonical).to_string());

        // MySQL reports integer display widths that carry no meaning.
        if self.dialect == DialectKind::MySql
            && matches!(base.as_str(), "INT" | "BIGINT" | "SMALLINT" | "MEDIUMINT")
        {
            return base;
        }
        if base.contains('(') {
            return base;
        }
        format!("{base}{args}")
    }

    /// Returns whether two physical types are the same after normalization.
    #[must_use]
    pub fn types_match(&self, left: &str, right: &str) -> bool {
        self.normalize(left) == self.normalize(right)
    }
}

const MYSQL_TYPES: &[(&str, &str)] = &[
    ("small_int", "SMALLINT"),
    ("integer", "INT"),
    ("big_int", "BIGINT"),
    ("float", "DOUBLE"),
    ("decimal", "DECIMAL({precision},{scale})"),
    ("boolean", "TINYINT(1)"),
    ("string", "VARCHAR({length})"),
    ("text", "TEXT"),
    ("date", "DATE"),
    ("date_time", "DATETIME"),
    ("time", "TIME"),
    ("json", "JSON"),
    ("uuid", "CHAR(36)"),
    ("ulid", "CHAR(26)"),
    ("binary", "BLOB"),
    ("point", "POINT"),
];

const POSTGRES_TYPES: &[(&str, &str)] = &[
    ("small_int", "SMALLINT"),
    ("integer", "INTEGER"),
    ("big_int", "BIGINT"),
    ("float", "DOUBLE PRECISION"),
    ("decimal", "NUMERIC({precision},{scale})"),
    ("boolean", "BOOLEAN"),
    ("string", "VARCHAR({length})"),
    ("text", "TEXT"),
    ("date", "DATE"),
    ("date_time", "TIMESTAMP"),
    ("time", "TIME"),
    ("json", "JSONB"),
    ("uuid", "UUID"),
    ("ulid", "CHAR(26)"),
    ("binary", "BYTEA"),
    ("point", "POINT"),
];

// SQLite only knows storage affinities.
const SQLITE_TYPES: &[(&str, &str)] = &[
    ("small_int", "INTEGER"),
    ("integer", "INTEGER"),
    ("big_int", "INTEGER"),
    ("float", "REAL"),
    ("decimal", "NUMERIC"),
    ("boolean", "INTEGER"),
    ("string", "TEXT"),
    ("text", "TEXT"),
    ("date", "TEXT"),
    ("date_time", "TEXT"),
    ("time", "TEXT"),
    ("json", "TEXT"),
    ("uuid", "TEXT"),
    ("ulid", "TEXT"),
    ("binary", "BLOB"),
    ("point", "TEXT"),
];

const MYSQL_CONVERTERS: &[(&str, ValueConverter)] =
    &[("boolean", ValueConverter::BooleanAsInteger)];

const POSTGRES_CONVERTERS: &[(&str, ValueConverter)] = &[];

const SQLITE_CONVERTERS: &[(&str, ValueConverter)] = &[
    ("boolean", ValueConverter::BooleanAsInteger),
    ("date", ValueConverter::DateTimeAsText),
    ("date_time", ValueConverter::DateTimeAsText),
    ("time", ValueConverter::DateTimeAsText),
    ("point", ValueConverter::PointAsText),
];

const MYSQL_ALIASES: &[(&str, &str)] = &[
    ("INTEGER", "INT"),
    ("BOOL", "TINYINT(1)"),
    ("BOOLEAN", "TINYINT(1)"),
    ("CHARACTER VARYING", "VARCHAR"),
    ("CHARACTER", "CHAR"),
    ("DOUBLE PRECISION", "DOUBLE"),
    ("NUMERIC", "DECIMAL"),
];

const POSTGRES_ALIASES: &[(&str, &str)] = &[
    ("INT", "INTEGER"),
    ("INT4", "INTEGER"),
    ("INT8", "BIGINT"),
    ("INT2", "SMALLINT"),
    ("SERIAL", "INTEGER"),
    ("BIGSERIAL", "BIGINT"),
    ("BOOL", "BOOLEAN"),
    ("CHARACTER VARYING", "VARCHAR"),
    ("CHARACTER", "CHAR"),
    ("BPCHAR", "CHAR"),
    ("FLOAT8", "DOUBLE PRECISION"),
    ("DECIMAL", "NUMERIC"),
    ("TIMESTAMP WITHOUT TIME ZONE", "TIMESTAMP"),
    ("TIME WITHOUT TIME ZONE", "TIME"),
    ("TIMESTAMP WITH TIME ZONE", "TIMESTAMPTZ"),
];

const SQLITE_ALIASES: &[(&str, &str)] = &[("INT", "INTEGER")];
