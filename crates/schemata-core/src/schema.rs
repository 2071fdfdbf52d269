//! Schema model types.
//!
//! These types describe a table the way the mapping layer declares it. The
//! comparator builds them from entity metadata and from live facts, and the
//! dialect generators render them.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Dialect-independent column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Double precision float.
    Float,
    /// Fixed-point number.
    Decimal {
        /// Total digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Boolean.
    Boolean,
    /// Bounded string; bounded by the column length.
    String,
    /// Unbounded text.
    Text,
    /// Date only.
    Date,
    /// Date and time.
    DateTime,
    /// Time only.
    Time,
    /// JSON document.
    Json,
    /// UUID.
    Uuid,
    /// ULID.
    Ulid,
    /// Binary data.
    Binary,
    /// Geometric point.
    Point,
    /// Any other type, looked up by name in the type mapper.
    ///
    /// Live columns use this with their raw physical type.
    Custom(String),
}

impl LogicalType {
    /// Returns the key the type mapper indexes this type by.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::SmallInt => "small_int",
            Self::Integer => "integer",
            Self::BigInt => "big_int",
            Self::Float => "float",
            Self::Decimal { .. } => "decimal",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Text => "text",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Time => "time",
            Self::Json => "json",
            Self::Uuid => "uuid",
            Self::Ulid => "ulid",
            Self::Binary => "binary",
            Self::Point => "point",
            Self::Custom(name) => name,
        }
    }
}

/// How a column value is generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorStrategy {
    /// Database-generated integer.
    AutoIncrement,
    /// Application-generated UUID v4.
    UuidV4,
    /// Application-generated UUID v7.
    UuidV7,
    /// Application-generated ULID.
    Ulid,
    /// Database sequence.
    Serial,
    /// Application-defined generator.
    Custom(String),
}

impl GeneratorStrategy {
    /// Returns whether the database produces the value.
    #[must_use]
    pub const fn is_database_generated(&self) -> bool {
        matches!(self, Self::AutoIncrement | Self::Serial)
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// SQL expression (e.g., "CURRENT_TIMESTAMP").
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of this default value.
    ///
    /// Booleans render as keywords; dialects that store them as integers
    /// convert the value first.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

const fn nullable_by_default() -> bool {
    true
}

/// Declared definition of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Logical type.
    pub logical_type: LogicalType,
    /// Physical type, once resolved for a dialect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_type: Option<String>,
    /// Whether the column allows NULL values.
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Length for bounded types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Whether this column is part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether this column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Value generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorStrategy>,
    /// Explicit sequence name for [`GeneratorStrategy::Serial`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_name: Option<String>,
}

impl ColumnDefinition {
    /// Creates a new nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            physical_type: None,
            nullable: true,
            default: None,
            length: None,
            primary_key: false,
            auto_increment: false,
            generator: None,
            sequence_name: None,
        }
    }

    /// Creates a nullable column typed after the column it references.
    ///
    /// Key flags, generators and defaults of the referenced column are not
    /// carried over.
    #[must_use]
    pub fn referencing(name: impl Into<String>, referenced: &Self) -> Self {
        let mut column = Self::new(name, referenced.logical_type.clone());
        column.length = referenced.length;
        column.physical_type.clone_from(&referenced.physical_type);
        column
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the length for bounded types.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the column as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the value generator.
    #[must_use]
    pub fn generator(mut self, strategy: GeneratorStrategy) -> Self {
        self.generator = Some(strategy);
        self
    }

    /// Uses a database sequence with an explicit name.
    #[must_use]
    pub fn sequence(mut self, name: impl Into<String>) -> Self {
        self.generator = Some(GeneratorStrategy::Serial);
        self.sequence_name = Some(name.into());
        self
    }

    /// Pins the physical type, bypassing the type mapper.
    #[must_use]
    pub fn physical(mut self, physical_type: impl Into<String>) -> Self {
        self.physical_type = Some(physical_type.into());
        self
    }

    /// Returns the effective generator, folding the auto-increment flag in.
    #[must_use]
    pub fn generator_strategy(&self) -> Option<GeneratorStrategy> {
        match &self.generator {
            Some(strategy) => Some(strategy.clone()),
            None if self.auto_increment => Some(GeneratorStrategy::AutoIncrement),
            None => None,
        }
    }

    /// Returns the sequence backing this column, named `<table>_<column>_seq`
    /// unless set explicitly.
    #[must_use]
    pub fn sequence_for(&self, table: &str) -> Option<String> {
        match self.generator_strategy() {
            Some(GeneratorStrategy::Serial) => Some(
                self.sequence_name
                    .clone()
                    .unwrap_or_else(|| format!("{table}_{}_seq", self.name)),
            ),
            _ => None,
        }
    }
}

/// Declared definition of an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
    /// Build without locking writes, where the dialect supports it.
    #[serde(default)]
    pub concurrent: bool,
}

impl IndexDefinition {
    /// Creates an index named after its table and columns.
    ///
    /// Plain indexes are named `idx_<table>_<columns>`, unique ones
    /// `uniq_<table>_<columns>`.
    #[must_use]
    pub fn for_columns<S: AsRef<str>>(table: &str, columns: &[S], unique: bool) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let prefix = if unique { "uniq" } else { "idx" };
        Self {
            name: format!("{prefix}_{table}_{}", columns.join("_")),
            columns,
            unique,
            concurrent: false,
        }
    }

    /// Creates an index with an explicit name.
    #[must_use]
    pub fn named<S: AsRef<str>>(name: impl Into<String>, columns: &[S]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            unique: false,
            concurrent: false,
        }
    }

    /// Sets the index as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Builds the index concurrently.
    #[must_use]
    pub fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }

    /// Returns whether both indexes cover the same columns with the same
    /// uniqueness, regardless of name.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.unique == other.unique && self.columns == other.columns
    }
}

/// Declared definition of a single-column foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    /// Constraint name.
    pub name: String,
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced column.
    pub referenced_column: String,
}

impl ForeignKeyDefinition {
    /// Creates a foreign key named `fk_<table>_<referenced_table>_<column>`.
    #[must_use]
    pub fn new(
        table: &str,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        let column = column.into();
        let referenced_table = referenced_table.into();
        Self {
            name: foreign_key_name(table, &referenced_table, &column),
            column,
            referenced_table,
            referenced_column: referenced_column.into(),
        }
    }

    /// Returns whether both keys point the same column at the same target.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.column == other.column
            && self.referenced_table == other.referenced_table
            && self.referenced_column == other.referenced_column
    }
}

/// Conventional foreign key name.
#[must_use]
pub fn foreign_key_name(table: &str, referenced_table: &str, column: &str) -> String {
    format!("fk_{table}_{referenced_table}_{column}")
}

fn sorted_columns<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut columns = Vec::<String>::deserialize(deserializer)?;
    columns.sort();
    columns.dedup();
    Ok(columns)
}

/// Complete declared definition of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns keyed by name, in declaration order.
    #[serde(default)]
    pub columns: IndexMap<String, ColumnDefinition>,
    /// Indexes keyed by name.
    #[serde(default)]
    pub indexes: IndexMap<String, IndexDefinition>,
    /// Foreign keys keyed by name.
    #[serde(default)]
    pub foreign_keys: IndexMap<String, ForeignKeyDefinition>,
    #[serde(default, deserialize_with = "sorted_columns")]
    primary_key: Vec<String>,
}

impl TableSchema {
    /// Creates a new empty table schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
            foreign_keys: IndexMap::new(),
            primary_key: Vec::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.add_column(column);
        self
    }

    /// Adds an index to the table.
    #[must_use]
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.insert(index.name.clone(), index);
        self
    }

    /// Adds a foreign key to the table.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeyDefinition) -> Self {
        self.foreign_keys
            .insert(foreign_key.name.clone(), foreign_key);
        self
    }

    /// Adds or replaces a column.
    ///
    /// Primary-key columns are registered in the primary key and forced to
    /// NOT NULL.
    pub fn add_column(&mut self, mut column: ColumnDefinition) {
        if self.primary_key.contains(&column.name) {
            column.primary_key = true;
        }
        if column.primary_key {
            column.nullable = false;
            self.insert_primary_column(column.name.clone());
        }
        self.columns.insert(column.name.clone(), column);
    }

    /// Replaces the primary key. Columns are kept sorted by name.
    pub fn set_primary_key<S: AsRef<str>>(&mut self, columns: &[S]) {
        self.primary_key.clear();
        for column in columns {
            self.insert_primary_column(column.as_ref().to_string());
        }
        for (name, column) in &mut self.columns {
            if self.primary_key.contains(name) {
                column.primary_key = true;
                column.nullable = false;
            }
        }
    }

    /// Returns the primary-key columns, sorted by name.
    #[must_use]
    pub fn primary_key_columns(&self) -> &[String] {
        &self.primary_key
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.get(name)
    }

    fn insert_primary_column(&mut self, name: String) {
        if let Err(position) = self.primary_key.binary_search(&name) {
            self.primary_key.insert(position, name);
        }
    }
}
