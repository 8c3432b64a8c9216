//! Typed schema declarations.
//!
//! These are produced by the structural validator and never mutated
//! afterwards. Every enumerated spelling here is part of the input contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSchema {
    pub project_name: String,
    pub engine: StorageEngine,
    pub description: Option<String>,
    pub tables: Vec<TableDeclaration>,
}

impl ProjectSchema {
    pub fn table(&self, name: &str) -> Option<&TableDeclaration> {
        self.tables.iter().find(|t| t.table_name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngine {
    Postgresql,
    Mysql,
    Sqlite,
    Mssql,
}

impl StorageEngine {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "postgresql" => Some(Self::Postgresql),
            "mysql" => Some(Self::Mysql),
            "sqlite" => Some(Self::Sqlite),
            "mssql" => Some(Self::Mssql),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
            Self::Mssql => "mssql",
        }
    }
}

impl std::fmt::Display for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDeclaration {
    pub table_name: String,
    pub class_name: String,
    pub description: Option<String>,
    pub options: TableOptions,
    pub columns: Vec<ColumnDeclaration>,
    pub relationships: Vec<RelationshipDeclaration>,
}

impl TableDeclaration {
    pub fn column(&self, name: &str) -> Option<&ColumnDeclaration> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = (&ColumnDeclaration, &ForeignKeyTarget)> {
        self.columns.iter().filter_map(|c| match &c.column_type {
            ColumnType::ForeignKey { target, .. } => Some((c, target)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub use_timestamps: bool,
    pub use_soft_delete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDeclaration {
    pub name: String,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub default: Option<Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnFlags {
    pub primary_key: bool,
    pub autoincrement: bool,
    pub unique: bool,
    pub nullable: bool,
    pub index: bool,
}

impl Default for ColumnFlags {
    fn default() -> Self {
        Self {
            primary_key: false,
            autoincrement: false,
            unique: false,
            nullable: true,
            index: false,
        }
    }
}

/// Logical column type together with the parameters only that type accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Integer,
    String { length: Option<u32> },
    Text,
    Boolean,
    DateTime,
    Date,
    Time,
    Float,
    Numeric { precision: Option<u32>, scale: Option<u32> },
    Enum { values: Vec<String> },
    ForeignKey { target: ForeignKeyTarget, on_delete: OnDelete },
}

/// Parameterless tag of a [`ColumnType`], used while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Integer,
    String,
    Text,
    Boolean,
    DateTime,
    Date,
    Time,
    Float,
    Numeric,
    Enum,
    ForeignKey,
}

impl LogicalType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Integer" => Some(Self::Integer),
            "String" => Some(Self::String),
            "Text" => Some(Self::Text),
            "Boolean" => Some(Self::Boolean),
            "DateTime" => Some(Self::DateTime),
            "Date" => Some(Self::Date),
            "Time" => Some(Self::Time),
            "Float" => Some(Self::Float),
            "Numeric" => Some(Self::Numeric),
            "Enum" => Some(Self::Enum),
            "ForeignKey" => Some(Self::ForeignKey),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Text => "Text",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::Float => "Float",
            Self::Numeric => "Numeric",
            Self::Enum => "Enum",
            Self::ForeignKey => "ForeignKey",
        }
    }
}

/// `table.column` reference of a foreign-key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub column: String,
}

impl ForeignKeyTarget {
    /// Split `table.column`; exactly one separator and two non-empty sides.
    pub fn parse(s: &str) -> Option<Self> {
        let (table, column) = s.split_once('.')?;
        if table.is_empty() || column.is_empty() || column.contains('.') {
            return None;
        }
        Some(Self {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

impl std::fmt::Display for ForeignKeyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnDelete {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
}

impl OnDelete {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CASCADE" => Some(Self::Cascade),
            "RESTRICT" => Some(Self::Restrict),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            "NO ACTION" => Some(Self::NoAction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationshipKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "one_to_many" => Some(Self::OneToMany),
            "many_to_one" => Some(Self::ManyToOne),
            "many_to_many" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToMany => "one_to_many",
            Self::ManyToOne => "many_to_one",
            Self::ManyToMany => "many_to_many",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDeclaration {
    pub target_table: String,
    pub target_class: String,
    pub kind: RelationshipKind,
    pub back_populates: String,
    pub foreign_key: Option<String>,
    pub description: Option<String>,
}
