//! Wire records for the JSON schema document.
//!
//! Every field is optional so that missing values become validation issues
//! instead of deserialization failures. Only a wrong JSON type for a field
//! makes the document malformed.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProject {
    pub project_name: Option<String>,
    pub db_type: Option<String>,
    pub description: Option<String>,
    pub schema: Option<Vec<RawTable>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTable {
    pub table_name: Option<String>,
    pub class_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub options: RawOptions,
    pub columns: Option<Vec<RawColumn>>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    pub use_timestamps: bool,
    pub use_soft_delete: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawColumn {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub column_type: Option<String>,
    pub length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub values: Option<Vec<String>>,
    pub target: Option<String>,
    pub on_delete: Option<String>,
    pub primary_key: Option<bool>,
    pub autoincrement: Option<bool>,
    pub unique: Option<bool>,
    pub nullable: Option<bool>,
    pub index: Option<bool>,
    pub default: Option<Value>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRelationship {
    pub target_table: Option<String>,
    pub target_class: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub back_populates: Option<String>,
    pub foreign_key: Option<String>,
    pub description: Option<String>,
}
