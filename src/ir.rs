//! Architecture plan: the resolved, statically typed IR handed to emission.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::OutputLayout;
use crate::measure::TextTable;
use crate::schema::{OnDelete, RelationshipKind, StorageEngine};

/// Column type names of the target ORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetType {
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
}

impl TargetType {
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
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument passed to a target type constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeArg {
    Int(u32),
    Str(String),
    Keyword { name: String, value: String },
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Int(n) => write!(f, "{n}"),
            TypeArg::Str(s) => write!(f, "{s:?}"),
            TypeArg::Keyword { name, value } => write!(f, "{name}={value:?}"),
        }
    }
}

/// Keyword flags of a column. Only values that differ from the ORM default
/// are set; `nullable` is `None` when the default applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnKwargs {
    pub primary_key: bool,
    pub autoincrement: bool,
    pub unique: bool,
    pub index: bool,
    pub nullable: Option<bool>,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    /// `table.column`
    pub target: String,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub target_type: TargetType,
    pub args: Vec<TypeArg>,
    pub kwargs: ColumnKwargs,
    pub foreign_key: Option<ForeignKeySpec>,
    pub description: Option<String>,
}

impl ColumnSpec {
    /// Short flag list for summaries, e.g. `pk, not null`.
    pub fn flag_summary(&self) -> String {
        let mut flags = Vec::new();
        if self.kwargs.primary_key {
            flags.push("pk".to_string());
        }
        if self.kwargs.autoincrement {
            flags.push("autoincrement".to_string());
        }
        if self.kwargs.unique {
            flags.push("unique".to_string());
        }
        if self.kwargs.index {
            flags.push("index".to_string());
        }
        if self.kwargs.nullable == Some(false) {
            flags.push("not null".to_string());
        }
        if let Some(default) = &self.kwargs.default {
            flags.push(format!("default={default}"));
        }
        if let Some(fk) = &self.foreign_key {
            flags.push(format!("fk -> {} ({})", fk.target, fk.on_delete.as_str()));
        }
        flags.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    /// Attribute name on the model.
    pub attribute: String,
    pub target_class: String,
    pub kind: RelationshipKind,
    pub back_populates: String,
    pub foreign_key: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImportStatement {
    pub module: String,
    pub items: Vec<String>,
}

impl fmt::Display for ImportStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "from {} import {}", self.module, self.items.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixinKind {
    Timestamp,
    SoftDelete,
}

impl MixinKind {
    pub fn class_name(&self) -> &'static str {
        match self {
            MixinKind::Timestamp => "TimestampMixin",
            MixinKind::SoftDelete => "SoftDeleteMixin",
        }
    }

    /// Column names the mixin contributes to every model using it.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            MixinKind::Timestamp => &["created_at", "updated_at"],
            MixinKind::SoftDelete => &["is_deleted", "deleted_at"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPlan {
    pub table_name: String,
    pub class_name: String,
    pub file_path: String,
    pub description: Option<String>,
    /// Root base first, then mixins.
    pub bases: Vec<String>,
    pub mixins: Vec<MixinKind>,
    pub columns: Vec<ColumnSpec>,
    pub relationships: Vec<RelationshipSpec>,
    pub imports: Vec<ImportStatement>,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_name: String,
    pub engine: StorageEngine,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    CompositeKey,
    SelfReference,
    ManyToMany,
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanNote {
    pub kind: NoteKind,
    pub table: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturePlan {
    pub project: ProjectMetadata,
    pub build_order: Vec<String>,
    /// One per table, in declaration order.
    pub models: Vec<ModelPlan>,
    pub output: OutputLayout,
    pub notes: Vec<PlanNote>,
}

impl ArchitecturePlan {
    pub fn model(&self, table_name: &str) -> Option<&ModelPlan> {
        self.models.iter().find(|m| m.table_name == table_name)
    }

    /// Models in build order.
    pub fn ordered_models(&self) -> impl Iterator<Item = &ModelPlan> {
        self.build_order.iter().filter_map(|t| self.model(t))
    }

    pub fn total_columns(&self) -> usize {
        self.models.iter().map(|m| m.columns.len()).sum()
    }

    pub fn total_relationships(&self) -> usize {
        self.models.iter().map(|m| m.relationships.len()).sum()
    }

    pub fn uses_mixins(&self) -> bool {
        self.models.iter().any(|m| !m.mixins.is_empty())
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Architecture Plan: {}\n", self.project.project_name));
        out.push_str(&format!("Engine: {}\n", self.project.engine));
        out.push_str(&format!(
            "Output directory: {}\n",
            self.output.output_directory
        ));
        out.push_str(&format!(
            "Models: {}, columns: {}, relationships: {}\n",
            self.models.len(),
            self.total_columns(),
            self.total_relationships()
        ));

        out.push_str("\nBuild order:\n");
        let mut table = TextTable::new(["#", "Table", "Class", "Depends on", "Mixins"]);
        for (i, model) in self.ordered_models().enumerate() {
            let mixins: Vec<&str> = model.mixins.iter().map(MixinKind::class_name).collect();
            table.add_row([
                (i + 1).to_string(),
                model.table_name.clone(),
                model.class_name.clone(),
                model.depends_on.join(", "),
                mixins.join(", "),
            ]);
        }
        out.push_str(&table.render());

        if !self.notes.is_empty() {
            out.push_str("\nNotes:\n");
            for note in &self.notes {
                out.push_str(&format!("  - {}\n", note.message));
            }
        }
        out
    }

    pub fn detailed(&self) -> String {
        let mut out = String::new();
        for model in self.ordered_models() {
            out.push_str(&format!("{} ({})\n", model.class_name, model.table_name));
            out.push_str(&format!("  File: {}\n", model.file_path));
            out.push_str(&format!("  Inherits: {}\n", model.bases.join(", ")));

            out.push_str("  Columns:\n");
            let mut columns = TextTable::new(["Name", "Type", "Args", "Flags"]).with_indent(4);
            for column in &model.columns {
                let args: Vec<String> = column.args.iter().map(ToString::to_string).collect();
                columns.add_row([
                    column.name.clone(),
                    column.target_type.to_string(),
                    args.join(", "),
                    column.flag_summary(),
                ]);
            }
            out.push_str(&columns.render());

            if !model.relationships.is_empty() {
                out.push_str("  Relationships:\n");
                let mut rels =
                    TextTable::new(["Attribute", "Target", "Kind", "Back populates"]).with_indent(4);
                for rel in &model.relationships {
                    rels.add_row([
                        rel.attribute.clone(),
                        rel.target_class.clone(),
                        rel.kind.as_str().to_string(),
                        rel.back_populates.clone(),
                    ]);
                }
                out.push_str(&rels.render());
            }

            out.push_str("  Imports:\n");
            for import in &model.imports {
                out.push_str(&format!("    {import}\n"));
            }
            out.push('\n');
        }
        out
    }
}
