//! Validation issues and reports shared by every validator stage.
//!
//! Each issue carries a stable machine-readable code. The code decides the
//! issue's category (input, structural, relational, dependency, internal)
//! and a fixed recommendation; severity is attached per issue because a few
//! codes are reported at different levels depending on context.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Where an issue originates in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Input,
    Structural,
    Relational,
    Dependency,
    /// A precondition of a later stage was violated; always a defect.
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    // input
    JsonSyntaxError,
    MalformedInput,
    InputTooLarge,
    // structural
    MissingField,
    InvalidProjectName,
    InvalidStorageEngine,
    NoTables,
    InvalidTableName,
    InvalidClassName,
    DuplicateTableName,
    DuplicateClassName,
    NoColumns,
    DuplicateColumnName,
    InvalidColumnType,
    MissingPrimaryKey,
    NullablePrimaryKey,
    ParameterNotAllowed,
    InvalidParameter,
    MissingEnumValues,
    MissingFkTarget,
    InvalidFkFormat,
    InvalidOnDelete,
    InvalidRelationshipKind,
    MissingFkColumn,
    LimitExceeded,
    OnDeleteIgnored,
    NoRelationships,
    StringNoLength,
    TooManyColumns,
    CompositePrimaryKey,
    ProjectInfo,
    // relational
    FkTableNotFound,
    FkColumnNotFound,
    FkNotPkOrUnique,
    RelTableNotFound,
    MissingBackPopulates,
    // dependency
    CircularDependency,
    // internal
    BuildOrderIncomplete,
}

impl IssueCode {
    pub fn code(&self) -> &'static str {
        match self {
            IssueCode::JsonSyntaxError => "JSON_SYNTAX_ERROR",
            IssueCode::MalformedInput => "MALFORMED_INPUT",
            IssueCode::InputTooLarge => "INPUT_TOO_LARGE",
            IssueCode::MissingField => "MISSING_FIELD",
            IssueCode::InvalidProjectName => "INVALID_PROJECT_NAME",
            IssueCode::InvalidStorageEngine => "INVALID_STORAGE_ENGINE",
            IssueCode::NoTables => "NO_TABLES",
            IssueCode::InvalidTableName => "INVALID_TABLE_NAME",
            IssueCode::InvalidClassName => "INVALID_CLASS_NAME",
            IssueCode::DuplicateTableName => "DUPLICATE_TABLE_NAME",
            IssueCode::DuplicateClassName => "DUPLICATE_CLASS_NAME",
            IssueCode::NoColumns => "NO_COLUMNS",
            IssueCode::DuplicateColumnName => "DUPLICATE_COLUMN_NAME",
            IssueCode::InvalidColumnType => "INVALID_COLUMN_TYPE",
            IssueCode::MissingPrimaryKey => "MISSING_PRIMARY_KEY",
            IssueCode::NullablePrimaryKey => "NULLABLE_PRIMARY_KEY",
            IssueCode::ParameterNotAllowed => "PARAMETER_NOT_ALLOWED",
            IssueCode::InvalidParameter => "INVALID_PARAMETER",
            IssueCode::MissingEnumValues => "MISSING_ENUM_VALUES",
            IssueCode::MissingFkTarget => "MISSING_FK_TARGET",
            IssueCode::InvalidFkFormat => "INVALID_FK_FORMAT",
            IssueCode::InvalidOnDelete => "INVALID_ON_DELETE",
            IssueCode::InvalidRelationshipKind => "INVALID_RELATIONSHIP_KIND",
            IssueCode::MissingFkColumn => "MISSING_FK_COLUMN",
            IssueCode::LimitExceeded => "LIMIT_EXCEEDED",
            IssueCode::OnDeleteIgnored => "ON_DELETE_IGNORED",
            IssueCode::NoRelationships => "NO_RELATIONSHIPS",
            IssueCode::StringNoLength => "STRING_NO_LENGTH",
            IssueCode::TooManyColumns => "TOO_MANY_COLUMNS",
            IssueCode::CompositePrimaryKey => "COMPOSITE_PRIMARY_KEY",
            IssueCode::ProjectInfo => "PROJECT_INFO",
            IssueCode::FkTableNotFound => "FK_TABLE_NOT_FOUND",
            IssueCode::FkColumnNotFound => "FK_COLUMN_NOT_FOUND",
            IssueCode::FkNotPkOrUnique => "FK_NOT_PK_OR_UNIQUE",
            IssueCode::RelTableNotFound => "REL_TABLE_NOT_FOUND",
            IssueCode::MissingBackPopulates => "MISSING_BACK_POPULATES",
            IssueCode::CircularDependency => "CIRCULAR_DEPENDENCY",
            IssueCode::BuildOrderIncomplete => "BUILD_ORDER_INCOMPLETE",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            IssueCode::JsonSyntaxError | IssueCode::MalformedInput | IssueCode::InputTooLarge => {
                Category::Input
            }
            IssueCode::FkTableNotFound
            | IssueCode::FkColumnNotFound
            | IssueCode::FkNotPkOrUnique
            | IssueCode::RelTableNotFound
            | IssueCode::MissingBackPopulates => Category::Relational,
            IssueCode::CircularDependency => Category::Dependency,
            IssueCode::BuildOrderIncomplete => Category::Internal,
            _ => Category::Structural,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            IssueCode::JsonSyntaxError => "Fix JSON syntax errors. Use a JSON validator or linter.",
            IssueCode::MalformedInput => {
                "Check that every field has the expected JSON type (strings, booleans, integers, arrays)."
            }
            IssueCode::InputTooLarge => "Split the schema into smaller projects.",
            IssueCode::MissingField => "Add the required field.",
            IssueCode::InvalidProjectName => {
                "Use only letters, digits, hyphens and underscores in project_name."
            }
            IssueCode::InvalidStorageEngine => {
                "Use one of: postgresql, mysql, sqlite, mssql."
            }
            IssueCode::NoTables => "Declare at least one table.",
            IssueCode::InvalidTableName => {
                "Use a lowercase table_name made of letters, digits and underscores."
            }
            IssueCode::InvalidClassName => {
                "Start class_name with an uppercase letter; use letters, digits and underscores."
            }
            IssueCode::DuplicateTableName | IssueCode::DuplicateClassName => {
                "Rename one of the conflicting tables."
            }
            IssueCode::NoColumns => "Declare at least one column.",
            IssueCode::DuplicateColumnName => "Rename one of the conflicting columns.",
            IssueCode::InvalidColumnType => {
                "Use one of: Integer, String, Text, Boolean, DateTime, Date, Time, Float, Numeric, Enum, ForeignKey."
            }
            IssueCode::MissingPrimaryKey => "Mark at least one column with \"primary_key\": true.",
            IssueCode::NullablePrimaryKey => "Set \"nullable\": false on primary key columns.",
            IssueCode::ParameterNotAllowed => {
                "Remove the parameter or change the column type that accepts it."
            }
            IssueCode::InvalidParameter => "Use positive sizes and a scale no larger than precision.",
            IssueCode::MissingEnumValues => "List the allowed values under \"values\".",
            IssueCode::MissingFkTarget => "Set \"target\" to \"table_name.column_name\".",
            IssueCode::InvalidFkFormat => "Use the format \"table_name.column_name\".",
            IssueCode::InvalidOnDelete => {
                "Use one of: CASCADE, RESTRICT, SET NULL, SET DEFAULT, NO ACTION."
            }
            IssueCode::InvalidRelationshipKind => {
                "Use one of: one_to_many, many_to_one, many_to_many."
            }
            IssueCode::MissingFkColumn => "Name the local foreign key column under \"foreign_key\".",
            IssueCode::LimitExceeded => "Reduce the schema size or raise the configured limit.",
            IssueCode::OnDeleteIgnored => "Remove on_delete from columns that are not foreign keys.",
            IssueCode::NoRelationships => {
                "Consider adding relationships if this table relates to others."
            }
            IssueCode::StringNoLength => {
                "Specify a length for String columns, e.g. \"length\": 100"
            }
            IssueCode::TooManyColumns => {
                "Consider normalizing the table by splitting it into multiple tables."
            }
            IssueCode::CompositePrimaryKey | IssueCode::ProjectInfo => "No action needed.",
            IssueCode::FkTableNotFound => "Ensure the referenced table is defined in the schema.",
            IssueCode::FkColumnNotFound => {
                "Check that the target column exists in the referenced table."
            }
            IssueCode::FkNotPkOrUnique => {
                "Foreign keys should reference primary key or unique columns."
            }
            IssueCode::RelTableNotFound => {
                "Ensure the relationship target table is defined in the schema."
            }
            IssueCode::MissingBackPopulates => {
                "Declare the reciprocal relationship on the target table."
            }
            IssueCode::CircularDependency => {
                "Remove circular foreign key references. Consider nullable FKs or restructuring relationships."
            }
            IssueCode::BuildOrderIncomplete => "Report this as a bug.",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Position of an issue within the schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    /// Line/column in the raw text (1-based).
    Input { line: usize, column: usize },
    /// A project-level field such as `db_type`.
    Field { field: String },
    Table { table: String },
    Column { table: String, column: String },
    ForeignKey { table: String, column: String, target: String },
    Relationship { table: String, target: String },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Input { line, column } => write!(f, "line {line}, column {column}"),
            Location::Field { field } => write!(f, "field: {field}"),
            Location::Table { table } => write!(f, "table: {table}"),
            Location::Column { table, column } => write!(f, "table: {table}, column: {column}"),
            Location::ForeignKey {
                table,
                column,
                target,
            } => write!(f, "table: {table}, column: {column} -> {target}"),
            Location::Relationship { table, target } => write!(f, "table: {table} -> {target}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueCode,
    /// Always `code.category()`.
    pub category: Category,
    pub location: Option<Location>,
    pub message: String,
}

impl Issue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    fn new(severity: Severity, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            category: code.category(),
            location: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn recommendation(&self) -> &'static str {
        self.code.recommendation()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.code)?;
        if let Some(location) = &self.location {
            write!(f, " [{location}]")?;
        }
        write!(f, " {}", self.message)
    }
}

/// Outcome of one validation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<Issue>,
    pub summary: String,
}

impl ValidationReport {
    /// Build a report whose validity follows from the issues.
    pub fn from_issues(stage: &str, issues: Vec<Issue>) -> Self {
        let valid = !issues.iter().any(Issue::is_error);
        let summary = format!(
            "{stage} {} with {} issue(s)",
            if valid { "passed" } else { "failed" },
            issues.len()
        );
        Self {
            valid,
            issues,
            summary,
        }
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation Report: {}", self.summary)?;
        if self.error_count() > 0 {
            writeln!(f, "\nErrors: {}", self.error_count())?;
            for issue in self.errors() {
                writeln!(f, "  - {issue}")?;
                writeln!(f, "    hint: {}", issue.recommendation())?;
            }
        }
        if self.warning_count() > 0 {
            writeln!(f, "\nWarnings: {}", self.warning_count())?;
            for issue in self.warnings() {
                writeln!(f, "  - {issue}")?;
            }
        }
        if self.valid {
            write!(f, "\nSchema is valid.")
        } else {
            write!(f, "\nSchema validation failed.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_screaming_snake() {
        assert_eq!(IssueCode::StringNoLength.code(), "STRING_NO_LENGTH");
        assert_eq!(IssueCode::CircularDependency.code(), "CIRCULAR_DEPENDENCY");
        // serde spelling must agree with code()
        let json = serde_json::to_string(&IssueCode::FkNotPkOrUnique).unwrap();
        assert_eq!(json, "\"FK_NOT_PK_OR_UNIQUE\"");
    }

    #[test]
    fn test_categories() {
        assert_eq!(IssueCode::JsonSyntaxError.category(), Category::Input);
        assert_eq!(IssueCode::MissingPrimaryKey.category(), Category::Structural);
        assert_eq!(IssueCode::FkTableNotFound.category(), Category::Relational);
        assert_eq!(IssueCode::CircularDependency.category(), Category::Dependency);
        assert_eq!(IssueCode::BuildOrderIncomplete.category(), Category::Internal);
    }

    #[test]
    fn test_issue_carries_category() {
        let issue = Issue::error(IssueCode::FkColumnNotFound, "Column 'uid' not found in table 'users'");
        assert_eq!(issue.category, Category::Relational);
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["code"], "FK_COLUMN_NOT_FOUND");
        assert_eq!(json["category"], "relational");
    }

    #[test]
    fn test_issue_display() {
        let issue = Issue::warning(IssueCode::StringNoLength, "String column should specify length")
            .at(Location::Column {
                table: "users".into(),
                column: "name".into(),
            });
        assert_eq!(
            issue.to_string(),
            "[WARNING] STRING_NO_LENGTH [table: users, column: name] String column should specify length"
        );
    }

    #[test]
    fn test_report_validity_follows_errors() {
        let report = ValidationReport::from_issues(
            "Structural validation",
            vec![Issue::warning(IssueCode::NoRelationships, "Table has no relationships defined")],
        );
        assert!(report.valid);
        assert_eq!(report.warning_count(), 1);

        let report = ValidationReport::from_issues(
            "Structural validation",
            vec![Issue::error(IssueCode::NoTables, "no tables")],
        );
        assert!(!report.valid);
        assert!(report.to_string().contains("Schema validation failed."));
    }
}
