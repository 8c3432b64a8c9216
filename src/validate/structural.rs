//! Structural validation: raw schema document to typed [`ProjectSchema`].
//!
//! Malformed input stops everything. Past that point every detectable
//! problem is collected in a single pass, in declaration order.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info};

use super::raw::{RawColumn, RawProject, RawRelationship, RawTable};
use crate::config::{Config, Limits};
use crate::report::{Issue, IssueCode, Location, ValidationReport};
use crate::schema::{
    ColumnDeclaration, ColumnFlags, ColumnType, ForeignKeyTarget, LogicalType, OnDelete,
    ProjectSchema, RelationshipDeclaration, RelationshipKind, StorageEngine, TableDeclaration,
    TableOptions,
};

const STAGE: &str = "Structural validation";

/// Result of structural validation. `schema` is present iff the report is valid.
#[derive(Debug, Clone)]
pub struct StructuralOutcome {
    pub report: ValidationReport,
    pub schema: Option<ProjectSchema>,
}

impl StructuralOutcome {
    fn rejected(issue: Issue) -> Self {
        Self {
            report: ValidationReport::from_issues(STAGE, vec![issue]),
            schema: None,
        }
    }
}

pub struct StructuralValidator<'a> {
    limits: &'a Limits,
}

impl<'a> StructuralValidator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            limits: &config.limits,
        }
    }

    /// Validate a schema document given as text.
    pub fn validate_str(&self, input: &str) -> StructuralOutcome {
        if input.len() > self.limits.max_input_bytes {
            return StructuralOutcome::rejected(Issue::error(
                IssueCode::InputTooLarge,
                format!(
                    "Input size ({} bytes) exceeds maximum allowed ({} bytes)",
                    input.len(),
                    self.limits.max_input_bytes
                ),
            ));
        }

        match serde_json::from_str::<Value>(input) {
            Ok(value) => self.validate_value(value),
            Err(e) => {
                debug!(error = %e, "schema document rejected");
                StructuralOutcome::rejected(
                    Issue::error(IssueCode::JsonSyntaxError, format!("Invalid JSON syntax: {e}"))
                        .at(Location::Input {
                            line: e.line(),
                            column: e.column(),
                        }),
                )
            }
        }
    }

    /// Validate an already parsed document.
    pub fn validate_value(&self, value: Value) -> StructuralOutcome {
        if !value.is_object() {
            return StructuralOutcome::rejected(Issue::error(
                IssueCode::MalformedInput,
                "Schema document must be a JSON object",
            ));
        }
        match serde_json::from_value::<RawProject>(value) {
            Ok(raw) => self.check(raw),
            Err(e) => StructuralOutcome::rejected(Issue::error(
                IssueCode::MalformedInput,
                format!("Malformed schema: {e}"),
            )),
        }
    }

    fn check(&self, raw: RawProject) -> StructuralOutcome {
        let mut checker = Checker {
            limits: self.limits,
            issues: Vec::new(),
        };
        let schema = checker.project(raw);
        let report = ValidationReport::from_issues(STAGE, checker.issues);
        info!(
            valid = report.valid,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "structural validation complete"
        );
        let schema = if report.valid { schema } else { None };
        StructuralOutcome { report, schema }
    }
}

struct Checker<'a> {
    limits: &'a Limits,
    issues: Vec<Issue>,
}

impl Checker<'_> {
    fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    fn check_name_length(&mut self, what: &str, name: &str, location: Location) {
        let len = name.chars().count();
        if len > self.limits.max_name_length {
            self.push(
                Issue::error(
                    IssueCode::LimitExceeded,
                    format!(
                        "{what} length ({len}) exceeds maximum allowed ({})",
                        self.limits.max_name_length
                    ),
                )
                .at(location),
            );
        }
    }

    fn project(&mut self, raw: RawProject) -> Option<ProjectSchema> {
        let project_name = present(raw.project_name);
        match &project_name {
            None => self.push(missing("project_name", field("project_name"))),
            Some(name) => {
                if !is_project_name(name) {
                    self.push(
                        Issue::error(
                            IssueCode::InvalidProjectName,
                            format!(
                                "project_name '{name}' must contain only alphanumeric characters, hyphens, and underscores"
                            ),
                        )
                        .at(field("project_name")),
                    );
                }
                self.check_name_length("project_name", name, field("project_name"));
            }
        }

        let engine = match present(raw.db_type) {
            None => {
                self.push(missing("db_type", field("db_type")));
                None
            }
            Some(db_type) => {
                let engine = StorageEngine::from_str(&db_type);
                if engine.is_none() {
                    self.push(
                        Issue::error(
                            IssueCode::InvalidStorageEngine,
                            format!("Unsupported db_type '{db_type}'"),
                        )
                        .at(field("db_type")),
                    );
                }
                engine
            }
        };

        let raw_tables = match raw.schema {
            None => {
                self.push(missing("schema", field("schema")));
                Vec::new()
            }
            Some(tables) if tables.is_empty() => {
                self.push(
                    Issue::error(IssueCode::NoTables, "Schema must declare at least one table")
                        .at(field("schema")),
                );
                tables
            }
            Some(tables) => tables,
        };

        if raw_tables.len() > self.limits.max_tables {
            self.push(
                Issue::error(
                    IssueCode::LimitExceeded,
                    format!(
                        "Number of tables ({}) exceeds maximum allowed ({})",
                        raw_tables.len(),
                        self.limits.max_tables
                    ),
                )
                .at(field("schema")),
            );
        }

        if let Some(name) = &project_name {
            self.push(Issue::info(
                IssueCode::ProjectInfo,
                format!("Project '{name}' with {} table(s)", raw_tables.len()),
            ));
        }

        let mut seen_tables = HashSet::new();
        let mut seen_classes = HashSet::new();
        let mut tables = Vec::with_capacity(raw_tables.len());
        for (index, raw_table) in raw_tables.into_iter().enumerate() {
            let table = self.table(index, raw_table, &mut seen_tables, &mut seen_classes);
            tables.push(table);
        }

        Some(ProjectSchema {
            project_name: project_name?,
            engine: engine?,
            description: raw.description,
            tables: tables.into_iter().collect::<Option<Vec<_>>>()?,
        })
    }

    fn table(
        &mut self,
        index: usize,
        raw: RawTable,
        seen_tables: &mut HashSet<String>,
        seen_classes: &mut HashSet<String>,
    ) -> Option<TableDeclaration> {
        let errors_before = self.error_count();
        let table_name = present(raw.table_name);
        let label = table_name
            .clone()
            .unwrap_or_else(|| format!("schema[{index}]"));
        let here = Location::Table {
            table: label.clone(),
        };
        debug!(table = %label, "checking table");

        match &table_name {
            None => self.push(missing("table_name", here.clone())),
            Some(name) => {
                if !is_table_name(name) {
                    self.push(
                        Issue::error(
                            IssueCode::InvalidTableName,
                            format!(
                                "table_name '{name}' must be lowercase and contain only alphanumeric characters and underscores"
                            ),
                        )
                        .at(here.clone()),
                    );
                }
                self.check_name_length("table_name", name, here.clone());
                if !seen_tables.insert(name.clone()) {
                    self.push(
                        Issue::error(
                            IssueCode::DuplicateTableName,
                            format!("Duplicate table name '{name}'"),
                        )
                        .at(here.clone()),
                    );
                }
            }
        }

        let class_name = present(raw.class_name);
        match &class_name {
            None => self.push(missing("class_name", here.clone())),
            Some(name) => {
                if !is_class_name(name) {
                    self.push(
                        Issue::error(
                            IssueCode::InvalidClassName,
                            format!(
                                "class_name '{name}' must start with an uppercase letter and contain only alphanumeric characters and underscores"
                            ),
                        )
                        .at(here.clone()),
                    );
                }
                self.check_name_length("class_name", name, here.clone());
                if !seen_classes.insert(name.clone()) {
                    self.push(
                        Issue::error(
                            IssueCode::DuplicateClassName,
                            format!("Duplicate class name '{name}'"),
                        )
                        .at(here.clone()),
                    );
                }
            }
        }

        let raw_columns = match raw.columns {
            None => {
                self.push(missing("columns", here.clone()));
                Vec::new()
            }
            Some(columns) if columns.is_empty() => {
                self.push(
                    Issue::error(IssueCode::NoColumns, "Table must declare at least one column")
                        .at(here.clone()),
                );
                columns
            }
            Some(columns) => columns,
        };

        if raw_columns.len() > self.limits.max_columns_per_table {
            self.push(
                Issue::error(
                    IssueCode::LimitExceeded,
                    format!(
                        "Number of columns ({}) exceeds maximum allowed ({})",
                        raw_columns.len(),
                        self.limits.max_columns_per_table
                    ),
                )
                .at(here.clone()),
            );
        }
        if raw.relationships.len() > self.limits.max_relationships_per_table {
            self.push(
                Issue::error(
                    IssueCode::LimitExceeded,
                    format!(
                        "Number of relationships ({}) exceeds maximum allowed ({})",
                        raw.relationships.len(),
                        self.limits.max_relationships_per_table
                    ),
                )
                .at(here.clone()),
            );
        }

        let column_count = raw_columns.len();
        let pk_names: Vec<String> = raw_columns
            .iter()
            .filter(|c| c.primary_key.unwrap_or(false))
            .map(|c| c.name.clone().unwrap_or_default())
            .collect();

        let mut seen_columns = HashSet::new();
        let columns: Vec<Option<ColumnDeclaration>> = raw_columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| self.column(&label, i, c, &mut seen_columns))
            .collect();

        if column_count > 0 && pk_names.is_empty() {
            self.push(
                Issue::error(
                    IssueCode::MissingPrimaryKey,
                    format!("Table '{label}' must have at least one primary key column"),
                )
                .at(here.clone()),
            );
        }

        let relationship_count = raw.relationships.len();
        let relationships: Vec<Option<RelationshipDeclaration>> = raw
            .relationships
            .into_iter()
            .enumerate()
            .map(|(i, r)| self.relationship(&label, i, r))
            .collect();

        if relationship_count == 0 {
            self.push(
                Issue::warning(IssueCode::NoRelationships, "Table has no relationships defined")
                    .at(here.clone()),
            );
        }
        if column_count > self.limits.wide_table_columns {
            self.push(
                Issue::warning(
                    IssueCode::TooManyColumns,
                    format!("Table has many columns ({column_count}). Consider normalization."),
                )
                .at(here.clone()),
            );
        }
        if pk_names.len() > 1 {
            self.push(
                Issue::info(
                    IssueCode::CompositePrimaryKey,
                    format!("Table has composite primary key: {}", pk_names.join(", ")),
                )
                .at(here),
            );
        }

        if self.error_count() > errors_before {
            return None;
        }
        Some(TableDeclaration {
            table_name: table_name?,
            class_name: class_name?,
            description: raw.description,
            options: TableOptions {
                use_timestamps: raw.options.use_timestamps,
                use_soft_delete: raw.options.use_soft_delete,
            },
            columns: columns.into_iter().collect::<Option<Vec<_>>>()?,
            relationships: relationships.into_iter().collect::<Option<Vec<_>>>()?,
        })
    }

    fn column(
        &mut self,
        table: &str,
        index: usize,
        mut raw: RawColumn,
        seen: &mut HashSet<String>,
    ) -> Option<ColumnDeclaration> {
        let errors_before = self.error_count();
        let name = present(raw.name.take());
        let here = Location::Column {
            table: table.to_string(),
            column: name.clone().unwrap_or_else(|| format!("columns[{index}]")),
        };

        match &name {
            None => self.push(missing("name", here.clone())),
            Some(n) => {
                self.check_name_length("column name", n, here.clone());
                if !seen.insert(n.clone()) {
                    self.push(
                        Issue::error(
                            IssueCode::DuplicateColumnName,
                            format!("Duplicate column name '{n}'"),
                        )
                        .at(here.clone()),
                    );
                }
            }
        }

        let logical = match present(raw.column_type.take()) {
            None => {
                self.push(missing("type", here.clone()));
                None
            }
            Some(t) => {
                let logical = LogicalType::from_str(&t);
                if logical.is_none() {
                    self.push(
                        Issue::error(
                            IssueCode::InvalidColumnType,
                            format!("Unknown column type '{t}'"),
                        )
                        .at(here.clone()),
                    );
                }
                logical
            }
        };

        let on_delete = match raw.on_delete.as_deref() {
            None => Some(OnDelete::default()),
            Some(s) => {
                let parsed = OnDelete::from_str(s);
                if parsed.is_none() {
                    self.push(
                        Issue::error(
                            IssueCode::InvalidOnDelete,
                            format!("Unknown on_delete action '{s}'"),
                        )
                        .at(here.clone()),
                    );
                }
                parsed
            }
        };

        let column_type = match logical {
            Some(logical) => self.column_type(logical, &raw, on_delete, &here),
            None => None,
        };

        let flags = ColumnFlags {
            primary_key: raw.primary_key.unwrap_or(false),
            autoincrement: raw.autoincrement.unwrap_or(false),
            unique: raw.unique.unwrap_or(false),
            nullable: raw.nullable.unwrap_or(true),
            index: raw.index.unwrap_or(false),
        };
        if flags.primary_key && flags.nullable {
            self.push(
                Issue::error(
                    IssueCode::NullablePrimaryKey,
                    "Primary key columns cannot be nullable",
                )
                .at(here.clone()),
            );
        }

        if self.error_count() > errors_before {
            return None;
        }
        Some(ColumnDeclaration {
            name: name?,
            column_type: column_type?,
            flags,
            default: raw.default,
            description: raw.description,
        })
    }

    /// Apply the per-type parameter rules and build the typed variant.
    fn column_type(
        &mut self,
        logical: LogicalType,
        raw: &RawColumn,
        on_delete: Option<OnDelete>,
        here: &Location,
    ) -> Option<ColumnType> {
        let type_name = logical.as_str();
        let not_allowed = |checker: &mut Self, param: &str, allowed_for: &str| {
            checker.push(
                Issue::error(
                    IssueCode::ParameterNotAllowed,
                    format!(
                        "{param} can only be specified for {allowed_for} type columns, not {type_name}"
                    ),
                )
                .at(here.clone()),
            );
        };

        if raw.length.is_some() && logical != LogicalType::String {
            not_allowed(self, "length", "String");
        }
        if raw.precision.is_some() && logical != LogicalType::Numeric {
            not_allowed(self, "precision", "Numeric");
        }
        if raw.scale.is_some() && logical != LogicalType::Numeric {
            not_allowed(self, "scale", "Numeric");
        }
        if raw.values.is_some() && logical != LogicalType::Enum {
            not_allowed(self, "values", "Enum");
        }
        if raw.target.is_some() && logical != LogicalType::ForeignKey {
            not_allowed(self, "target", "ForeignKey");
        }
        if raw.on_delete.is_some() && logical != LogicalType::ForeignKey {
            self.push(
                Issue::warning(
                    IssueCode::OnDeleteIgnored,
                    "on_delete only applies to ForeignKey columns and is ignored",
                )
                .at(here.clone()),
            );
        }

        match logical {
            LogicalType::Integer => Some(ColumnType::Integer),
            LogicalType::Text => Some(ColumnType::Text),
            LogicalType::Boolean => Some(ColumnType::Boolean),
            LogicalType::DateTime => Some(ColumnType::DateTime),
            LogicalType::Date => Some(ColumnType::Date),
            LogicalType::Time => Some(ColumnType::Time),
            LogicalType::Float => Some(ColumnType::Float),
            LogicalType::String => {
                let length = match raw.length {
                    None => {
                        self.push(
                            Issue::warning(
                                IssueCode::StringNoLength,
                                "String column should specify length",
                            )
                            .at(here.clone()),
                        );
                        None
                    }
                    Some(len) => Some(self.positive("length", len, here)?),
                };
                Some(ColumnType::String { length })
            }
            LogicalType::Numeric => {
                let precision = raw.precision.map(|p| self.positive("precision", p, here));
                let scale = raw.scale.map(|s| self.non_negative("scale", s, here));
                if precision == Some(None) || scale == Some(None) {
                    return None;
                }
                let (precision, scale) = (precision.flatten(), scale.flatten());
                if let (Some(p), Some(s)) = (precision, scale)
                    && s > p
                {
                    self.push(
                        Issue::error(
                            IssueCode::InvalidParameter,
                            format!("scale ({s}) cannot exceed precision ({p})"),
                        )
                        .at(here.clone()),
                    );
                    return None;
                }
                Some(ColumnType::Numeric { precision, scale })
            }
            LogicalType::Enum => match &raw.values {
                Some(values) if !values.is_empty() => Some(ColumnType::Enum {
                    values: values.clone(),
                }),
                _ => {
                    self.push(
                        Issue::error(
                            IssueCode::MissingEnumValues,
                            "Enum type requires values to be specified",
                        )
                        .at(here.clone()),
                    );
                    None
                }
            },
            LogicalType::ForeignKey => {
                let target = match raw.target.as_deref() {
                    None | Some("") => {
                        self.push(
                            Issue::error(
                                IssueCode::MissingFkTarget,
                                "ForeignKey type requires target to be specified",
                            )
                            .at(here.clone()),
                        );
                        return None;
                    }
                    Some(t) => match ForeignKeyTarget::parse(t) {
                        Some(target) => target,
                        None => {
                            self.push(
                                Issue::error(
                                    IssueCode::InvalidFkFormat,
                                    format!(
                                        "ForeignKey target '{t}' must be in format 'table_name.column_name'"
                                    ),
                                )
                                .at(here.clone()),
                            );
                            return None;
                        }
                    },
                };
                Some(ColumnType::ForeignKey {
                    target,
                    on_delete: on_delete?,
                })
            }
        }
    }

    fn positive(&mut self, param: &str, value: i64, here: &Location) -> Option<u32> {
        match u32::try_from(value) {
            Ok(v) if v > 0 => Some(v),
            _ => {
                self.push(
                    Issue::error(
                        IssueCode::InvalidParameter,
                        format!("{param} must be a positive integer, got {value}"),
                    )
                    .at(here.clone()),
                );
                None
            }
        }
    }

    fn non_negative(&mut self, param: &str, value: i64, here: &Location) -> Option<u32> {
        match u32::try_from(value) {
            Ok(v) => Some(v),
            Err(_) => {
                self.push(
                    Issue::error(
                        IssueCode::InvalidParameter,
                        format!("{param} must be a non-negative integer, got {value}"),
                    )
                    .at(here.clone()),
                );
                None
            }
        }
    }

    fn relationship(
        &mut self,
        table: &str,
        index: usize,
        raw: RawRelationship,
    ) -> Option<RelationshipDeclaration> {
        let errors_before = self.error_count();
        let target_table = present(raw.target_table);
        let here = Location::Relationship {
            table: table.to_string(),
            target: target_table
                .clone()
                .unwrap_or_else(|| format!("relationships[{index}]")),
        };

        if target_table.is_none() {
            self.push(missing("target_table", here.clone()));
        }
        let target_class = present(raw.target_class);
        if target_class.is_none() {
            self.push(missing("target_class", here.clone()));
        }
        let back_populates = present(raw.back_populates);
        if back_populates.is_none() {
            self.push(missing("back_populates", here.clone()));
        }

        let foreign_key = present(raw.foreign_key);
        let kind = match present(raw.kind) {
            None => {
                self.push(missing("type", here.clone()));
                None
            }
            Some(k) => match RelationshipKind::from_str(&k) {
                Some(kind) => Some(kind),
                None => {
                    self.push(
                        Issue::error(
                            IssueCode::InvalidRelationshipKind,
                            format!("Unknown relationship type '{k}'"),
                        )
                        .at(here.clone()),
                    );
                    None
                }
            },
        };
        if kind == Some(RelationshipKind::ManyToOne) && foreign_key.is_none() {
            self.push(
                Issue::error(
                    IssueCode::MissingFkColumn,
                    "many_to_one relationships require a foreign_key column name",
                )
                .at(here),
            );
        }

        if self.error_count() > errors_before {
            return None;
        }
        Some(RelationshipDeclaration {
            target_table: target_table?,
            target_class: target_class?,
            kind: kind?,
            back_populates: back_populates?,
            foreign_key,
            description: raw.description,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn field(name: &str) -> Location {
    Location::Field {
        field: name.to_string(),
    }
}

fn missing(name: &str, location: Location) -> Issue {
    Issue::error(IssueCode::MissingField, format!("Missing required field '{name}'")).at(location)
}

/// Non-empty once underscores are removed, and otherwise alphanumeric.
fn is_identifier(s: &str) -> bool {
    s.chars().any(|c| c != '_') && s.chars().all(|c| c == '_' || c.is_alphanumeric())
}

fn is_table_name(s: &str) -> bool {
    is_identifier(s) && s.chars().any(char::is_lowercase) && !s.chars().any(char::is_uppercase)
}

fn is_class_name(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_uppercase) && is_identifier(s)
}

fn is_project_name(s: &str) -> bool {
    s.chars().any(|c| c != '_' && c != '-')
        && s.chars().all(|c| c == '_' || c == '-' || c.is_alphanumeric())
}
