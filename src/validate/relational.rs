//! Cross-table reference checks on a structurally valid schema.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::report::{Issue, IssueCode, Location, ValidationReport};
use crate::schema::{ProjectSchema, TableDeclaration};

const STAGE: &str = "Relational validation";

/// Outcome of the relational checks.
///
/// `foreign_keys` maps each table that has resolvable references to
/// `"column -> table.column"` entries in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyValidation {
    pub valid: bool,
    pub foreign_keys: BTreeMap<String, Vec<String>>,
    pub issues: Vec<Issue>,
}

impl ForeignKeyValidation {
    pub fn report(&self) -> ValidationReport {
        ValidationReport::from_issues(STAGE, self.issues.clone())
    }
}

pub fn validate_references(schema: &ProjectSchema) -> ForeignKeyValidation {
    let tables: HashMap<&str, &TableDeclaration> = schema
        .tables
        .iter()
        .map(|t| (t.table_name.as_str(), t))
        .collect();

    let mut issues = Vec::new();
    let mut foreign_keys = BTreeMap::new();

    for table in &schema.tables {
        let mut resolved = Vec::new();
        for (column, target) in table.foreign_keys() {
            let Some(target_table) = tables.get(target.table.as_str()) else {
                issues.push(
                    Issue::error(
                        IssueCode::FkTableNotFound,
                        format!("Foreign key references non-existent table: {}", target.table),
                    )
                    .at(Location::Column {
                        table: table.table_name.clone(),
                        column: column.name.clone(),
                    }),
                );
                continue;
            };

            let here = Location::ForeignKey {
                table: table.table_name.clone(),
                column: column.name.clone(),
                target: target.to_string(),
            };
            let Some(target_column) = target_table.column(&target.column) else {
                issues.push(
                    Issue::error(
                        IssueCode::FkColumnNotFound,
                        format!("Foreign key references non-existent column: {}", target.column),
                    )
                    .at(here),
                );
                continue;
            };

            if !target_column.flags.primary_key && !target_column.flags.unique {
                issues.push(
                    Issue::warning(
                        IssueCode::FkNotPkOrUnique,
                        "Foreign key references column that is not primary key or unique",
                    )
                    .at(here),
                );
            }
            resolved.push(format!("{} -> {}", column.name, target));
        }
        if !resolved.is_empty() {
            debug!(table = %table.table_name, count = resolved.len(), "foreign keys resolved");
            foreign_keys.insert(table.table_name.clone(), resolved);
        }
    }

    for table in &schema.tables {
        for rel in &table.relationships {
            let here = Location::Relationship {
                table: table.table_name.clone(),
                target: rel.target_table.clone(),
            };
            let Some(target) = tables.get(rel.target_table.as_str()) else {
                issues.push(
                    Issue::error(
                        IssueCode::RelTableNotFound,
                        format!(
                            "Relationship references non-existent table: {}",
                            rel.target_table
                        ),
                    )
                    .at(here),
                );
                continue;
            };
            if !is_reciprocated(table, target) {
                issues.push(
                    Issue::warning(
                        IssueCode::MissingBackPopulates,
                        "Relationship may be missing back_populates on target table",
                    )
                    .at(here),
                );
            }
        }
    }

    let valid = !issues.iter().any(Issue::is_error);
    info!(
        valid,
        tables_with_fks = foreign_keys.len(),
        issues = issues.len(),
        "relational validation complete"
    );
    ForeignKeyValidation {
        valid,
        foreign_keys,
        issues,
    }
}

/// `target` points back at `table` under `table`'s lowercased name.
fn is_reciprocated(table: &TableDeclaration, target: &TableDeclaration) -> bool {
    let own = table.table_name.to_lowercase();
    target
        .relationships
        .iter()
        .any(|r| r.target_table == table.table_name && r.back_populates == own)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::fixtures;
    use crate::validate::StructuralValidator;

    fn schema(input: &str) -> ProjectSchema {
        let config = Config::default();
        let outcome = StructuralValidator::new(&config).validate_str(input);
        outcome.schema.unwrap()
    }

    #[test]
    fn test_blog_references_resolve() {
        let result = validate_references(&schema(fixtures::BLOG));
        assert!(result.valid, "{:?}", result.issues);
        assert_eq!(
            result.foreign_keys.get("posts").unwrap(),
            &vec!["author_id -> users.id".to_string()]
        );
        assert!(!result.foreign_keys.contains_key("users"));
    }

    #[test]
    fn test_missing_target_column() {
        let result = validate_references(&schema(fixtures::BAD_FK_COLUMN));
        assert!(!result.valid);
        let issue = &result.issues[0];
        assert_eq!(issue.code, IssueCode::FkColumnNotFound);
        assert_eq!(
            issue.location,
            Some(Location::ForeignKey {
                table: "posts".into(),
                column: "author_id".into(),
                target: "users.uid".into(),
            })
        );
        assert!(result.foreign_keys.is_empty());
    }

    #[test]
    fn test_missing_target_table() {
        let result = validate_references(&schema(
            r#"{
                "project_name": "p", "db_type": "sqlite",
                "schema": [{
                    "table_name": "posts", "class_name": "Post",
                    "columns": [
                        {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                        {"name": "author_id", "type": "ForeignKey", "target": "authors.id"}
                    ],
                    "relationships": [
                        {"target_table": "authors", "target_class": "Author", "type": "many_to_one",
                         "back_populates": "posts", "foreign_key": "author_id"}
                    ]
                }]
            }"#,
        ));
        let codes: Vec<IssueCode> = result.issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![IssueCode::FkTableNotFound, IssueCode::RelTableNotFound]
        );
    }

    #[test]
    fn test_reference_to_plain_column_warns() {
        let result = validate_references(&schema(
            r#"{
                "project_name": "p", "db_type": "sqlite",
                "schema": [
                    {"table_name": "users", "class_name": "User", "columns": [
                        {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                        {"name": "email", "type": "String", "length": 255}
                    ]},
                    {"table_name": "logins", "class_name": "Login", "columns": [
                        {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                        {"name": "user_email", "type": "ForeignKey", "target": "users.email"}
                    ]}
                ]
            }"#,
        ));
        assert!(result.valid);
        assert_eq!(result.issues[0].code, IssueCode::FkNotPkOrUnique);
        assert_eq!(
            result.foreign_keys.get("logins").unwrap(),
            &vec!["user_email -> users.email".to_string()]
        );
    }

    #[test]
    fn test_reciprocal_rule_uses_lowercased_table_name() {
        // posts points back with back_populates "users", users points back with "author"
        let result = validate_references(&schema(
            r#"{
                "project_name": "p", "db_type": "sqlite",
                "schema": [
                    {"table_name": "users", "class_name": "User",
                     "columns": [{"name": "id", "type": "Integer", "primary_key": true, "nullable": false}],
                     "relationships": [{"target_table": "posts", "target_class": "Post",
                                        "type": "one_to_many", "back_populates": "author"}]},
                    {"table_name": "posts", "class_name": "Post",
                     "columns": [
                        {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                        {"name": "user_id", "type": "ForeignKey", "target": "users.id"}],
                     "relationships": [{"target_table": "users", "target_class": "User",
                                        "type": "many_to_one", "back_populates": "users",
                                        "foreign_key": "user_id"}]}
                ]
            }"#,
        ));
        assert!(result.valid);
        let missing: Vec<&Location> = result
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::MissingBackPopulates)
            .filter_map(|i| i.location.as_ref())
            .collect();
        assert_eq!(
            missing,
            vec![&Location::Relationship {
                table: "posts".into(),
                target: "users".into()
            }]
        );
    }

    #[test]
    fn test_report_summary() {
        let result = validate_references(&schema(fixtures::BAD_FK_COLUMN));
        let report = result.report();
        assert!(!report.valid);
        assert!(report.summary.starts_with("Relational validation failed"));
    }
}
