//! Schema documents shared by the unit tests.

use serde_json::json;

pub const SIMPLE: &str = r#"{
    "project_name": "TestProject",
    "db_type": "postgresql",
    "schema": [
        {
            "table_name": "users",
            "class_name": "User",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "username", "type": "String", "length": 50},
                {"name": "email", "type": "String", "length": 100}
            ]
        }
    ]
}"#;

pub const BLOG: &str = r#"{
    "project_name": "blog",
    "db_type": "postgresql",
    "description": "A small blog",
    "schema": [
        {
            "table_name": "users",
            "class_name": "User",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "autoincrement": true, "nullable": false},
                {"name": "email", "type": "String", "length": 255, "unique": true, "index": true, "nullable": false},
                {"name": "is_active", "type": "Boolean", "default": true},
                {"name": "role", "type": "Enum", "values": ["admin", "member"], "default": "member"}
            ],
            "relationships": [
                {"target_table": "posts", "target_class": "Post", "type": "one_to_many", "back_populates": "author"}
            ]
        },
        {
            "table_name": "posts",
            "class_name": "Post",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "autoincrement": true, "nullable": false},
                {"name": "title", "type": "String", "length": 200, "nullable": false},
                {"name": "content", "type": "Text"},
                {"name": "author_id", "type": "ForeignKey", "target": "users.id", "on_delete": "CASCADE", "nullable": false}
            ],
            "relationships": [
                {"target_table": "users", "target_class": "User", "type": "many_to_one", "back_populates": "author", "foreign_key": "author_id"}
            ]
        }
    ]
}"#;

pub const CIRCULAR: &str = r#"{
    "project_name": "circular",
    "db_type": "sqlite",
    "schema": [
        {
            "table_name": "table_a",
            "class_name": "TableA",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "b_id", "type": "ForeignKey", "target": "table_b.id"}
            ]
        },
        {
            "table_name": "table_b",
            "class_name": "TableB",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "a_id", "type": "ForeignKey", "target": "table_a.id"}
            ]
        }
    ]
}"#;

pub const NO_PRIMARY_KEY: &str = r#"{
    "project_name": "nopk",
    "db_type": "mysql",
    "schema": [
        {
            "table_name": "logs",
            "class_name": "Log",
            "columns": [
                {"name": "message", "type": "Text"}
            ]
        }
    ]
}"#;

pub const BAD_FK_COLUMN: &str = r#"{
    "project_name": "badfk",
    "db_type": "postgresql",
    "schema": [
        {
            "table_name": "users",
            "class_name": "User",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false}
            ]
        },
        {
            "table_name": "posts",
            "class_name": "Post",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "author_id", "type": "ForeignKey", "target": "users.uid"}
            ]
        }
    ]
}"#;

pub const SELF_REFERENCE: &str = r#"{
    "project_name": "company",
    "db_type": "postgresql",
    "schema": [
        {
            "table_name": "employees",
            "class_name": "Employee",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "name", "type": "String", "length": 100, "nullable": false},
                {"name": "manager_id", "type": "ForeignKey", "target": "employees.id", "on_delete": "SET NULL"}
            ],
            "relationships": [
                {"target_table": "employees", "target_class": "Employee", "type": "many_to_one", "back_populates": "manager", "foreign_key": "manager_id"}
            ]
        }
    ]
}"#;

pub const COMPOSITE_KEY: &str = r#"{
    "project_name": "tags",
    "db_type": "sqlite",
    "schema": [
        {
            "table_name": "post_tags",
            "class_name": "PostTag",
            "columns": [
                {"name": "post_id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "tag_id", "type": "Integer", "primary_key": true, "nullable": false}
            ]
        }
    ]
}"#;

pub const MIXINS: &str = r#"{
    "project_name": "news",
    "db_type": "mysql",
    "schema": [
        {
            "table_name": "articles",
            "class_name": "Article",
            "options": {"use_timestamps": true, "use_soft_delete": true},
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "title", "type": "String", "length": 200},
                {"name": "created_at", "type": "DateTime"},
                {"name": "published_at", "type": "DateTime"},
                {"name": "is_deleted", "type": "Boolean"}
            ]
        }
    ]
}"#;

/// Triggers one note of each kind, declared in reverse kind order.
pub const NOTES: &str = r#"{
    "project_name": "notes",
    "db_type": "postgresql",
    "schema": [
        {
            "table_name": "tags",
            "class_name": "Tag",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false}
            ],
            "relationships": [
                {"target_table": "employees", "target_class": "Employee", "type": "many_to_many", "back_populates": "tags"}
            ]
        },
        {
            "table_name": "employees",
            "class_name": "Employee",
            "columns": [
                {"name": "id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "manager_id", "type": "ForeignKey", "target": "employees.id"}
            ],
            "relationships": [
                {"target_table": "employees", "target_class": "Employee", "type": "many_to_one", "back_populates": "manager", "foreign_key": "manager_id"}
            ]
        },
        {
            "table_name": "post_tags",
            "class_name": "PostTag",
            "columns": [
                {"name": "post_id", "type": "Integer", "primary_key": true, "nullable": false},
                {"name": "tag_id", "type": "Integer", "primary_key": true, "nullable": false}
            ]
        }
    ]
}"#;

pub const INVALID_JSON: &str = r#"{"project_name": "Test", "schema": [}"#;

/// Tables with an `id` key and an optional `parent_id` into another table.
pub fn chain(tables: &[(&str, Option<&str>)]) -> String {
    let schema: Vec<_> = tables
        .iter()
        .map(|(name, parent)| {
            let mut columns = vec![json!({
                "name": "id", "type": "Integer", "primary_key": true, "nullable": false
            })];
            if let Some(parent) = parent {
                columns.push(json!({
                    "name": "parent_id", "type": "ForeignKey", "target": format!("{parent}.id")
                }));
            }
            json!({
                "table_name": name,
                "class_name": class_name(name),
                "columns": columns,
            })
        })
        .collect();
    json!({
        "project_name": "chain",
        "db_type": "sqlite",
        "schema": schema,
    })
    .to_string()
}

fn class_name(table: &str) -> String {
    table
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}
