//! Logical column type to target type mapping.

use crate::ir::{ColumnKwargs, ColumnSpec, ForeignKeySpec, TargetType, TypeArg};
use crate::schema::{ColumnDeclaration, ColumnType};

/// Target type and positional arguments for a logical type.
///
/// Foreign keys become plain integers; their reference travels separately
/// as [`ForeignKeySpec`].
pub fn map_type(column_name: &str, column_type: &ColumnType) -> (TargetType, Vec<TypeArg>) {
    match column_type {
        ColumnType::Integer => (TargetType::Integer, vec![]),
        ColumnType::String { length } => (
            TargetType::String,
            length.iter().map(|&n| TypeArg::Int(n)).collect(),
        ),
        ColumnType::Text => (TargetType::Text, vec![]),
        ColumnType::Boolean => (TargetType::Boolean, vec![]),
        ColumnType::DateTime => (TargetType::DateTime, vec![]),
        ColumnType::Date => (TargetType::Date, vec![]),
        ColumnType::Time => (TargetType::Time, vec![]),
        ColumnType::Float => (TargetType::Float, vec![]),
        ColumnType::Numeric { precision, scale } => (
            TargetType::Numeric,
            precision
                .iter()
                .chain(scale.iter())
                .map(|&n| TypeArg::Int(n))
                .collect(),
        ),
        ColumnType::Enum { values } => {
            let mut args: Vec<TypeArg> = values.iter().cloned().map(TypeArg::Str).collect();
            args.push(TypeArg::Keyword {
                name: "name".to_string(),
                value: format!("{column_name}_enum"),
            });
            (TargetType::Enum, args)
        }
        ColumnType::ForeignKey { .. } => (TargetType::Integer, vec![]),
    }
}

pub fn resolve_column(column: &ColumnDeclaration) -> ColumnSpec {
    let (target_type, args) = map_type(&column.name, &column.column_type);
    let flags = column.flags;

    let foreign_key = match &column.column_type {
        ColumnType::ForeignKey { target, on_delete } => Some(ForeignKeySpec {
            target: target.to_string(),
            on_delete: *on_delete,
        }),
        _ => None,
    };

    let nullable = if foreign_key.is_some() {
        Some(flags.nullable)
    } else if !flags.nullable {
        Some(false)
    } else {
        None
    };

    ColumnSpec {
        name: column.name.clone(),
        target_type,
        args,
        kwargs: ColumnKwargs {
            primary_key: flags.primary_key,
            autoincrement: flags.autoincrement,
            unique: flags.unique,
            index: flags.index,
            nullable,
            default: column.default.clone(),
        },
        foreign_key,
        description: column.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnFlags, ForeignKeyTarget, OnDelete};

    fn column(name: &str, column_type: ColumnType) -> ColumnDeclaration {
        ColumnDeclaration {
            name: name.to_string(),
            column_type,
            flags: ColumnFlags::default(),
            default: None,
            description: None,
        }
    }

    #[test]
    fn test_string_length() {
        let (t, args) = map_type("title", &ColumnType::String { length: Some(200) });
        assert_eq!(t, TargetType::String);
        assert_eq!(args, vec![TypeArg::Int(200)]);

        let (_, args) = map_type("title", &ColumnType::String { length: None });
        assert!(args.is_empty());
    }

    #[test]
    fn test_numeric_args_as_given() {
        let (t, args) = map_type(
            "price",
            &ColumnType::Numeric {
                precision: Some(10),
                scale: Some(2),
            },
        );
        assert_eq!(t, TargetType::Numeric);
        assert_eq!(args, vec![TypeArg::Int(10), TypeArg::Int(2)]);
    }

    #[test]
    fn test_enum_gets_synthesized_name() {
        let (t, args) = map_type(
            "status",
            &ColumnType::Enum {
                values: vec!["draft".into(), "published".into()],
            },
        );
        assert_eq!(t, TargetType::Enum);
        assert_eq!(
            args,
            vec![
                TypeArg::Str("draft".into()),
                TypeArg::Str("published".into()),
                TypeArg::Keyword {
                    name: "name".into(),
                    value: "status_enum".into()
                },
            ]
        );
    }

    #[test]
    fn test_foreign_key_becomes_integer() {
        let spec = resolve_column(&column(
            "author_id",
            ColumnType::ForeignKey {
                target: ForeignKeyTarget::parse("users.id").unwrap(),
                on_delete: OnDelete::default(),
            },
        ));
        assert_eq!(spec.target_type, TargetType::Integer);
        assert!(spec.args.is_empty());
        assert_eq!(
            spec.foreign_key,
            Some(ForeignKeySpec {
                target: "users.id".into(),
                on_delete: OnDelete::NoAction
            })
        );
        // nullability is always stated for foreign keys
        assert_eq!(spec.kwargs.nullable, Some(true));
    }

    #[test]
    fn test_kwargs_only_when_not_default() {
        let spec = resolve_column(&column("bio", ColumnType::Text));
        assert_eq!(spec.kwargs, ColumnKwargs::default());

        let mut id = column("id", ColumnType::Integer);
        id.flags.primary_key = true;
        id.flags.nullable = false;
        id.default = Some(serde_json::json!(0));
        let spec = resolve_column(&id);
        assert!(spec.kwargs.primary_key);
        assert_eq!(spec.kwargs.nullable, Some(false));
        assert_eq!(spec.kwargs.default, Some(serde_json::json!(0)));
        assert!(spec.foreign_key.is_none());
    }
}
