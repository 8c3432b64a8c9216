use std::collections::{BTreeMap, BTreeSet};

use crate::config::OutputLayout;
use crate::ir::{ColumnSpec, ImportStatement, MixinKind, RelationshipSpec, TargetType};

/// Minimal import set for one model file, sorted by module then item.
pub fn compute(
    columns: &[ColumnSpec],
    relationships: &[RelationshipSpec],
    mixins: &[MixinKind],
    layout: &OutputLayout,
) -> Vec<ImportStatement> {
    let mut modules: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    let orm = modules.entry("sqlalchemy".to_string()).or_default();
    orm.insert("Column".to_string());
    for column in columns {
        orm.insert(column.target_type.as_str().to_string());
        if column.foreign_key.is_some() {
            orm.insert("ForeignKey".to_string());
        }
    }

    if !relationships.is_empty() {
        modules
            .entry("sqlalchemy.orm".to_string())
            .or_default()
            .insert("relationship".to_string());
    }

    modules
        .entry(layout.base_module())
        .or_default()
        .insert("Base".to_string());

    if !mixins.is_empty() {
        let entry = modules.entry(layout.mixins_module()).or_default();
        for mixin in mixins {
            entry.insert(mixin.class_name().to_string());
        }
    }

    let has_datetime = columns
        .iter()
        .any(|c| c.target_type == TargetType::DateTime);
    if has_datetime && !mixins.contains(&MixinKind::Timestamp) {
        modules
            .entry("datetime".to_string())
            .or_default()
            .insert("datetime".to_string());
    }

    modules
        .into_iter()
        .map(|(module, items)| ImportStatement {
            module,
            items: items.into_iter().collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ColumnKwargs, ForeignKeySpec};
    use crate::schema::{OnDelete, RelationshipKind};

    fn column(name: &str, target_type: TargetType, fk: bool) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            target_type,
            args: vec![],
            kwargs: ColumnKwargs::default(),
            foreign_key: fk.then(|| ForeignKeySpec {
                target: "users.id".into(),
                on_delete: OnDelete::NoAction,
            }),
            description: None,
        }
    }

    fn modules(imports: &[ImportStatement]) -> Vec<&str> {
        imports.iter().map(|i| i.module.as_str()).collect()
    }

    #[test]
    fn test_minimal_imports() {
        let imports = compute(
            &[column("id", TargetType::Integer, false)],
            &[],
            &[],
            &OutputLayout::default(),
        );
        assert_eq!(modules(&imports), vec!["app.core.database", "sqlalchemy"]);
        assert_eq!(imports[1].items, vec!["Column", "Integer"]);
    }

    #[test]
    fn test_foreign_key_and_relationship_imports() {
        let rel = RelationshipSpec {
            attribute: "author".into(),
            target_class: "User".into(),
            kind: RelationshipKind::ManyToOne,
            back_populates: "author".into(),
            foreign_key: Some("author_id".into()),
            description: None,
        };
        let imports = compute(
            &[
                column("id", TargetType::Integer, false),
                column("title", TargetType::String, false),
                column("author_id", TargetType::Integer, true),
            ],
            &[rel],
            &[],
            &OutputLayout::default(),
        );
        assert_eq!(
            modules(&imports),
            vec!["app.core.database", "sqlalchemy", "sqlalchemy.orm"]
        );
        assert_eq!(
            imports[1].items,
            vec!["Column", "ForeignKey", "Integer", "String"]
        );
        assert_eq!(imports[2].items, vec!["relationship"]);
    }

    #[test]
    fn test_datetime_import_depends_on_timestamp_mixin() {
        let columns = [column("published_at", TargetType::DateTime, false)];
        let layout = OutputLayout::default();

        let plain = compute(&columns, &[], &[], &layout);
        assert!(plain.iter().any(|i| i.module == "datetime"));

        let with_mixins = compute(
            &columns,
            &[],
            &[MixinKind::Timestamp, MixinKind::SoftDelete],
            &layout,
        );
        assert!(!with_mixins.iter().any(|i| i.module == "datetime"));
        let mixins = with_mixins
            .iter()
            .find(|i| i.module == "app.models.mixins")
            .unwrap();
        assert_eq!(mixins.items, vec!["SoftDeleteMixin", "TimestampMixin"]);
    }
}
