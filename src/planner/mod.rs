//! Architecture planner: validated schema plus build order to [`ArchitecturePlan`].

pub mod imports;
pub mod types;

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::config::{Config, OutputLayout};
use crate::ir::{
    ArchitecturePlan, MixinKind, ModelPlan, NoteKind, PlanNote, ProjectMetadata,
    RelationshipSpec,
};
use crate::schema::{ProjectSchema, RelationshipDeclaration, RelationshipKind, TableDeclaration};

/// Root class every model inherits from.
pub const ROOT_BASE: &str = "Base";

/// Broken planner preconditions. These point at a defect upstream, never at
/// the schema author.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("Build order has {found} entries for {expected} tables")]
    OrderLength { expected: usize, found: usize },
    #[error("Build order names unknown table '{0}'")]
    UnknownTable(String),
    #[error("Build order lists table '{0}' more than once")]
    DuplicateTable(String),
}

/// Optional source of extra advisory notes.
///
/// An advisor sees the finished plan and may only contribute notes.
pub trait PlanAdvisor {
    fn advise(&self, plan: &ArchitecturePlan) -> Vec<String>;
}

pub struct Planner<'a> {
    layout: &'a OutputLayout,
    advisor: Option<&'a dyn PlanAdvisor>,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            layout: &config.output,
            advisor: None,
        }
    }

    pub fn with_advisor(mut self, advisor: &'a dyn PlanAdvisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn plan(
        &self,
        schema: &ProjectSchema,
        build_order: &[String],
    ) -> Result<ArchitecturePlan, PlanError> {
        check_order(schema, build_order)?;

        let models: Vec<ModelPlan> = schema.tables.iter().map(|t| self.plan_model(t)).collect();
        let notes = collect_notes(&models);

        let mut plan = ArchitecturePlan {
            project: ProjectMetadata {
                project_name: schema.project_name.clone(),
                engine: schema.engine,
                description: schema.description.clone(),
            },
            build_order: build_order.to_vec(),
            models,
            output: self.layout.clone(),
            notes,
        };

        if let Some(advisor) = self.advisor {
            let extra = advisor.advise(&plan);
            debug!(count = extra.len(), "advisor notes");
            plan.notes.extend(extra.into_iter().map(|message| PlanNote {
                kind: NoteKind::Advisory,
                table: String::new(),
                message,
            }));
        }

        info!(
            models = plan.models.len(),
            columns = plan.total_columns(),
            relationships = plan.total_relationships(),
            notes = plan.notes.len(),
            "architecture plan complete"
        );
        Ok(plan)
    }

    fn plan_model(&self, table: &TableDeclaration) -> ModelPlan {
        let mut mixins = Vec::new();
        if table.options.use_timestamps {
            mixins.push(MixinKind::Timestamp);
        }
        if table.options.use_soft_delete {
            mixins.push(MixinKind::SoftDelete);
        }

        let mut bases = vec![ROOT_BASE.to_string()];
        bases.extend(mixins.iter().map(|m| m.class_name().to_string()));

        let covered: HashSet<&str> = mixins.iter().flat_map(|m| m.columns()).copied().collect();
        let columns: Vec<_> = table
            .columns
            .iter()
            .filter(|c| !covered.contains(c.name.as_str()))
            .map(types::resolve_column)
            .collect();

        let relationships: Vec<RelationshipSpec> =
            table.relationships.iter().map(resolve_relationship).collect();

        let depends_on: Vec<String> = table
            .foreign_keys()
            .map(|(_, target)| target.table.as_str())
            .filter(|t| *t != table.table_name)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let imports = imports::compute(&columns, &relationships, &mixins, self.layout);
        debug!(
            table = %table.table_name,
            columns = columns.len(),
            skipped = table.columns.len() - columns.len(),
            "model planned"
        );

        ModelPlan {
            table_name: table.table_name.clone(),
            class_name: table.class_name.clone(),
            file_path: self.layout.model_path(&table.table_name),
            description: table.description.clone(),
            bases,
            mixins,
            columns,
            relationships,
            imports,
            depends_on,
        }
    }
}

fn resolve_relationship(rel: &RelationshipDeclaration) -> RelationshipSpec {
    let attribute = match rel.kind {
        RelationshipKind::ManyToOne => rel.back_populates.clone(),
        RelationshipKind::OneToMany | RelationshipKind::ManyToMany => rel.target_table.clone(),
    };
    RelationshipSpec {
        attribute,
        target_class: rel.target_class.clone(),
        kind: rel.kind,
        back_populates: rel.back_populates.clone(),
        foreign_key: rel.foreign_key.clone(),
        description: rel.description.clone(),
    }
}

/// The build order must be a permutation of the declared tables.
fn check_order(schema: &ProjectSchema, build_order: &[String]) -> Result<(), PlanError> {
    if build_order.len() != schema.tables.len() {
        return Err(PlanError::OrderLength {
            expected: schema.tables.len(),
            found: build_order.len(),
        });
    }
    let mut seen = HashSet::new();
    for name in build_order {
        if schema.table(name).is_none() {
            return Err(PlanError::UnknownTable(name.clone()));
        }
        if !seen.insert(name.as_str()) {
            return Err(PlanError::DuplicateTable(name.clone()));
        }
    }
    Ok(())
}

/// Composite keys, then self references, then many-to-many.
fn collect_notes(models: &[ModelPlan]) -> Vec<PlanNote> {
    let mut notes = Vec::new();

    for model in models {
        let keys: Vec<&str> = model
            .columns
            .iter()
            .filter(|c| c.kwargs.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        if keys.len() > 1 {
            notes.push(PlanNote {
                kind: NoteKind::CompositeKey,
                table: model.table_name.clone(),
                message: format!(
                    "{} has composite primary key: {}",
                    model.class_name,
                    keys.join(", ")
                ),
            });
        }
    }

    for model in models {
        for rel in &model.relationships {
            if rel.target_class == model.class_name {
                notes.push(PlanNote {
                    kind: NoteKind::SelfReference,
                    table: model.table_name.clone(),
                    message: format!(
                        "{} has self-referential relationship: {}",
                        model.class_name, rel.attribute
                    ),
                });
            }
        }
    }

    for model in models {
        for rel in &model.relationships {
            if rel.kind == RelationshipKind::ManyToMany {
                notes.push(PlanNote {
                    kind: NoteKind::ManyToMany,
                    table: model.table_name.clone(),
                    message: format!(
                        "{} has many-to-many relationship with {} - association table may be needed",
                        model.class_name, rel.target_class
                    ),
                });
            }
        }
    }

    notes
}
