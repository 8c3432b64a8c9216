//! Stage sequencing.
//!
//! Structural validation runs first and gates everything. Relational and
//! dependency checks both run on a structurally valid schema and must both
//! pass before planning. Each run returns everything produced so far.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::emit::{Emitter, Formatter, GenerationOutput, Renderer};
use crate::graph::{self, DependencyAnalysis};
use crate::ir::ArchitecturePlan;
use crate::planner::{PlanAdvisor, Planner};
use crate::report::ValidationReport;
use crate::validate::{ForeignKeyValidation, StructuralOutcome, StructuralValidator, validate_references};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Structural,
    Relational,
    Dependency,
    Planning,
    Emission,
}

/// How far a run goes when every check passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Validators only.
    Check,
    /// Validators and planning.
    Plan,
    #[default]
    Generate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Last stage that ran.
    pub stage: Stage,
    /// Every stage that ran passed and produced its artifact.
    pub success: bool,
    pub structural: ValidationReport,
    pub relational: Option<ForeignKeyValidation>,
    pub dependencies: Option<DependencyAnalysis>,
    pub plan: Option<ArchitecturePlan>,
    pub output: Option<GenerationOutput>,
    /// A broken precondition between stages. Never caused by the schema itself.
    pub internal_error: Option<String>,
}

impl PipelineRun {
    fn new(structural: ValidationReport) -> Self {
        Self {
            stage: Stage::Structural,
            success: false,
            structural,
            relational: None,
            dependencies: None,
            plan: None,
            output: None,
            internal_error: None,
        }
    }

    /// Validation reports of every stage that ran, in stage order.
    pub fn reports(&self) -> Vec<ValidationReport> {
        let mut reports = vec![self.structural.clone()];
        if let Some(relational) = &self.relational {
            reports.push(relational.report());
        }
        if let Some(dependencies) = &self.dependencies {
            reports.push(dependencies.report());
        }
        reports
    }

    pub fn is_valid(&self) -> bool {
        self.structural.valid
            && self.relational.as_ref().is_some_and(|r| r.valid)
            && self.dependencies.as_ref().is_some_and(|d| d.valid)
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    renderer: &'a dyn Renderer,
    formatter: Option<&'a dyn Formatter>,
    advisor: Option<&'a dyn PlanAdvisor>,
    mode: RunMode,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, renderer: &'a dyn Renderer) -> Self {
        Self {
            config,
            renderer,
            formatter: None,
            advisor: None,
            mode: RunMode::default(),
        }
    }

    pub fn with_formatter(mut self, formatter: &'a dyn Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_advisor(mut self, advisor: &'a dyn PlanAdvisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn run_str(&self, input: &str) -> PipelineRun {
        self.run(StructuralValidator::new(self.config).validate_str(input))
    }

    pub fn run_value(&self, input: Value) -> PipelineRun {
        self.run(StructuralValidator::new(self.config).validate_value(input))
    }

    fn run(&self, outcome: StructuralOutcome) -> PipelineRun {
        let mut run = PipelineRun::new(outcome.report);
        let Some(schema) = outcome.schema else {
            warn!("structural validation failed, skipping remaining stages");
            return run;
        };

        let relational = validate_references(&schema);
        run.stage = Stage::Relational;
        let dependencies = graph::resolve(&schema);
        run.stage = Stage::Dependency;

        if let Some(issue) = dependencies.internal_error() {
            run.internal_error = Some(issue.message.clone());
        }
        let passed = relational.valid && dependencies.valid;
        let build_order = dependencies.build_order.clone();
        run.relational = Some(relational);
        run.dependencies = Some(dependencies);

        if !passed {
            warn!("validation failed, skipping planning");
            return run;
        }
        if self.mode == RunMode::Check {
            run.success = true;
            return run;
        }

        let mut planner = Planner::new(self.config);
        if let Some(advisor) = self.advisor {
            planner = planner.with_advisor(advisor);
        }
        let plan = match planner.plan(&schema, &build_order) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "planning aborted");
                run.internal_error = Some(e.to_string());
                return run;
            }
        };
        run.stage = Stage::Planning;

        if self.mode == RunMode::Generate {
            let mut emitter = Emitter::new(self.renderer);
            if let Some(formatter) = self.formatter {
                emitter = emitter.with_formatter(formatter);
            }
            let output = emitter.emit(&plan);
            run.stage = Stage::Emission;
            run.success = output.is_complete();
            run.output = Some(output);
        } else {
            run.success = true;
        }
        run.plan = Some(plan);

        info!(stage = ?run.stage, success = run.success, "pipeline finished");
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{SqlAlchemyRenderer, WhitespaceFormatter};
    use crate::fixtures;
    use crate::report::IssueCode;

    fn run(input: &str, mode: RunMode) -> PipelineRun {
        let config = Config::default();
        let renderer = SqlAlchemyRenderer;
        let formatter = WhitespaceFormatter;
        Pipeline::new(&config, &renderer)
            .with_formatter(&formatter)
            .with_mode(mode)
            .run_str(input)
    }

    #[test]
    fn test_generate_blog() {
        let run = run(fixtures::BLOG, RunMode::Generate);
        assert!(run.success);
        assert!(run.is_valid());
        assert_eq!(run.stage, Stage::Emission);
        assert!(run.internal_error.is_none());
        let output = run.output.unwrap();
        assert_eq!(output.summary.files, 4);
        assert_eq!(output.summary.models, 2);
        assert_eq!(output.summary.columns, 8);
        assert_eq!(output.summary.relationships, 2);
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);
        assert!(output.files.values().all(|text| text.ends_with('\n')));
    }

    #[test]
    fn test_invalid_json_stops_at_structural() {
        let run = run(fixtures::INVALID_JSON, RunMode::Generate);
        assert!(!run.success);
        assert_eq!(run.stage, Stage::Structural);
        assert!(run.structural.has_code(IssueCode::JsonSyntaxError));
        assert!(run.relational.is_none());
        assert!(run.dependencies.is_none());
        assert_eq!(run.reports().len(), 1);
    }

    #[test]
    fn test_cycle_stops_before_planning() {
        let run = run(fixtures::CIRCULAR, RunMode::Generate);
        assert!(!run.success);
        assert_eq!(run.stage, Stage::Dependency);
        let dependencies = run.dependencies.as_ref().unwrap();
        assert!(!dependencies.valid);
        assert!(dependencies.build_order.is_empty());
        // relational checks still ran and passed
        assert!(run.relational.as_ref().unwrap().valid);
        assert!(run.plan.is_none());
        assert!(run.internal_error.is_none());
    }

    #[test]
    fn test_bad_reference_stops_before_planning() {
        let run = run(fixtures::BAD_FK_COLUMN, RunMode::Generate);
        assert!(!run.success);
        assert!(!run.relational.as_ref().unwrap().valid);
        assert!(run.dependencies.as_ref().unwrap().valid);
        assert!(run.plan.is_none());
    }

    #[test]
    fn test_modes() {
        let checked = run(fixtures::BLOG, RunMode::Check);
        assert!(checked.success);
        assert_eq!(checked.stage, Stage::Dependency);
        assert!(checked.plan.is_none());

        let planned = run(fixtures::BLOG, RunMode::Plan);
        assert!(planned.success);
        assert_eq!(planned.stage, Stage::Planning);
        assert!(planned.plan.is_some());
        assert!(planned.output.is_none());
    }

    #[test]
    fn test_run_value_matches_run_str() {
        let config = Config::default();
        let renderer = SqlAlchemyRenderer;
        let pipeline = Pipeline::new(&config, &renderer);
        let value: Value = serde_json::from_str(fixtures::SELF_REFERENCE).unwrap();
        assert_eq!(pipeline.run_value(value), pipeline.run_str(fixtures::SELF_REFERENCE));
    }

    #[test]
    fn test_run_serializes() {
        let run = run(fixtures::BLOG, RunMode::Plan);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["stage"], "planning");
        assert_eq!(json["plan"]["build_order"], serde_json::json!(["users", "posts"]));
        let back: PipelineRun = serde_json::from_value(json).unwrap();
        assert_eq!(back, run);
    }
}
