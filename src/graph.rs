//! Table dependency graph, cycle search and build order.
//!
//! Tables are nodes indexed by declaration position. An edge `a -> b` means
//! `a` holds a foreign key into `b`, so `b` has to be built first.
//! Self references never become edges.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::report::{Issue, IssueCode, ValidationReport};
use crate::schema::ProjectSchema;

const STAGE: &str = "Dependency analysis";

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    names: Vec<String>,
    /// Outgoing edges per node, sorted by target name.
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub fn from_schema(schema: &ProjectSchema) -> Self {
        let names: Vec<String> = schema.tables.iter().map(|t| t.table_name.clone()).collect();
        let index: BTreeMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let edges = schema
            .tables
            .iter()
            .enumerate()
            .map(|(i, table)| {
                let targets: BTreeSet<&str> = table
                    .foreign_keys()
                    .map(|(_, target)| target.table.as_str())
                    .filter(|t| *t != table.table_name)
                    .collect();
                // BTreeSet iteration keeps the list sorted by name
                targets
                    .into_iter()
                    .filter_map(|t| index.get(t).copied())
                    .filter(|&j| j != i)
                    .collect()
            })
            .collect();

        Self { names, edges }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    /// Names of the tables `node` depends on, sorted.
    pub fn dependencies(&self, node: usize) -> impl Iterator<Item = &str> {
        self.edges[node].iter().map(|&j| self.names[j].as_str())
    }

    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        (0..self.len())
            .map(|i| {
                (
                    self.names[i].clone(),
                    self.dependencies(i).map(str::to_string).collect(),
                )
            })
            .collect()
    }

    /// Depth-first cycle search with an explicit frame stack.
    ///
    /// Roots are tried once each, in declaration order. Within one root the
    /// first back edge produces a cycle and ends that traversal; nodes that
    /// were still on the path go back to unvisited, so only roots declared
    /// after them can explore them again. A root already passed is never
    /// retried, which means a cycle sharing nodes with an earlier one can go
    /// unreported. Any graph with a cycle still yields at least one.
    /// Cycles that are rotations of an earlier one are dropped.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnPath,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.len()];
        let mut cycles: Vec<Vec<usize>> = Vec::new();

        for root in 0..self.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            // (node, index of next edge to follow)
            let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
            marks[root] = Mark::OnPath;

            while let Some(frame) = frames.last_mut() {
                let node = frame.0;
                let Some(&child) = self.edges[node].get(frame.1) else {
                    marks[node] = Mark::Done;
                    frames.pop();
                    continue;
                };
                frame.1 += 1;

                match marks[child] {
                    Mark::Unvisited => {
                        marks[child] = Mark::OnPath;
                        frames.push((child, 0));
                    }
                    Mark::OnPath => {
                        let start = frames
                            .iter()
                            .position(|&(n, _)| n == child)
                            .unwrap_or(0);
                        let cycle: Vec<usize> = frames[start..].iter().map(|&(n, _)| n).collect();
                        if !cycles.iter().any(|c| is_rotation(c, &cycle)) {
                            cycles.push(cycle);
                        }
                        for &(n, _) in &frames {
                            marks[n] = Mark::Unvisited;
                        }
                        frames.clear();
                    }
                    Mark::Done => {}
                }
            }
        }

        cycles
            .into_iter()
            .map(|c| c.into_iter().map(|i| self.names[i].clone()).collect())
            .collect()
    }

    /// Kahn's algorithm, smallest ready name first.
    ///
    /// Returns fewer names than there are tables when the graph has a cycle.
    pub fn build_order(&self) -> Vec<String> {
        let mut remaining: Vec<usize> = self.edges.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.len()];
        for (node, targets) in self.edges.iter().enumerate() {
            for &target in targets {
                dependents[target].push(node);
            }
        }

        let mut ready: BTreeSet<(&str, usize)> = (0..self.len())
            .filter(|&i| remaining[i] == 0)
            .map(|i| (self.names[i].as_str(), i))
            .collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some((name, node)) = ready.pop_first() {
            order.push(name.to_string());
            for &dependent in &dependents[node] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert((self.names[dependent].as_str(), dependent));
                }
            }
        }
        order
    }
}

fn is_rotation(a: &[usize], b: &[usize]) -> bool {
    a.len() == b.len()
        && (0..a.len()).any(|shift| a.iter().cycle().skip(shift).take(b.len()).eq(b.iter()))
}

/// Outcome of dependency analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyAnalysis {
    pub valid: bool,
    /// Tables in an order where every table follows the tables it references.
    /// Empty when a cycle exists.
    pub build_order: Vec<String>,
    pub dependency_graph: BTreeMap<String, Vec<String>>,
    /// Each cycle as the path of tables, without repeating the first.
    pub cycles: Vec<Vec<String>>,
    pub issues: Vec<Issue>,
}

impl DependencyAnalysis {
    pub fn report(&self) -> ValidationReport {
        ValidationReport::from_issues(STAGE, self.issues.clone())
    }

    /// An incomplete build order on an acyclic graph.
    pub fn internal_error(&self) -> Option<&Issue> {
        self.issues
            .iter()
            .find(|i| i.code == IssueCode::BuildOrderIncomplete)
    }
}

pub fn resolve(schema: &ProjectSchema) -> DependencyAnalysis {
    let graph = DependencyGraph::from_schema(schema);
    debug!(tables = graph.len(), "dependency graph built");

    let cycles = graph.find_cycles();
    let mut issues: Vec<Issue> = cycles
        .iter()
        .map(|cycle| {
            Issue::error(
                IssueCode::CircularDependency,
                format!(
                    "Circular dependency detected: {} -> {}",
                    cycle.join(" -> "),
                    cycle[0]
                ),
            )
        })
        .collect();

    let mut build_order = Vec::new();
    if cycles.is_empty() {
        build_order = graph.build_order();
        if build_order.len() != graph.len() {
            let missing: Vec<&str> = (0..graph.len())
                .map(|i| graph.name(i))
                .filter(|n| !build_order.iter().any(|b| b == n))
                .collect();
            warn!(missing = ?missing, "build order does not cover every table");
            issues.push(Issue::error(
                IssueCode::BuildOrderIncomplete,
                format!(
                    "Could not determine build order for tables: {}",
                    missing.join(", ")
                ),
            ));
        }
    }

    let valid = !issues.iter().any(Issue::is_error);
    if !valid {
        build_order.clear();
    }
    info!(
        valid,
        cycles = cycles.len(),
        order = ?build_order,
        "dependency analysis complete"
    );
    DependencyAnalysis {
        valid,
        build_order,
        dependency_graph: graph.to_map(),
        cycles,
        issues,
    }
}
