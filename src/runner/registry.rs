//! Step registry and dependency validation.
//!
//! Steps are registered into a flat collection and refer to each other by
//! name. [`StepRegistry::finalize`] checks every reference and rejects
//! cycles, producing a [`ValidatedRegistry`] with a fixed execution order.

use std::collections::{BTreeSet, HashMap};

use crate::error::{ProvisorError, Result};
use crate::steps::Step;

/// Collects steps before validation.
#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: Vec<Step>,
    index: HashMap<String, usize>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step.
    ///
    /// Fails with `DuplicateStep` if the name is taken, and with
    /// `CyclicDependency` if the step requires itself.
    pub fn register(&mut self, step: Step) -> Result<()> {
        if self.index.contains_key(step.name()) {
            return Err(ProvisorError::DuplicateStep {
                name: step.name().to_string(),
            });
        }
        if step.prerequisites().iter().any(|r| r == step.name()) {
            return Err(ProvisorError::CyclicDependency {
                cycle: vec![step.name().to_string(), step.name().to_string()],
            });
        }

        self.index.insert(step.name().to_string(), self.steps.len());
        self.steps.push(step);
        Ok(())
    }

    /// Check if a step is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Get the number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Validate the dependency graph and fix the execution order.
    ///
    /// Fails with `UnknownDependency` for the first prerequisite (in
    /// registration order) that names no registered step, then with
    /// `CyclicDependency` for the first cycle found by depth-first search.
    pub fn finalize(self) -> Result<ValidatedRegistry> {
        for step in &self.steps {
            if let Some(missing) = step
                .prerequisites()
                .iter()
                .find(|r| !self.index.contains_key(r.as_str()))
            {
                return Err(ProvisorError::UnknownDependency {
                    step: step.name().to_string(),
                    dependency: missing.clone(),
                });
            }
        }

        let edges = self.edges();

        if let Some(cycle) = find_cycle(&edges) {
            let cycle = cycle
                .into_iter()
                .map(|i| self.steps[i].name().to_string())
                .collect();
            return Err(ProvisorError::CyclicDependency { cycle });
        }

        let order = topological_order(&edges);
        tracing::debug!(steps = order.len(), "Step registry finalized");

        Ok(ValidatedRegistry {
            steps: self.steps,
            index: self.index,
            edges,
            order,
        })
    }

    /// Prerequisite indices for each step, in declaration order.
    fn edges(&self) -> Vec<Vec<usize>> {
        self.steps
            .iter()
            .map(|step| {
                step.prerequisites()
                    .iter()
                    .filter_map(|r| self.index.get(r.as_str()).copied())
                    .collect()
            })
            .collect()
    }
}

/// Depth-first search for a cycle, visiting steps in registration order.
///
/// Returns the cycle as a path that starts and ends on the same step.
fn find_cycle(edges: &[Vec<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        Visiting,
        Visited,
    }

    fn dfs(
        node: usize,
        edges: &[Vec<usize>],
        state: &mut [State],
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        state[node] = State::Visiting;
        path.push(node);

        for &dep in &edges[node] {
            match state[dep] {
                State::Visiting => {
                    let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(dep);
                    return Some(cycle);
                }
                State::Unvisited => {
                    if let Some(cycle) = dfs(dep, edges, state, path) {
                        return Some(cycle);
                    }
                }
                State::Visited => {}
            }
        }

        path.pop();
        state[node] = State::Visited;
        None
    }

    let mut state = vec![State::Unvisited; edges.len()];
    let mut path = Vec::new();

    for node in 0..edges.len() {
        if state[node] == State::Unvisited {
            if let Some(cycle) = dfs(node, edges, &mut state, &mut path) {
                return Some(cycle);
            }
        }
    }

    None
}

/// Kahn's algorithm; among ready steps the earliest registered runs first.
///
/// Callers must have ruled out cycles.
fn topological_order(edges: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = edges.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); edges.len()];
    for (step, deps) in edges.iter().enumerate() {
        for &dep in deps {
            dependents[dep].push(step);
        }
    }

    let mut ready: BTreeSet<usize> = (0..edges.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(edges.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    order
}

/// A registry whose references and acyclicity have been checked.
#[derive(Debug)]
pub struct ValidatedRegistry {
    steps: Vec<Step>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl ValidatedRegistry {
    /// Step names in execution order.
    ///
    /// Prerequisites always come first; independent steps keep their
    /// registration order, so the result is reproducible.
    pub fn order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.steps[i].name()).collect()
    }

    /// Steps in execution order.
    pub fn ordered_steps(&self) -> impl Iterator<Item = &Step> {
        self.order.iter().map(move |&i| &self.steps[i])
    }

    /// Look up a step by name.
    pub fn get(&self, name: &str) -> Option<&Step> {
        self.index.get(name).map(|&i| &self.steps[i])
    }

    /// Steps that directly require `name`, in registration order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let Some(&target) = self.index.get(name) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.contains(&target))
            .map(|(i, _)| self.steps[i].name())
            .collect()
    }

    /// Get the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if there are no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
