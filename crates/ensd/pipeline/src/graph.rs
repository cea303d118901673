//! Stage dependency graph
//!
//! Validated once before a run: names are unique, every dependency exists,
//! scoped dependency nodes are valid paths and there are no cycles. The
//! topological order breaks ties by declaration order so runs are
//! reproducible.

use crate::error::{PipelineError, Result};
use crate::stage::Stage;
use ensd_types::NamespaceNode;
use std::collections::{BTreeSet, HashMap};

/// A validated, acyclic set of stages
#[derive(Debug, Clone)]
pub struct StageGraph {
    stages: Vec<Stage>,
    /// Upstream stage indices per stage
    upstream: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl StageGraph {
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        let mut index = HashMap::with_capacity(stages.len());
        for (i, stage) in stages.iter().enumerate() {
            if index.insert(stage.name.clone(), i).is_some() {
                return Err(PipelineError::DuplicateStage(stage.name.clone()));
            }
        }

        let mut upstream = Vec::with_capacity(stages.len());
        for stage in &stages {
            let mut deps = Vec::with_capacity(stage.depends_on.len());
            for dep in &stage.depends_on {
                let &i = index
                    .get(&dep.stage)
                    .ok_or_else(|| PipelineError::UnknownDependency {
                        stage: stage.name.clone(),
                        dependency: dep.stage.clone(),
                    })?;
                for path in &dep.nodes {
                    NamespaceNode::new(path.as_str()).map_err(|e| PipelineError::InvalidNode {
                        stage: stage.name.clone(),
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                }
                deps.push(i);
            }
            upstream.push(deps);
        }

        let order = topological_order(&stages, &upstream)?;
        Ok(Self {
            stages,
            upstream,
            order,
        })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Stage indices in execution order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Stages in execution order
    pub fn ordered(&self) -> impl Iterator<Item = &Stage> {
        self.order.iter().map(move |&i| &self.stages[i])
    }

    pub(crate) fn upstream(&self, stage: usize) -> &[usize] {
        &self.upstream[stage]
    }
}

/// Kahn's algorithm, always releasing the earliest declared ready stage
fn topological_order(stages: &[Stage], upstream: &[Vec<usize>]) -> Result<Vec<usize>> {
    let mut indegree: Vec<usize> = upstream.iter().map(Vec::len).collect();
    let mut downstream = vec![Vec::new(); stages.len()];
    for (i, deps) in upstream.iter().enumerate() {
        for &d in deps {
            downstream[d].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..stages.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(stages.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &next in &downstream[i] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() < stages.len() {
        let stuck = (0..stages.len())
            .filter(|&i| indegree[i] > 0)
            .map(|i| stages[i].name.clone())
            .collect();
        return Err(PipelineError::CycleDetected(stuck));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensd_types::Declaration;

    fn names(graph: &StageGraph) -> Vec<&str> {
        graph.ordered().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_order_respects_dependencies_and_declaration() {
        let graph = StageGraph::new(vec![
            Stage::deploy("wrapper", "NameWrapper").after("registry"),
            Stage::deploy("metadata", "StaticMetadataService"),
            Stage::deploy("registry", "ENSRegistry"),
        ])
        .unwrap();
        assert_eq!(names(&graph), vec!["metadata", "registry", "wrapper"]);
    }

    #[test]
    fn test_duplicate_stage_is_rejected() {
        let err = StageGraph::new(vec![
            Stage::deploy("registry", "ENSRegistry"),
            Stage::deploy("registry", "ENSRegistry"),
        ])
        .unwrap_err();
        assert_eq!(err, PipelineError::DuplicateStage("registry".into()));
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let err = StageGraph::new(vec![Stage::deploy("root", "Root").after("registry")])
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownDependency { .. }));
    }

    #[test]
    fn test_invalid_scoped_node_is_rejected() {
        let err = StageGraph::new(vec![
            Stage::reconcile("tlds", Declaration::new()),
            Stage::deploy("wrapper", "NameWrapper").after_nodes("tlds", ["a..b"]),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidNode { .. }));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = StageGraph::new(vec![
            Stage::deploy("a", "A").after("c"),
            Stage::deploy("b", "B").after("a"),
            Stage::deploy("c", "C").after("b"),
            Stage::deploy("d", "D"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            PipelineError::CycleDetected(vec!["a".into(), "b".into(), "c".into()])
        );
    }
}
