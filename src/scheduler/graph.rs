//! Contract-based dependency derivation between plan tasks.
//!
//! Dependencies are inferred from declared input/output artifact names, not
//! from actual runtime data flow. The approximation is conservative: it can
//! add a false dependency but never misses a declared one, so independent
//! tasks may serialize needlessly while dependent tasks can never race.

use std::collections::{BTreeSet, HashSet};

use crate::agents::AgentContract;

/// Dependency graph over top-level task indices.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    depends_on: Vec<HashSet<usize>>,
}

impl DependencyGraph {
    /// Derive dependencies from per-task contracts: task `i` depends on
    /// task `j` (`i != j`) when `i`'s declared inputs overlap `j`'s
    /// declared outputs.
    pub fn from_contracts(contracts: &[AgentContract]) -> Self {
        let depends_on = contracts
            .iter()
            .enumerate()
            .map(|(i, contract)| {
                contracts
                    .iter()
                    .enumerate()
                    .filter(|(j, other)| i != *j && contract.depends_on(other))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();

        Self { depends_on }
    }

    /// Get the number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.depends_on.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.depends_on.is_empty()
    }

    /// Get the dependency set of one task.
    pub fn depends_on(&self, index: usize) -> &HashSet<usize> {
        &self.depends_on[index]
    }

    /// Remaining task indices whose dependencies have all completed, in
    /// index order.
    ///
    /// An empty result with a non-empty `remaining` set (and nothing in
    /// flight) is the structural signal for a dependency cycle or an
    /// unresolvable wait; the executor handles it by falling back to
    /// sequential execution rather than surfacing an error.
    pub fn ready_indices(
        &self,
        remaining: &BTreeSet<usize>,
        completed: &HashSet<usize>,
    ) -> Vec<usize> {
        remaining
            .iter()
            .copied()
            .filter(|&i| self.depends_on[i].is_subset(completed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(inputs: &[&str], outputs: &[&str]) -> AgentContract {
        let mut c = AgentContract::new();
        for i in inputs {
            c = c.with_input(*i);
        }
        for o in outputs {
            c = c.with_output(*o);
        }
        c
    }

    #[test]
    fn chain_dependencies() {
        let contracts = vec![
            contract(&[], &["x"]),
            contract(&["x"], &["y"]),
            contract(&["y"], &[]),
        ];
        let graph = DependencyGraph::from_contracts(&contracts);

        assert!(graph.depends_on(0).is_empty());
        assert_eq!(graph.depends_on(1), &HashSet::from([0]));
        assert_eq!(graph.depends_on(2), &HashSet::from([1]));
    }

    #[test]
    fn independent_tasks_all_ready() {
        let contracts = vec![contract(&[], &["a"]), contract(&[], &["b"])];
        let graph = DependencyGraph::from_contracts(&contracts);

        let remaining: BTreeSet<usize> = [0, 1].into();
        let ready = graph.ready_indices(&remaining, &HashSet::new());
        assert_eq!(ready, vec![0, 1]);
    }

    #[test]
    fn readiness_follows_completion() {
        let contracts = vec![contract(&[], &["x"]), contract(&["x"], &[])];
        let graph = DependencyGraph::from_contracts(&contracts);

        let remaining: BTreeSet<usize> = [0, 1].into();
        assert_eq!(graph.ready_indices(&remaining, &HashSet::new()), vec![0]);

        let remaining: BTreeSet<usize> = [1].into();
        let completed = HashSet::from([0]);
        assert_eq!(graph.ready_indices(&remaining, &completed), vec![1]);
    }

    #[test]
    fn cycle_yields_no_ready_tasks() {
        let contracts = vec![
            contract(&["c"], &["a"]),
            contract(&["a"], &["b"]),
            contract(&["b"], &["c"]),
        ];
        let graph = DependencyGraph::from_contracts(&contracts);

        let remaining: BTreeSet<usize> = [0, 1, 2].into();
        assert!(graph.ready_indices(&remaining, &HashSet::new()).is_empty());
    }

    #[test]
    fn self_overlap_is_not_a_dependency() {
        // One task both reading and writing "x" must not depend on itself.
        let contracts = vec![contract(&["x"], &["x"])];
        let graph = DependencyGraph::from_contracts(&contracts);
        assert!(graph.depends_on(0).is_empty());
    }
}
