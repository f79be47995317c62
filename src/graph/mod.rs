use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::dependency::{DependencyEdge, DependencyType};
use crate::task::{Task, TaskId};

pub mod builder;

pub use builder::DependencyGraphBuilder;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate task id {id}")]
    DuplicateTask { id: TaskId },
    #[error("task {id} has invalid duration or fixed start ({detail})")]
    InvalidDuration { id: TaskId, detail: String },
    #[error("dependency {predecessor_id} -> {successor_id} references unknown task {missing_id}")]
    UnknownTaskReference {
        predecessor_id: TaskId,
        successor_id: TaskId,
        missing_id: TaskId,
    },
    #[error("task {id} cannot depend on itself")]
    SelfDependency { id: TaskId },
    #[error("cyclic dependency detected: {}", format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<TaskId> },
}

fn unique_in_order(ids: impl Iterator<Item = TaskId>) -> Vec<TaskId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

fn format_cycle(cycle: &[TaskId]) -> String {
    let mut ids: Vec<String> = cycle.iter().map(ToString::to_string).collect();
    if let Some(first) = cycle.first() {
        ids.push(first.to_string());
    }
    ids.join(" -> ")
}

/// Validated task graph. The petgraph holds only active edges; each edge
/// weight is the position of the edge in [`DependencyGraph::edges`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    pub(crate) graph: DiGraph<TaskId, usize>,
    pub(crate) id_to_index: HashMap<TaskId, NodeIndex>,
    pub(crate) tasks: Vec<Task>,
    pub(crate) edges: Vec<DependencyEdge>,
}

/// Edge counts by type, active and inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStatistics {
    pub by_type: BTreeMap<DependencyType, usize>,
    pub active: usize,
    pub inactive: usize,
    pub total: usize,
}

impl DependencyGraph {
    pub fn build(tasks: &[Task], edges: &[DependencyEdge]) -> Result<Self, GraphError> {
        DependencyGraphBuilder::new(tasks, edges).build()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// All edges in input order, inactive ones included.
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.id_to_index
            .get(&id)
            .map(|ix| &self.tasks[ix.index()])
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.id_to_index.contains_key(&id)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn active_edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(|edge| edge.active)
    }

    pub fn active_edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Active edges entering `id`, in input order.
    pub fn incoming(&self, id: TaskId) -> Vec<&DependencyEdge> {
        self.adjacent_edges(id, Direction::Incoming)
    }

    /// Active edges leaving `id`, in input order.
    pub fn outgoing(&self, id: TaskId) -> Vec<&DependencyEdge> {
        self.adjacent_edges(id, Direction::Outgoing)
    }

    fn adjacent_edges(&self, id: TaskId, direction: Direction) -> Vec<&DependencyEdge> {
        let Some(&node) = self.id_to_index.get(&id) else {
            return Vec::new();
        };
        self.edge_positions(node, direction)
            .into_iter()
            .map(|pos| &self.edges[pos])
            .collect()
    }

    /// Positions in [`DependencyGraph::edges`] of the active edges touching
    /// `node`, ascending.
    pub(crate) fn edge_positions(&self, node: NodeIndex, direction: Direction) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .graph
            .edges_directed(node, direction)
            .map(|edge| *edge.weight())
            .collect();
        positions.sort_unstable();
        positions
    }

    pub(crate) fn task_at(&self, node: NodeIndex) -> &Task {
        &self.tasks[node.index()]
    }

    pub fn direct_predecessors(&self, id: TaskId) -> Vec<TaskId> {
        unique_in_order(self.incoming(id).iter().map(|e| e.predecessor_id))
    }

    pub fn direct_successors(&self, id: TaskId) -> Vec<TaskId> {
        unique_in_order(self.outgoing(id).iter().map(|e| e.successor_id))
    }

    /// Tasks in dependency order over the active edges.
    pub fn topological_order(&self) -> Vec<TaskId> {
        // The builder rejects cycles, so toposort cannot fail here.
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|ix| self.graph[ix]).collect())
            .unwrap_or_default()
    }

    pub(crate) fn try_topological_order(&self) -> Result<Vec<NodeIndex>, TaskId> {
        toposort(&self.graph, None).map_err(|cycle| self.graph[cycle.node_id()])
    }

    /// Every task that `id` transitively waits on.
    pub fn all_prerequisites(&self, id: TaskId) -> HashSet<TaskId> {
        self.reachable(id, Direction::Incoming)
    }

    /// Every task that transitively waits on `id`.
    pub fn all_dependents(&self, id: TaskId) -> HashSet<TaskId> {
        self.reachable(id, Direction::Outgoing)
    }

    fn reachable(&self, id: TaskId, direction: Direction) -> HashSet<TaskId> {
        let mut seen = HashSet::new();
        let Some(&start) = self.id_to_index.get(&id) else {
            return seen;
        };
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, direction) {
                if seen.insert(self.graph[next]) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Whether adding an active `predecessor -> successor` edge would close a cycle.
    pub fn would_create_cycle(&self, predecessor_id: TaskId, successor_id: TaskId) -> bool {
        predecessor_id == successor_id
            || self.all_dependents(successor_id).contains(&predecessor_id)
    }

    /// Shortest chain of active edges from `from` to `to`, both included.
    /// Empty when `to` is not reachable.
    pub fn shortest_dependency_path(&self, from: TaskId, to: TaskId) -> Vec<TaskId> {
        let (Some(&start), Some(&goal)) = (self.id_to_index.get(&from), self.id_to_index.get(&to))
        else {
            return Vec::new();
        };
        if start == goal {
            return vec![from];
        }

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            let mut next_nodes: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .collect();
            next_nodes.sort_by_key(|ix| self.graph[*ix]);
            for next in next_nodes {
                if next == start || parent.contains_key(&next) {
                    continue;
                }
                parent.insert(next, node);
                if next == goal {
                    let mut path = vec![self.graph[goal]];
                    let mut cursor = goal;
                    while let Some(&prev) = parent.get(&cursor) {
                        path.push(self.graph[prev]);
                        cursor = prev;
                    }
                    path.reverse();
                    return path;
                }
                queue.push_back(next);
            }
        }
        Vec::new()
    }

    pub fn statistics(&self) -> DependencyStatistics {
        let mut stats = DependencyStatistics::default();
        for edge in &self.edges {
            *stats.by_type.entry(edge.dependency_type).or_default() += 1;
            if edge.active {
                stats.active += 1;
            } else {
                stats.inactive += 1;
            }
        }
        stats.total = self.edges.len();
        stats
    }

    /// Tasks ranked by active edge count, ties by id.
    pub fn most_connected(&self, limit: usize) -> Vec<(TaskId, usize)> {
        let mut ranked: Vec<(TaskId, usize)> = self
            .graph
            .node_indices()
            .map(|ix| {
                let degree = self.graph.edges_directed(ix, Direction::Incoming).count()
                    + self.graph.edges_directed(ix, Direction::Outgoing).count();
                (self.graph[ix], degree)
            })
            .filter(|(_, degree)| *degree > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Tasks with no active edge in either direction, in input order.
    /// Active edges waiting at least `min_lag_days`: deliveries and other
    /// outside lead times, in input order.
    pub fn external_constraints(&self, min_lag_days: i32) -> Vec<&DependencyEdge> {
        self.active_edges()
            .filter(|edge| edge.lag_days >= min_lag_days)
            .collect()
    }

    pub fn independent_tasks(&self) -> Vec<TaskId> {
        self.graph
            .node_indices()
            .filter(|ix| self.graph.neighbors_undirected(*ix).next().is_none())
            .map(|ix| self.graph[ix])
            .collect()
    }

    pub(crate) fn node(&self, id: TaskId) -> Option<NodeIndex> {
        self.id_to_index.get(&id).copied()
    }
}
