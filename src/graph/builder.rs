use super::{DependencyGraph, GraphError};
use crate::dependency::DependencyEdge;
use crate::task::{Task, TaskId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub struct DependencyGraphBuilder<'a> {
    tasks: &'a [Task],
    edges: &'a [DependencyEdge],
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(tasks: &'a [Task], edges: &'a [DependencyEdge]) -> Self {
        Self { tasks, edges }
    }

    pub fn build(&self) -> Result<DependencyGraph, GraphError> {
        // Step 1: Task identity and durations
        let id_to_index = self.index_tasks()?;
        self.check_durations()?;

        // Step 2-3: Edge references
        self.check_references(&id_to_index)?;
        self.check_self_dependencies()?;

        // Step 4: Adjacency over active edges only
        let graph = self.build_active_graph(&id_to_index);

        // Step 5: Cycle detection
        if let Some(cycle) = find_cycle(&graph) {
            warn!(?cycle, "rejecting dependency graph with a cycle");
            return Err(GraphError::CyclicDependency { cycle });
        }

        debug!(
            tasks = self.tasks.len(),
            edges = self.edges.len(),
            active_edges = graph.edge_count(),
            "dependency graph built"
        );

        Ok(DependencyGraph {
            graph,
            id_to_index,
            tasks: self.tasks.to_vec(),
            edges: self.edges.to_vec(),
        })
    }

    fn index_tasks(&self) -> Result<HashMap<TaskId, NodeIndex>, GraphError> {
        let mut id_to_index = HashMap::with_capacity(self.tasks.len());
        for (position, task) in self.tasks.iter().enumerate() {
            if id_to_index.insert(task.id, NodeIndex::new(position)).is_some() {
                warn!(task_id = task.id, "duplicate task id");
                return Err(GraphError::DuplicateTask { id: task.id });
            }
        }
        Ok(id_to_index)
    }

    fn check_durations(&self) -> Result<(), GraphError> {
        for task in self.tasks {
            if !task.has_valid_duration() {
                return Err(GraphError::InvalidDuration {
                    id: task.id,
                    detail: format!("duration {}", task.duration),
                });
            }
            if !task.has_valid_fixed_start() {
                return Err(GraphError::InvalidDuration {
                    id: task.id,
                    detail: format!(
                        "fixed start offset {}",
                        task.fixed_start_offset_days.unwrap_or_default()
                    ),
                });
            }
        }
        Ok(())
    }

    fn check_references(&self, id_to_index: &HashMap<TaskId, NodeIndex>) -> Result<(), GraphError> {
        for edge in self.edges {
            for endpoint in [edge.predecessor_id, edge.successor_id] {
                if !id_to_index.contains_key(&endpoint) {
                    warn!(
                        predecessor = edge.predecessor_id,
                        successor = edge.successor_id,
                        missing = endpoint,
                        "dependency references unknown task"
                    );
                    return Err(GraphError::UnknownTaskReference {
                        predecessor_id: edge.predecessor_id,
                        successor_id: edge.successor_id,
                        missing_id: endpoint,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_self_dependencies(&self) -> Result<(), GraphError> {
        match self
            .edges
            .iter()
            .find(|edge| edge.predecessor_id == edge.successor_id)
        {
            Some(edge) => Err(GraphError::SelfDependency {
                id: edge.predecessor_id,
            }),
            None => Ok(()),
        }
    }

    fn build_active_graph(&self, id_to_index: &HashMap<TaskId, NodeIndex>) -> DiGraph<TaskId, usize> {
        let mut graph: DiGraph<TaskId, usize> =
            DiGraph::with_capacity(self.tasks.len(), self.edges.len());

        // Node indices follow task order so index i is tasks[i]
        for task in self.tasks {
            graph.add_node(task.id);
        }

        for (position, edge) in self.edges.iter().enumerate() {
            if !edge.active {
                continue;
            }
            let u = id_to_index[&edge.predecessor_id];
            let v = id_to_index[&edge.successor_id];
            graph.add_edge(u, v, position);
        }

        graph
    }
}

/// Depth-first search with an explicit recursion stack. Returns the ids of
/// the first cycle found, starting at the task where it closes.
fn find_cycle(graph: &DiGraph<TaskId, usize>) -> Option<Vec<TaskId>> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut on_stack: HashSet<NodeIndex> = HashSet::new();

    let successors = |node: NodeIndex| -> Vec<NodeIndex> {
        let mut edges: Vec<(usize, NodeIndex)> = graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        edges.sort_unstable_by_key(|(position, _)| *position);
        edges.into_iter().map(|(_, target)| target).collect()
    };

    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }

        // (node, its successors, next successor to visit)
        let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = vec![(start, successors(start), 0)];
        visited.insert(start);
        on_stack.insert(start);

        while let Some((node, next_nodes, cursor)) = stack.last_mut() {
            if *cursor < next_nodes.len() {
                let next = next_nodes[*cursor];
                *cursor += 1;

                if on_stack.contains(&next) {
                    let from = stack
                        .iter()
                        .position(|(ix, _, _)| *ix == next)
                        .unwrap_or_default();
                    return Some(stack[from..].iter().map(|(ix, _, _)| graph[*ix]).collect());
                }
                if visited.insert(next) {
                    on_stack.insert(next);
                    stack.push((next, successors(next), 0));
                }
            } else {
                on_stack.remove(&*node);
                stack.pop();
            }
        }
    }

    None
}
