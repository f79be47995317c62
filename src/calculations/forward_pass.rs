use crate::config::AnalysisConfig;
use crate::dependency::DependencyType;
use crate::graph::DependencyGraph;
use crate::task::TaskId;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use tracing::debug;

/// Earliest bounds of one task plus the edge that set its start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarlyDates {
    pub earliest_start: f64,
    pub earliest_finish: f64,
    /// Position in [`DependencyGraph::edges`]; `None` when the project start
    /// or the task's fixed start offset wins.
    pub driving_edge: Option<usize>,
}

pub struct ForwardPass<'a> {
    graph: &'a DependencyGraph,
    config: &'a AnalysisConfig,
}

impl<'a> ForwardPass<'a> {
    pub fn new(graph: &'a DependencyGraph, config: &'a AnalysisConfig) -> Self {
        Self { graph, config }
    }

    /// Runs over `order`, which must be a topological order of the active edges.
    pub fn execute(&self, order: &[NodeIndex]) -> HashMap<TaskId, EarlyDates> {
        let mut early: HashMap<TaskId, EarlyDates> = HashMap::with_capacity(order.len());
        let epsilon = self.config.float_epsilon;

        for &node in order {
            let task = self.graph.task_at(node);
            let duration = task.duration;
            let base = self
                .config
                .days_to_units(task.fixed_start_offset_days.unwrap_or(0.0));

            // (bound, predecessor id, edge position)
            let mut bounds: Vec<(f64, TaskId, usize)> = Vec::new();
            for position in self.graph.edge_positions(node, Direction::Incoming) {
                let edge = &self.graph.edges[position];
                if !edge.is_scheduling() {
                    continue;
                }
                let Some(pred) = early.get(&edge.predecessor_id) else {
                    continue;
                };
                let lag = self.config.days_to_units(f64::from(edge.effective_lag_days()));
                if let Some(bound) = start_bound(edge.dependency_type, pred, lag, duration) {
                    bounds.push((bound, edge.predecessor_id, position));
                }
            }

            let earliest_start = bounds
                .iter()
                .map(|(bound, _, _)| *bound)
                .fold(base, f64::max);

            let driving_edge = bounds
                .iter()
                .filter(|(bound, _, _)| (earliest_start - bound).abs() <= epsilon)
                .min_by_key(|(_, pred_id, position)| (*pred_id, *position))
                .map(|(_, _, position)| *position);

            debug!(
                task_id = task.id,
                earliest_start,
                ?driving_edge,
                "forward pass"
            );

            early.insert(
                task.id,
                EarlyDates {
                    earliest_start,
                    earliest_finish: earliest_start + duration,
                    driving_edge,
                },
            );
        }

        early
    }
}

/// Lower bound an edge puts on its successor's earliest start.
fn start_bound(
    dependency_type: DependencyType,
    pred: &EarlyDates,
    lag: f64,
    own_duration: f64,
) -> Option<f64> {
    match dependency_type {
        DependencyType::FinishToStart | DependencyType::Blocking => Some(pred.earliest_finish + lag),
        DependencyType::StartToStart => Some(pred.earliest_start + lag),
        DependencyType::FinishToFinish => Some(pred.earliest_finish + lag - own_duration),
        DependencyType::StartToFinish => Some(pred.earliest_start + lag - own_duration),
        DependencyType::Soft => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred() -> EarlyDates {
        EarlyDates {
            earliest_start: 2.0,
            earliest_finish: 5.0,
            driving_edge: None,
        }
    }

    #[test]
    fn bounds_per_dependency_type() {
        let p = pred();
        assert_eq!(start_bound(DependencyType::FinishToStart, &p, 1.0, 4.0), Some(6.0));
        assert_eq!(start_bound(DependencyType::StartToStart, &p, 1.0, 4.0), Some(3.0));
        assert_eq!(start_bound(DependencyType::FinishToFinish, &p, 1.0, 4.0), Some(2.0));
        assert_eq!(start_bound(DependencyType::StartToFinish, &p, 1.0, 4.0), Some(-1.0));
        assert_eq!(start_bound(DependencyType::Soft, &p, 1.0, 4.0), None);
    }
}
