use crate::config::AnalysisConfig;
use crate::dependency::DependencyType;
use crate::graph::DependencyGraph;
use crate::task::TaskId;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateDates {
    pub latest_start: f64,
    pub latest_finish: f64,
}

pub struct BackwardPass<'a> {
    graph: &'a DependencyGraph,
    config: &'a AnalysisConfig,
}

impl<'a> BackwardPass<'a> {
    pub fn new(graph: &'a DependencyGraph, config: &'a AnalysisConfig) -> Self {
        Self { graph, config }
    }

    /// `order` is the same topological order the forward pass used; it is
    /// walked in reverse. Every latest finish is capped at `project_end`.
    pub fn execute(&self, order: &[NodeIndex], project_end: f64) -> HashMap<TaskId, LateDates> {
        let mut late: HashMap<TaskId, LateDates> = HashMap::with_capacity(order.len());

        for &node in order.iter().rev() {
            let task = self.graph.task_at(node);
            let duration = task.duration;

            let mut latest_finish = project_end;
            for position in self.graph.edge_positions(node, Direction::Outgoing) {
                let edge = &self.graph.edges[position];
                if !edge.is_scheduling() {
                    continue;
                }
                let Some(succ) = late.get(&edge.successor_id) else {
                    continue;
                };
                let lag = self.config.days_to_units(f64::from(edge.effective_lag_days()));
                if let Some(limit) = finish_limit(edge.dependency_type, succ, lag, duration) {
                    latest_finish = latest_finish.min(limit);
                }
            }

            late.insert(
                task.id,
                LateDates {
                    latest_start: latest_finish - duration,
                    latest_finish,
                },
            );
        }

        late
    }
}

/// Upper bound an edge puts on its predecessor's latest finish.
fn finish_limit(
    dependency_type: DependencyType,
    succ: &LateDates,
    lag: f64,
    own_duration: f64,
) -> Option<f64> {
    match dependency_type {
        DependencyType::FinishToStart | DependencyType::Blocking => Some(succ.latest_start - lag),
        DependencyType::StartToStart => Some(succ.latest_start - lag + own_duration),
        DependencyType::FinishToFinish => Some(succ.latest_finish - lag),
        DependencyType::StartToFinish => Some(succ.latest_finish - lag + own_duration),
        DependencyType::Soft => None,
    }
}
