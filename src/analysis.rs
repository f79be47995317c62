use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{error, info};

use crate::calculations::{BackwardPass, EarlyDates, ForwardPass, ScheduleNode};
use crate::config::{AnalysisConfig, DurationUnit};
use crate::dependency::{DependencyEdge, DependencyType, EdgeRef};
use crate::graph::{DependencyGraph, GraphError};
use crate::risk::RiskLevel;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Flat input of one project: the shape accepted by `POST /analyze` and by
/// [`CriticalPathAnalyzer::analyze_many`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

/// Immutable report of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Project length in `duration_unit`. Hour-based consumers may send it
    /// as `totalDurationHours`.
    #[serde(alias = "totalDurationHours")]
    pub total_duration: f64,
    pub duration_unit: DurationUnit,
    /// Zero-float tasks in topological order.
    pub critical_task_ids: Vec<TaskId>,
    /// Driving edges between two critical tasks, ordered by successor.
    pub critical_edges: Vec<EdgeRef>,
    pub float_by_task_id: BTreeMap<TaskId, f64>,
    /// One node per task, topological order.
    pub nodes: Vec<ScheduleNode>,
    /// Chain of driving edges ending at the project finish.
    pub critical_path: Vec<TaskId>,
    pub critical_task_count: usize,
    pub total_task_count: usize,
    pub critical_path_percentage: f64,
    pub average_float: f64,
    pub min_nonzero_float: Option<f64>,
    pub total_dependency_count: usize,
    pub critical_dependency_count: usize,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    /// Tasks waiting on a lag longer than the risk policy's limit.
    #[serde(default)]
    pub high_risk_task_ids: Vec<TaskId>,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    pub fn node(&self, task_id: TaskId) -> Option<&ScheduleNode> {
        self.nodes.iter().find(|node| node.task_id == task_id)
    }

    pub fn float_of(&self, task_id: TaskId) -> Option<f64> {
        self.float_by_task_id.get(&task_id).copied()
    }

    pub fn is_critical(&self, task_id: TaskId) -> bool {
        self.float_of(task_id) == Some(0.0)
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tasks={}", self.total_task_count));
        parts.push(format!(
            "critical={} ({:.1}%)",
            self.critical_task_count, self.critical_path_percentage
        ));
        parts.push(format!("duration={} {}", self.total_duration, self.duration_unit));
        parts.push(format!("risk={}", self.risk_level));
        if !self.critical_path.is_empty() {
            let chain = self
                .critical_path
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("->");
            parts.push(format!("crit_path={}", chain));
        }
        parts.join(", ")
    }
}

/// Forward/backward-pass critical-path analysis. Holds only configuration,
/// so one analyzer can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct CriticalPathAnalyzer {
    config: AnalysisConfig,
}

impl CriticalPathAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Builds the graph and analyzes it in one step.
    pub fn analyze_tasks(
        &self,
        tasks: &[Task],
        edges: &[DependencyEdge],
    ) -> Result<AnalysisResult, AnalysisError> {
        let graph = DependencyGraph::build(tasks, edges)?;
        self.analyze(&graph)
    }

    /// Analyzes independent projects in parallel; results keep input order.
    pub fn analyze_many(&self, projects: &[ProjectInput]) -> Vec<Result<AnalysisResult, AnalysisError>> {
        projects
            .par_iter()
            .map(|project| self.analyze_tasks(&project.tasks, &project.dependencies))
            .collect()
    }

    pub fn analyze(&self, graph: &DependencyGraph) -> Result<AnalysisResult, AnalysisError> {
        let epsilon = self.config.float_epsilon;

        // Step 1: Order
        let order = graph.try_topological_order().map_err(|task_id| {
            error!(task_id, "active edges are cyclic after validation");
            AnalysisError::InternalInvariant(format!("active edges through task {task_id} form a cycle"))
        })?;

        // Step 2-3: Forward pass and horizon
        let early = ForwardPass::new(graph, &self.config).execute(&order);
        let total_duration = early
            .values()
            .map(|dates| dates.earliest_finish)
            .fold(0.0, f64::max);

        // Step 4: Backward pass
        let late = BackwardPass::new(graph, &self.config).execute(&order, total_duration);

        // Step 5-6: Float and critical set
        let mut nodes = Vec::with_capacity(order.len());
        for &ix in &order {
            let task_id = graph.task_at(ix).id;
            let (Some(e), Some(l)) = (early.get(&task_id), late.get(&task_id)) else {
                error!(task_id, "task missing from a scheduling pass");
                return Err(AnalysisError::InternalInvariant(format!(
                    "task {task_id} was not scheduled"
                )));
            };

            let mut float = l.latest_start - e.earliest_start;
            if float < -epsilon {
                error!(
                    task_id,
                    float,
                    earliest_start = e.earliest_start,
                    latest_start = l.latest_start,
                    "negative float"
                );
                return Err(AnalysisError::InternalInvariant(format!(
                    "task {task_id} has negative float {float}"
                )));
            }
            if float.abs() <= epsilon {
                float = 0.0;
            }

            nodes.push(ScheduleNode {
                task_id,
                earliest_start: e.earliest_start,
                earliest_finish: e.earliest_finish,
                latest_start: l.latest_start,
                latest_finish: l.latest_finish,
                float,
                is_critical: float == 0.0,
            });
        }

        let float_by_task_id: BTreeMap<TaskId, f64> =
            nodes.iter().map(|node| (node.task_id, node.float)).collect();
        let critical_task_ids: Vec<TaskId> = nodes
            .iter()
            .filter(|node| node.is_critical)
            .map(|node| node.task_id)
            .collect();

        // Step 7: Critical edges
        let critical_positions = self.critical_edge_positions(graph, &nodes, &early, &float_by_task_id);
        let critical_edges: Vec<EdgeRef> = critical_positions
            .iter()
            .map(|&pos| EdgeRef::from(&graph.edges()[pos]))
            .collect();
        let critical_path = critical_chain(graph, &nodes, &early, &float_by_task_id, total_duration, epsilon);

        // Step 8: Metrics
        let total_task_count = nodes.len();
        let critical_task_count = critical_task_ids.len();
        let critical_path_percentage = if total_task_count == 0 {
            0.0
        } else {
            critical_task_count as f64 * 100.0 / total_task_count as f64
        };
        let average_float = if total_task_count == 0 {
            0.0
        } else {
            nodes.iter().map(|node| node.float).sum::<f64>() / total_task_count as f64
        };
        let min_nonzero_float = nodes
            .iter()
            .filter(|node| !node.is_critical)
            .map(|node| node.float)
            .reduce(f64::min);

        // Step 9: Risk
        let risk_level = self.config.risk.classify(
            critical_path_percentage,
            min_nonzero_float.map(|float| self.config.units_to_days(float)),
        );

        let mut result = AnalysisResult {
            total_duration,
            duration_unit: self.config.duration_unit,
            critical_task_ids,
            critical_edges,
            float_by_task_id,
            nodes,
            critical_path,
            critical_task_count,
            total_task_count,
            critical_path_percentage,
            average_float,
            min_nonzero_float,
            total_dependency_count: graph.edges().len(),
            critical_dependency_count: critical_positions.len(),
            risk_level,
            risk_factors: Vec::new(),
            high_risk_task_ids: Vec::new(),
            recommendations: Vec::new(),
        };
        self.assess(graph, &critical_positions, &mut result);

        info!(
            tasks = result.total_task_count,
            critical = result.critical_task_count,
            total_duration = result.total_duration,
            risk = %result.risk_level,
            "critical path analysis complete"
        );

        Ok(result)
    }

    fn critical_edge_positions(
        &self,
        graph: &DependencyGraph,
        nodes: &[ScheduleNode],
        early: &HashMap<TaskId, EarlyDates>,
        floats: &BTreeMap<TaskId, f64>,
    ) -> Vec<usize> {
        nodes
            .iter()
            .filter(|node| node.is_critical)
            .filter_map(|node| early.get(&node.task_id)?.driving_edge)
            .filter(|&pos| floats.get(&graph.edges()[pos].predecessor_id) == Some(&0.0))
            .collect()
    }

    /// Fills the risk factors and recommendations of `result`.
    fn assess(&self, graph: &DependencyGraph, critical_positions: &[usize], result: &mut AnalysisResult) {
        let policy = &self.config.risk;

        if result.total_task_count > 0 && result.critical_path_percentage >= policy.medium_threshold_pct {
            result.risk_factors.push(format!(
                "{} of {} tasks ({:.1}%) are on the critical path",
                result.critical_task_count, result.total_task_count, result.critical_path_percentage
            ));
            if result.critical_path_percentage >= policy.high_threshold_pct {
                result.recommendations.push(
                    "Split long critical tasks or add people to them to shorten the project".to_string(),
                );
            }
        }

        let near_critical = result
            .nodes
            .iter()
            .filter(|node| {
                !node.is_critical
                    && self.config.units_to_days(node.float) < policy.near_critical_float_days
            })
            .count();
        if near_critical > 0 {
            result.risk_factors.push(format!(
                "{} task(s) have less than {} day(s) of float",
                near_critical, policy.near_critical_float_days
            ));
        }

        for &pos in critical_positions {
            let edge = &graph.edges()[pos];
            if edge.lag_days > policy.long_lag_days {
                result.risk_factors.push(format!(
                    "Critical dependency {} -> {} waits {} day(s)",
                    edge.predecessor_id, edge.successor_id, edge.lag_days
                ));
                result.recommendations.push(format!(
                    "Review the {}-day lag on {} -> {}; shortening it shortens the project",
                    edge.lag_days, edge.predecessor_id, edge.successor_id
                ));
            }
        }

        let external = graph.external_constraints(policy.long_lag_days.saturating_add(1));
        if !external.is_empty() {
            result.risk_factors.push(format!(
                "{} dependency(ies) wait on lead times longer than {} day(s)",
                external.len(),
                policy.long_lag_days
            ));
            result.high_risk_task_ids = external
                .iter()
                .map(|edge| edge.successor_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
        }

        let soft = graph
            .active_edges()
            .filter(|edge| edge.dependency_type == DependencyType::Soft)
            .count();
        if soft > 0 {
            result.recommendations.push(format!(
                "{} soft dependency(ies) do not constrain the schedule; relax or remove them if they no longer apply",
                soft
            ));
        }

        let independent = graph.independent_tasks();
        if result.total_task_count > 1 && !independent.is_empty() {
            result.recommendations.push(format!(
                "{} independent task(s) can run in parallel with the critical path",
                independent.len()
            ));
        }
    }
}

/// Walks driving edges back from the critical task that finishes last.
fn critical_chain(
    graph: &DependencyGraph,
    nodes: &[ScheduleNode],
    early: &HashMap<TaskId, EarlyDates>,
    floats: &BTreeMap<TaskId, f64>,
    total_duration: f64,
    epsilon: f64,
) -> Vec<TaskId> {
    let Some(end) = nodes
        .iter()
        .filter(|node| node.is_critical && (node.earliest_finish - total_duration).abs() <= epsilon)
        .map(|node| node.task_id)
        .min()
    else {
        return Vec::new();
    };

    let mut chain = vec![end];
    let mut current = end;
    while let Some(pos) = early.get(&current).and_then(|dates| dates.driving_edge) {
        let pred = graph.edges()[pos].predecessor_id;
        if floats.get(&pred) != Some(&0.0) {
            break;
        }
        chain.push(pred);
        current = pred;
    }
    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_report() {
        let result = CriticalPathAnalyzer::default().analyze_tasks(&[], &[]).unwrap();
        assert_eq!(result.total_duration, 0.0);
        assert!(result.critical_task_ids.is_empty());
        assert!(result.critical_path.is_empty());
        assert_eq!(result.critical_path_percentage, 0.0);
        assert_eq!(result.average_float, 0.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn cli_summary_lists_chain() {
        let tasks = vec![Task::new(1, "Design", 2.0), Task::new(2, "Build", 3.0)];
        let edges = vec![DependencyEdge::finish_to_start(1, 2)];
        let result = CriticalPathAnalyzer::new(AnalysisConfig::in_days())
            .analyze_tasks(&tasks, &edges)
            .unwrap();
        assert_eq!(
            result.to_cli_summary(),
            "tasks=2, critical=2 (100.0%), duration=5 days, risk=CRITICAL, crit_path=1->2"
        );
    }

    #[test]
    fn long_critical_lag_is_reported() {
        let tasks = vec![Task::new(1, "Order parts", 1.0), Task::new(2, "Assemble", 1.0)];
        let edges = vec![DependencyEdge::finish_to_start(1, 2).with_lag(5)];
        let result = CriticalPathAnalyzer::new(AnalysisConfig::in_days())
            .analyze_tasks(&tasks, &edges)
            .unwrap();
        assert_eq!(result.total_duration, 7.0);
        assert!(result.risk_factors.iter().any(|f| f.contains("1 -> 2 waits 5")));
        assert!(result.recommendations.iter().any(|r| r.contains("5-day lag")));
    }

    #[test]
    fn long_lag_dependents_are_high_risk() {
        let tasks: Vec<Task> = (1..=4).map(|id| Task::new(id, format!("T{id}"), 1.0)).collect();
        let edges = vec![
            DependencyEdge::finish_to_start(1, 2).with_lag(4),
            DependencyEdge::new(1, 3, DependencyType::StartToStart).with_lag(2),
            DependencyEdge::finish_to_start(2, 4).with_lag(1),
            DependencyEdge::finish_to_start(3, 4).with_lag(9).inactive(),
        ];
        let result = CriticalPathAnalyzer::new(AnalysisConfig::in_days())
            .analyze_tasks(&tasks, &edges)
            .unwrap();
        assert_eq!(result.high_risk_task_ids, vec![2, 3]);
        assert!(result.risk_factors.iter().any(|f| f.contains("2 dependency(ies) wait on lead times")));

        let calm = CriticalPathAnalyzer::new(AnalysisConfig::in_days())
            .analyze_tasks(&tasks, &edges[2..3])
            .unwrap();
        assert!(calm.high_risk_task_ids.is_empty());
    }

    #[test]
    fn total_duration_accepts_the_hours_name() {
        let tasks = vec![Task::new(1, "Design", 2.0)];
        let result = CriticalPathAnalyzer::default().analyze_tasks(&tasks, &[]).unwrap();
        let mut value = serde_json::to_value(&result).unwrap();
        let object = value.as_object_mut().unwrap();
        let total = object.remove("totalDuration").unwrap();
        object.insert("totalDurationHours".to_string(), total);

        let back: AnalysisResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
