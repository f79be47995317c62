use critical_path::{
    AnalysisConfig, AnalysisResult, CriticalPathAnalyzer, DependencyEdge, DependencyType, EdgeRef, Task,
};

fn analyze_in_days(tasks: &[Task], edges: &[DependencyEdge]) -> AnalysisResult {
    CriticalPathAnalyzer::new(AnalysisConfig::in_days())
        .analyze_tasks(tasks, edges)
        .unwrap()
}

/// A(3) and B(2) joined by one edge of the given type and lag.
fn pair(dependency_type: DependencyType, lag_days: i32) -> AnalysisResult {
    let tasks = vec![Task::new(1, "A", 3.0), Task::new(2, "B", 2.0)];
    let edges = vec![DependencyEdge::new(1, 2, dependency_type).with_lag(lag_days)];
    analyze_in_days(&tasks, &edges)
}

fn early(result: &AnalysisResult, id: i64) -> (f64, f64) {
    let node = result.node(id).unwrap();
    (node.earliest_start, node.earliest_finish)
}

#[test]
fn finish_to_start_waits_for_predecessor_finish() {
    let result = pair(DependencyType::FinishToStart, 0);
    assert_eq!(early(&result, 1), (0.0, 3.0));
    assert_eq!(early(&result, 2), (3.0, 5.0));
    assert_eq!(result.total_duration, 5.0);
}

#[test]
fn positive_lag_delays_and_negative_lag_overlaps() {
    assert_eq!(early(&pair(DependencyType::FinishToStart, 2), 2), (5.0, 7.0));
    assert_eq!(early(&pair(DependencyType::FinishToStart, -2), 2), (1.0, 3.0));
}

#[test]
fn start_to_start_follows_predecessor_start() {
    let result = pair(DependencyType::StartToStart, 1);
    assert_eq!(early(&result, 2), (1.0, 3.0));
    assert_eq!(result.total_duration, 3.0);
}

#[test]
fn finish_to_finish_aligns_finishes() {
    let result = pair(DependencyType::FinishToFinish, 0);
    assert_eq!(early(&result, 2), (1.0, 3.0));
}

#[test]
fn start_to_finish_never_starts_before_zero() {
    let result = pair(DependencyType::StartToFinish, 0);
    assert_eq!(early(&result, 2), (0.0, 2.0));

    // A pinned at day 4: B must finish no earlier than A starts
    let tasks = vec![
        Task::new(1, "A", 3.0).with_fixed_start_offset(4.0),
        Task::new(2, "B", 2.0),
    ];
    let edges = vec![DependencyEdge::new(1, 2, DependencyType::StartToFinish)];
    let result = analyze_in_days(&tasks, &edges);
    assert_eq!(early(&result, 1), (4.0, 7.0));
    assert_eq!(early(&result, 2), (2.0, 4.0));
}

#[test]
fn blocking_behaves_like_finish_to_start_without_leads() {
    assert_eq!(early(&pair(DependencyType::Blocking, 1), 2), (4.0, 6.0));
    assert_eq!(early(&pair(DependencyType::Blocking, -2), 2), (3.0, 5.0));
}

#[test]
fn soft_dependency_does_not_constrain() {
    let result = pair(DependencyType::Soft, 5);
    assert_eq!(early(&result, 2), (0.0, 2.0));
    assert!(result.critical_edges.is_empty());
    assert_eq!(result.total_dependency_count, 1);
}

#[test]
fn inactive_dependency_does_not_constrain() {
    let tasks = vec![Task::new(1, "A", 3.0), Task::new(2, "B", 2.0)];
    let edges = vec![DependencyEdge::finish_to_start(1, 2).inactive()];
    let result = analyze_in_days(&tasks, &edges);
    assert_eq!(early(&result, 2), (0.0, 2.0));
}

#[test]
fn fixed_start_offset_is_a_lower_bound() {
    let tasks = vec![
        Task::new(1, "A", 3.0),
        Task::new(2, "B", 2.0).with_fixed_start_offset(10.0),
        Task::new(3, "C", 1.0).with_fixed_start_offset(1.0),
    ];
    let edges = vec![
        DependencyEdge::finish_to_start(1, 2),
        DependencyEdge::finish_to_start(1, 3),
    ];
    let result = analyze_in_days(&tasks, &edges);
    assert_eq!(early(&result, 2), (10.0, 12.0));
    // dependency wins over the earlier pin
    assert_eq!(early(&result, 3), (3.0, 4.0));
    // B's own pin drives it, so no critical edge reaches it
    assert!(!result.critical_edges.iter().any(|edge| edge.successor_id == 2));
    assert_eq!(result.critical_path, vec![2]);
}

#[test]
fn lags_and_offsets_are_converted_to_hours() {
    let tasks = vec![
        Task::new(1, "A", 8.0),
        Task::new(2, "B", 4.0),
        Task::new(3, "C", 1.0).with_fixed_start_offset(2.0),
    ];
    let edges = vec![DependencyEdge::finish_to_start(1, 2).with_lag(1)];
    let result = CriticalPathAnalyzer::default().analyze_tasks(&tasks, &edges).unwrap();
    assert_eq!(early(&result, 2), (32.0, 36.0));
    assert_eq!(early(&result, 3), (48.0, 49.0));
    assert_eq!(result.total_duration, 49.0);
}

#[test]
fn ties_pick_the_smallest_predecessor_as_driver() {
    let tasks = vec![
        Task::new(1, "A", 3.0),
        Task::new(2, "B", 1.0),
        Task::new(3, "C", 3.0),
    ];
    let edges = vec![
        DependencyEdge::finish_to_start(3, 2),
        DependencyEdge::finish_to_start(1, 2),
    ];
    let result = analyze_in_days(&tasks, &edges);
    assert_eq!(early(&result, 2), (3.0, 4.0));
    assert_eq!(result.critical_task_ids.len(), 3);
    assert_eq!(
        result.critical_edges,
        vec![EdgeRef {
            predecessor_id: 1,
            successor_id: 2,
            dependency_type: DependencyType::FinishToStart,
        }]
    );
    assert_eq!(result.critical_path, vec![1, 2]);
}

#[test]
fn zero_duration_milestone_sits_between_its_neighbours() {
    let tasks = vec![
        Task::new(1, "Build", 2.0),
        Task::new(2, "Release", 0.0),
        Task::new(3, "Announce", 1.0),
    ];
    let edges = vec![
        DependencyEdge::finish_to_start(1, 2),
        DependencyEdge::finish_to_start(2, 3),
    ];
    let result = analyze_in_days(&tasks, &edges);
    assert_eq!(early(&result, 2), (2.0, 2.0));
    assert_eq!(early(&result, 3), (2.0, 3.0));
    assert_eq!(result.critical_path, vec![1, 2, 3]);
}
