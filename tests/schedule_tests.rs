use chrono::NaiveDate;
use critical_path::{
    AnalysisConfig, CalendarError, DependencyEdge, DependencyType, EdgeRef, GraphError, ProjectMetadata,
    Schedule, ScheduleError, Task, WorkCalendar,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Monday 2026-01-05 start, analysis in days.
fn workspace() -> Schedule {
    let metadata = ProjectMetadata::new("Launch", d(2026, 1, 5));
    let mut schedule = Schedule::new_with_metadata(metadata).with_config(AnalysisConfig::in_days());
    schedule.upsert_task(1, "Design", 2.0).unwrap();
    schedule.upsert_task(2, "Build", 3.0).unwrap();
    schedule.upsert_task(3, "Test", 1.0).unwrap();
    schedule
        .add_dependency(DependencyEdge::finish_to_start(1, 2))
        .unwrap();
    schedule
        .add_dependency(DependencyEdge::finish_to_start(2, 3))
        .unwrap();
    schedule
}

#[test]
fn add_dependency_rejects_bad_edges() {
    let mut schedule = workspace();

    let err = schedule
        .add_dependency(DependencyEdge::finish_to_start(1, 42))
        .unwrap_err();
    assert_eq!(err, ScheduleError::UnknownTask { id: 42 });

    let err = schedule
        .add_dependency(DependencyEdge::finish_to_start(2, 2))
        .unwrap_err();
    assert_eq!(err, ScheduleError::Graph(GraphError::SelfDependency { id: 2 }));

    let err = schedule
        .add_dependency(DependencyEdge::new(1, 2, DependencyType::StartToStart))
        .unwrap_err();
    assert_eq!(
        err,
        ScheduleError::DuplicateDependency {
            predecessor_id: 1,
            successor_id: 2,
        }
    );

    let err = schedule
        .add_dependency(DependencyEdge::finish_to_start(3, 1))
        .unwrap_err();
    assert_eq!(
        err,
        ScheduleError::Graph(GraphError::CyclicDependency { cycle: vec![1, 2, 3] })
    );
    assert_eq!(schedule.dependencies().len(), 2);
}

#[test]
fn inactive_back_edge_is_accepted_but_cannot_be_activated() {
    let mut schedule = workspace();
    schedule
        .add_dependency(DependencyEdge::finish_to_start(3, 1).inactive())
        .unwrap();
    assert!(schedule.refresh().is_ok());

    let err = schedule.set_dependency_active(3, 1, true).unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::Graph(GraphError::CyclicDependency { .. })
    ));
    assert!(!schedule.find_dependency(3, 1).unwrap().active);
}

#[test]
fn deleting_a_task_drops_its_dependencies() {
    let mut schedule = workspace();
    assert!(schedule.delete_task(2));
    assert!(!schedule.delete_task(2));
    assert!(schedule.dependencies().is_empty());

    let result = schedule.refresh().unwrap();
    assert_eq!(result.total_duration, 2.0);
    assert_eq!(result.total_task_count, 2);
}

#[test]
fn toggling_a_dependency_changes_float() {
    let mut schedule = workspace();
    let node = schedule.task_float(3).unwrap();
    assert_eq!(node.float, 0.0);
    assert_eq!(node.earliest_start, 5.0);

    schedule.set_dependency_active(2, 3, false).unwrap();
    let node = schedule.task_float(3).unwrap();
    assert_eq!(node.earliest_start, 0.0);
    assert_eq!(node.float, 4.0);

    assert_eq!(schedule.deactivate_dependencies_for_task(2), 1);
    assert_eq!(schedule.reactivate_dependencies_for_task(2).unwrap(), 2);
    assert_eq!(schedule.task_float(3).unwrap().float, 0.0);
}

#[test]
fn task_float_of_unknown_task_fails() {
    let mut schedule = workspace();
    assert_eq!(
        schedule.task_float(99).unwrap_err(),
        ScheduleError::UnknownTask { id: 99 }
    );
}

#[test]
fn update_and_remove_dependency() {
    let mut schedule = workspace();
    schedule
        .update_dependency(DependencyEdge::finish_to_start(1, 2).with_lag(2))
        .unwrap();
    assert_eq!(schedule.refresh().unwrap().total_duration, 8.0);

    let removed = schedule.remove_dependency(1, 2).unwrap();
    assert_eq!(removed.lag_days, 2);
    assert_eq!(
        schedule.remove_dependency(1, 2).unwrap_err(),
        ScheduleError::DependencyNotFound {
            predecessor_id: 1,
            successor_id: 2,
        }
    );
    assert_eq!(schedule.refresh().unwrap().total_duration, 4.0);
}

#[test]
fn invalid_task_duration_is_rejected() {
    let mut schedule = workspace();
    let err = schedule.upsert_task(4, "Broken", -1.0).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidTask(_)));
    assert_eq!(schedule.tasks().len(), 3);
}

#[test]
fn fixed_start_date_resolves_through_the_calendar() {
    let mut schedule = workspace();
    schedule
        .upsert_task_record(Task::new(4, "Kickoff review", 1.0).with_fixed_start_date(d(2026, 1, 12)))
        .unwrap();

    let resolved = schedule.resolved_tasks();
    let review = resolved.iter().find(|task| task.id == 4).unwrap();
    assert_eq!(review.fixed_start_offset_days, Some(5.0));

    let node = schedule.task_float(4).unwrap();
    assert_eq!(node.earliest_start, 5.0);
    assert_eq!(node.earliest_finish, 6.0);
}

#[test]
fn task_dates_follow_working_days() {
    let mut schedule = workspace();
    let result = schedule.refresh().unwrap();
    let dates = schedule.task_dates(&result).unwrap();

    let design = dates.iter().find(|dates| dates.task_id == 1).unwrap();
    assert_eq!(design.early_start, d(2026, 1, 5));
    assert_eq!(design.early_finish, d(2026, 1, 6));

    let build = dates.iter().find(|dates| dates.task_id == 2).unwrap();
    assert_eq!(build.early_start, d(2026, 1, 7));
    assert_eq!(build.early_finish, d(2026, 1, 9));

    let test = dates.iter().find(|dates| dates.task_id == 3).unwrap();
    // the weekend is skipped
    assert_eq!(test.early_start, d(2026, 1, 12));
    assert_eq!(schedule.finish_date(&result).unwrap(), Some(d(2026, 1, 12)));
}

#[test]
fn validate_reports_warnings_without_mutating() {
    let mut schedule = workspace();
    schedule.upsert_task(4, "Milestone", 0.0).unwrap();
    schedule
        .add_dependency(DependencyEdge::new(3, 4, DependencyType::Soft))
        .unwrap();
    schedule
        .add_dependency(DependencyEdge::finish_to_start(1, 4).inactive())
        .unwrap();

    let report = schedule.validate();
    assert!(report.valid);
    assert!(report.errors.is_empty());
    assert_eq!(report.warnings.len(), 3);
    assert!(report.warnings.iter().any(|w| w.contains("zero duration")));
    assert!(schedule.last_analysis().is_none());
}

#[test]
fn goal_date_overrun_is_a_warning() {
    let mut schedule = workspace();
    let metadata = schedule.metadata().clone().with_goal_date(d(2026, 1, 8));
    schedule.set_metadata(metadata);

    let report = schedule.validate();
    assert!(report.valid);
    assert!(report.warnings.iter().any(|w| w.contains("goal date")));
}

#[test]
fn statistics_count_types_and_states() {
    let mut schedule = workspace();
    schedule.upsert_task(4, "Docs", 1.0).unwrap();
    schedule
        .add_dependency(DependencyEdge::new(1, 4, DependencyType::StartToStart).inactive())
        .unwrap();

    let stats = schedule.dependency_statistics().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.active, 2);
    assert_eq!(stats.inactive, 1);
    assert_eq!(stats.by_type.get(&DependencyType::FinishToStart), Some(&2));
    assert_eq!(stats.by_type.get(&DependencyType::StartToStart), Some(&1));
}

#[test]
fn replace_all_is_atomic() {
    let mut schedule = workspace();
    let tasks = vec![Task::new(1, "A", 1.0), Task::new(2, "B", 1.0)];
    let cyclic = vec![
        DependencyEdge::finish_to_start(1, 2),
        DependencyEdge::finish_to_start(2, 1),
    ];
    assert!(schedule.replace_all(tasks.clone(), cyclic).is_err());
    assert_eq!(schedule.tasks().len(), 3);

    schedule.replace_all(tasks, Vec::new()).unwrap();
    assert_eq!(schedule.tasks().len(), 2);
    assert!(schedule.dependencies().is_empty());
}

#[test]
fn holidays_apply_beyond_the_goal_year() {
    let metadata = ProjectMetadata::new("Two seasons", d(2026, 1, 5)).with_goal_date(d(2026, 6, 30));
    let mut schedule = Schedule::new_with_metadata(metadata).with_config(AnalysisConfig::in_days());
    schedule.upsert_task(1, "Build season", 632.0).unwrap();
    schedule.upsert_task(2, "Ship", 1.0).unwrap();
    schedule
        .add_dependency(DependencyEdge::finish_to_start(1, 2))
        .unwrap();

    let result = schedule.refresh().unwrap();
    let dates = schedule.task_dates(&result).unwrap();
    let build = dates.iter().find(|dates| dates.task_id == 1).unwrap();
    let ship = dates.iter().find(|dates| dates.task_id == 2).unwrap();
    // Tue 2028-07-04 is skipped
    assert_eq!(build.early_finish, d(2028, 7, 3));
    assert_eq!(ship.early_start, d(2028, 7, 5));

    let metadata = schedule.metadata().clone().with_goal_date(d(2026, 12, 31));
    schedule.set_metadata(metadata);
    let result = schedule.refresh().unwrap();
    assert_eq!(schedule.finish_date(&result).unwrap(), Some(d(2028, 7, 5)));
}

#[test]
fn oversized_duration_fails_date_projection_cleanly() {
    let metadata = ProjectMetadata::new("p", d(2026, 1, 5)).with_goal_date(d(2026, 4, 1));
    let mut schedule = Schedule::new_with_metadata(metadata).with_config(AnalysisConfig::in_days());
    schedule.set_calendar(WorkCalendar::continuous());
    schedule.upsert_task(1, "huge", 2.0e8).unwrap();

    let result = schedule.refresh().unwrap();
    assert_eq!(result.total_duration, 2.0e8);
    assert!(matches!(
        schedule.finish_date(&result).unwrap_err(),
        ScheduleError::Calendar(CalendarError::OutOfRange { .. })
    ));

    let report = schedule.validate();
    assert!(report.valid);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("beyond the supported date range")));
}

#[test]
fn readiness_follows_predecessor_progress() {
    let mut schedule = workspace();
    schedule.upsert_task(4, "Docs", 1.0).unwrap();
    schedule
        .add_dependency(DependencyEdge::new(1, 4, DependencyType::StartToStart))
        .unwrap();

    let ready: Vec<_> = schedule.tasks_ready_to_start().iter().map(|task| task.id).collect();
    assert_eq!(ready, vec![1]);
    assert_eq!(
        schedule.blocked_tasks().keys().copied().collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
    assert!(schedule.can_task_start(1).unwrap());
    assert!(!schedule.can_task_start(2).unwrap());
    assert_eq!(
        schedule.blocking_dependencies(99).unwrap_err(),
        ScheduleError::UnknownTask { id: 99 }
    );

    let started = schedule.find_task(1).unwrap().clone().with_progress(50);
    schedule.upsert_task_record(started).unwrap();
    let ready: Vec<_> = schedule.tasks_ready_to_start().iter().map(|task| task.id).collect();
    assert_eq!(ready, vec![4]);
    let blockers = schedule.blocking_dependencies(2).unwrap();
    assert_eq!(blockers.len(), 1);
    assert_eq!(blockers[0].predecessor_id, 1);

    let done = schedule.find_task(1).unwrap().clone().with_progress(100);
    schedule.upsert_task_record(done).unwrap();
    let ready: Vec<_> = schedule.tasks_ready_to_start().iter().map(|task| task.id).collect();
    assert_eq!(ready, vec![2, 4]);
    let blocked = schedule.blocked_tasks();
    assert_eq!(blocked.keys().copied().collect::<Vec<_>>(), vec![3]);
    assert_eq!(blocked[&3][0].predecessor_id, 2);
}

#[test]
fn bulk_dependency_edits_apply_what_they_can() {
    let mut schedule = workspace();
    schedule.upsert_task(4, "Docs", 1.0).unwrap();

    let outcome = schedule.add_dependencies(vec![
        DependencyEdge::finish_to_start(1, 4),
        DependencyEdge::finish_to_start(3, 1),
        DependencyEdge::finish_to_start(1, 2),
        DependencyEdge::finish_to_start(4, 99),
        DependencyEdge::new(2, 4, DependencyType::StartToStart),
    ]);
    assert_eq!(
        outcome.applied,
        vec![
            EdgeRef::from(&DependencyEdge::finish_to_start(1, 4)),
            EdgeRef::from(&DependencyEdge::new(2, 4, DependencyType::StartToStart)),
        ]
    );
    assert_eq!(outcome.rejected.len(), 3);
    assert!(outcome.rejected[0].reason.contains("cyclic dependency"));
    assert!(outcome.rejected[1].reason.contains("already exists"));
    assert_eq!(outcome.rejected[2].successor_id, 99);
    assert_eq!(schedule.dependencies().len(), 4);

    let updated = schedule.update_dependency_types(&[(1, 4), (2, 4), (7, 8)], DependencyType::Soft);
    assert_eq!(updated, 2);
    assert!(schedule
        .dependencies()
        .iter()
        .filter(|edge| edge.successor_id == 4)
        .all(|edge| edge.dependency_type == DependencyType::Soft));
    assert_eq!(schedule.task_float(4).unwrap().earliest_start, 0.0);

    let removed = schedule.remove_dependencies(&[(1, 4), (1, 4), (2, 3)]);
    assert_eq!(removed.len(), 2);
    assert_eq!(schedule.dependencies().len(), 2);
    assert!(schedule.find_dependency(2, 3).is_none());
}

#[test]
fn long_lags_are_external_constraints_and_high_risk() {
    let mut schedule = workspace();
    schedule
        .update_dependency(DependencyEdge::finish_to_start(1, 2).with_lag(3))
        .unwrap();
    schedule.upsert_task(4, "Docs", 1.0).unwrap();
    schedule
        .add_dependency(DependencyEdge::finish_to_start(3, 4).with_lag(6).inactive())
        .unwrap();

    let external = schedule.external_constraints(2).unwrap();
    assert_eq!(external.len(), 1);
    assert!(external[0].connects(1, 2));
    assert!(schedule.external_constraints(7).unwrap().is_empty());

    let result = schedule.refresh().unwrap();
    assert_eq!(result.high_risk_task_ids, vec![2]);
}
