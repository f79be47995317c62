use std::io::{self, Write};

use critical_path::persistence::{
    export_analysis_to_csv, load_schedule_from_csv, load_schedule_from_json, save_analysis_to_json,
    save_schedule_to_json,
};
use critical_path::{AnalysisConfig, DependencyEdge, DependencyType, Schedule, Task, logging};

fn render_row<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for (ci, cell) in cells.enumerate() {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
        line.push_str(" |");
    }
    line
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&widths, headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(&widths, row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn render_schedule(schedule: &Schedule) -> String {
    let analysis = schedule.last_analysis();
    let rows: Vec<Vec<String>> = schedule
        .tasks()
        .iter()
        .map(|task| {
            let mut row = vec![
                task.id.to_string(),
                task.title.clone(),
                task.duration.to_string(),
                task.fixed_start_offset_days
                    .map(|offset| offset.to_string())
                    .unwrap_or_default(),
            ];
            match analysis.and_then(|result| result.node(task.id)) {
                Some(node) => {
                    row.push(node.earliest_start.to_string());
                    row.push(node.earliest_finish.to_string());
                    row.push(node.latest_start.to_string());
                    row.push(node.latest_finish.to_string());
                    row.push(node.float.to_string());
                    row.push(if node.is_critical { "yes" } else { "" }.to_string());
                }
                None => row.extend(std::iter::repeat_n(String::new(), 6)),
            }
            row
        })
        .collect();

    let mut out = render_text_table(
        &["id", "title", "duration", "start_offset", "es", "ef", "ls", "lf", "float", "critical"],
        &rows,
    );

    if !schedule.dependencies().is_empty() {
        let dep_rows: Vec<Vec<String>> = schedule
            .dependencies()
            .iter()
            .map(|edge| {
                vec![
                    edge.predecessor_id.to_string(),
                    edge.successor_id.to_string(),
                    edge.dependency_type.to_string(),
                    edge.lag_days.to_string(),
                    edge.active.to_string(),
                ]
            })
            .collect();
        out.push_str(&render_text_table(
            &["predecessor", "successor", "type", "lag_days", "active"],
            &dep_rows,
        ));
    }
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show tasks and dependencies\n  add <id> <title> <duration> [start_offset_days]\n                                     Upsert a task\n  dep <pred> <succ> [type] [lag_days]\n                                     Add a dependency (type: FS|SS|FF|SF|BLOCKING|SOFT)\n  undep <pred> <succ>                Remove a dependency\n  toggle <pred> <succ>               Activate/deactivate a dependency\n  delete <id>                        Delete a task and its dependencies\n  progress <id> <percent>            Record how far a task has progressed\n  ready                              List tasks that can start now\n  blocked                            List tasks waiting on a predecessor\n  compute                            Run the critical-path analysis\n  float <id>                         Show the schedule bounds of one task\n  stats                              Dependency statistics\n  validate                           Check the schedule for problems\n  save json <path>                   Persist project to disk\n  load json <path>                   Load project from disk\n  import csv <tasks_path> [deps_path]\n                                     Import tasks and dependencies\n  export <json|csv> <path>           Export the latest analysis\n  quit|exit                          Exit"
    );
}

fn main() {
    logging::init_tracing();

    let config = match AnalysisConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration ({e}); using defaults.");
            AnalysisConfig::default()
        }
    };
    let mut schedule = Schedule::new().with_config(config.clone());

    println!("Critical Path Tool (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => println!("{}", render_schedule(&schedule)),
            "add" => {
                let id_s = parts.next();
                let title = parts.next();
                let dur_s = parts.next();
                let offset_s = parts.next();
                match (id_s, title, dur_s) {
                    (Some(id_s), Some(title), Some(dur_s)) => {
                        let id: i64 = match id_s.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid id");
                                continue;
                            }
                        };
                        let duration: f64 = match dur_s.parse() {
                            Ok(v) => v,
                            Err(_) => {
                                println!("Invalid duration");
                                continue;
                            }
                        };
                        let mut task = schedule
                            .find_task(id)
                            .cloned()
                            .unwrap_or_else(|| Task::new(id, title, duration));
                        task.title = title.to_string();
                        task.duration = duration;
                        if let Some(offset_s) = offset_s {
                            match offset_s.parse::<f64>() {
                                Ok(offset) => task.fixed_start_offset_days = Some(offset),
                                Err(_) => {
                                    println!("Invalid start_offset_days");
                                    continue;
                                }
                            }
                        }
                        match schedule.upsert_task_record(task) {
                            Ok(_) => println!("Task upserted."),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: add <id> <title> <duration> [start_offset_days]"),
                }
            }
            "dep" => {
                let pred_s = parts.next();
                let succ_s = parts.next();
                match (pred_s, succ_s) {
                    (Some(pred_s), Some(succ_s)) => {
                        let (Ok(pred), Ok(succ)) = (pred_s.parse::<i64>(), succ_s.parse::<i64>()) else {
                            println!("Invalid task id");
                            continue;
                        };
                        let dependency_type: DependencyType = match parts.next().map(str::parse).transpose() {
                            Ok(kind) => kind.unwrap_or_default(),
                            Err(e) => {
                                println!("Error: {}", e);
                                continue;
                            }
                        };
                        let lag_days: i32 = match parts.next().map(str::parse).transpose() {
                            Ok(lag) => lag.unwrap_or(0),
                            Err(_) => {
                                println!("Invalid lag_days");
                                continue;
                            }
                        };
                        let edge = DependencyEdge::new(pred, succ, dependency_type).with_lag(lag_days);
                        match schedule.add_dependency(edge) {
                            Ok(_) => println!("Dependency {} -> {} added.", pred, succ),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: dep <pred> <succ> [type] [lag_days]"),
                }
            }
            "undep" | "toggle" => {
                let ids = (
                    parts.next().and_then(|s| s.parse::<i64>().ok()),
                    parts.next().and_then(|s| s.parse::<i64>().ok()),
                );
                let (Some(pred), Some(succ)) = ids else {
                    println!("Usage: {} <pred> <succ>", cmd);
                    continue;
                };
                let res = if cmd == "undep" {
                    schedule
                        .remove_dependency(pred, succ)
                        .map(|_| format!("Dependency {} -> {} removed.", pred, succ))
                } else {
                    let active = schedule
                        .find_dependency(pred, succ)
                        .map(|edge| !edge.active)
                        .unwrap_or(true);
                    schedule
                        .set_dependency_active(pred, succ, active)
                        .map(|_| format!("Dependency {} -> {} active={}.", pred, succ, active))
                };
                match res {
                    Ok(message) => println!("{}", message),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "progress" => {
                let id = parts.next().and_then(|s| s.parse::<i64>().ok());
                let percent = parts.next().and_then(|s| s.parse::<u8>().ok());
                let (Some(id), Some(percent)) = (id, percent) else {
                    println!("Usage: progress <id> <percent>");
                    continue;
                };
                let Some(task) = schedule.find_task(id).cloned() else {
                    println!("Task {} not found.", id);
                    continue;
                };
                match schedule.upsert_task_record(task.with_progress(percent)) {
                    Ok(_) => println!("Task {} is {}% complete.", id, percent),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "ready" => {
                let ids: Vec<String> = schedule
                    .tasks_ready_to_start()
                    .iter()
                    .map(|task| task.id.to_string())
                    .collect();
                println!("ready: {}", ids.join(","));
            }
            "blocked" => {
                for (task_id, blockers) in schedule.blocked_tasks() {
                    let waits: Vec<String> = blockers
                        .iter()
                        .map(|edge| format!("{} ({})", edge.predecessor_id, edge.dependency_type))
                        .collect();
                    println!("task {} waits on {}", task_id, waits.join(", "));
                }
            }
            "delete" => match parts.next().map(str::parse::<i64>) {
                Some(Ok(id)) => {
                    if schedule.delete_task(id) {
                        println!("Deleted task {}.", id);
                    } else {
                        println!("Task {} not found.", id);
                    }
                }
                _ => println!("Usage: delete <id>"),
            },
            "compute" => match schedule.refresh() {
                Ok(result) => {
                    println!("Refreshed ({})", result.to_cli_summary());
                    println!("{}", render_schedule(&schedule));
                    for factor in &result.risk_factors {
                        println!("risk: {}", factor);
                    }
                    for recommendation in &result.recommendations {
                        println!("hint: {}", recommendation);
                    }
                }
                Err(e) => println!("Refresh error: {}", e),
            },
            "float" => match parts.next().map(str::parse::<i64>) {
                Some(Ok(id)) => match schedule.task_float(id) {
                    Ok(node) => println!(
                        "task {}: es={} ef={} ls={} lf={} float={} critical={}",
                        node.task_id,
                        node.earliest_start,
                        node.earliest_finish,
                        node.latest_start,
                        node.latest_finish,
                        node.float,
                        node.is_critical
                    ),
                    Err(e) => println!("Error: {}", e),
                },
                _ => println!("Usage: float <id>"),
            },
            "stats" => match schedule.graph() {
                Ok(graph) => {
                    let stats = graph.statistics();
                    println!(
                        "dependencies total={} active={} inactive={}",
                        stats.total, stats.active, stats.inactive
                    );
                    for (kind, count) in &stats.by_type {
                        println!("  {}: {}", kind.display_name(), count);
                    }
                    let independent = graph.independent_tasks();
                    if !independent.is_empty() {
                        let ids: Vec<String> = independent.iter().map(ToString::to_string).collect();
                        println!("independent tasks: {}", ids.join(","));
                    }
                }
                Err(e) => println!("Error: {}", e),
            },
            "validate" => {
                let report = schedule.validate();
                if report.valid {
                    println!("Schedule is valid.");
                }
                for error in &report.errors {
                    println!("error: {}", error);
                }
                for warning in &report.warnings {
                    println!("warning: {}", warning);
                }
            }
            "save" => match (parts.next(), parts.next()) {
                (Some("json"), Some(path)) => match save_schedule_to_json(&schedule, path) {
                    Ok(_) => println!("Schedule saved to {}.", path),
                    Err(e) => println!("Error saving schedule: {}", e),
                },
                _ => println!("Usage: save json <path>"),
            },
            "load" => match (parts.next(), parts.next()) {
                (Some("json"), Some(path)) => match load_schedule_from_json(path) {
                    Ok(loaded) => {
                        schedule = loaded.with_config(config.clone());
                        println!("Schedule loaded from {}.", path);
                        println!("{}", render_schedule(&schedule));
                    }
                    Err(e) => println!("Error loading schedule: {}", e),
                },
                _ => println!("Usage: load json <path>"),
            },
            "import" => match (parts.next(), parts.next(), parts.next()) {
                (Some("csv"), Some(tasks_path), deps_path) => {
                    match load_schedule_from_csv(schedule.metadata().clone(), tasks_path, deps_path) {
                        Ok(loaded) => {
                            schedule = loaded.with_config(config.clone());
                            println!(
                                "Imported {} task(s) and {} dependency(ies).",
                                schedule.tasks().len(),
                                schedule.dependencies().len()
                            );
                        }
                        Err(e) => println!("Error importing: {}", e),
                    }
                }
                _ => println!("Usage: import csv <tasks_path> [deps_path]"),
            },
            "export" => {
                let format = parts.next();
                let path = parts.next();
                let (Some(format), Some(path)) = (format, path) else {
                    println!("Usage: export <json|csv> <path>");
                    continue;
                };
                let result = match schedule.analysis() {
                    Ok(result) => result,
                    Err(e) => {
                        println!("Error: {}", e);
                        continue;
                    }
                };
                let res = match format {
                    "json" => save_analysis_to_json(&result, path),
                    "csv" => export_analysis_to_csv(&schedule, &result, path),
                    _ => {
                        println!("Usage: export <json|csv> <path>");
                        continue;
                    }
                };
                match res {
                    Ok(_) => println!("Analysis exported to {}.", path),
                    Err(e) => println!("Error exporting: {}", e),
                }
            }
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
