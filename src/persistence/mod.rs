use crate::schedule::ScheduleError;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub mod file;

pub use file::{
    export_analysis_to_csv, load_dependencies_from_csv, load_schedule_from_csv,
    load_schedule_from_json, load_tasks_from_csv, save_analysis_to_json, save_dependencies_to_csv,
    save_schedule_to_json, save_tasks_to_csv,
};
