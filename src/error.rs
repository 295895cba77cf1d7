use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scenario value for `{key}` is {value}, expected -50..=100")]
    Scenario { key: &'static str, value: i32 },

    #[error("invalid filter: {0}")]
    Filter(String),

    #[error("no `{field}` column found in {file}")]
    MissingColumn { field: &'static str, file: String },
}

pub type Result<T> = std::result::Result<T, ReportError>;
