use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssignError {
    /// A mandatory input table is missing or empty. The engine refuses to
    /// start; an empty rule table is fine, distances and branches are not.
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("origin {0:?} has no state suffix")]
    OriginState(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
