use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("declared column `{column}` is missing from the dataset")]
    Schema { column: String },

    #[error("row {row}: cohort label is empty")]
    EmptyCohort { row: usize },

    #[error("row {row}: column `{column}` has non-numeric value `{value}`")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("`{variable}` is not declared as a {kind} variable")]
    UnknownVariable { variable: String, kind: &'static str },

    #[error("variable `{0}` is declared more than once")]
    DuplicateVariable(String),

    #[error("`{variable}` has no values for cohort `{cohort}`")]
    EmptySample { variable: String, cohort: String },

    #[error("contingency table for `{variable}` is {rows}x{columns}, need at least 2x2")]
    DegenerateTable {
        variable: String,
        rows: usize,
        columns: usize,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
