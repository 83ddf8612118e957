use serde::Serialize;

/// A single cell of a loaded record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Category key for cross-tabulation. Numeric codes are rendered the
    /// same way they are displayed.
    pub fn as_category(&self) -> Option<String> {
        match self {
            Value::Number(value) => Some(format_number(*value)),
            Value::Text(text) => Some(text.clone()),
            Value::Missing => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Value::Number(value) => format_number(*value),
            Value::Text(text) => text.clone(),
            Value::Missing => String::new(),
        }
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    pub cohort: String,
    pub values: Vec<Value>,
}

/// Descriptive statistics for the present values of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptives {
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub iqr: f64,
    pub min: f64,
    pub max: f64,
    pub mode: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub variable: String,
    pub cohort: String,
    pub count: usize,
    pub missing: usize,
    /// `None` when the group has no present values.
    pub stats: Option<Descriptives>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyCell {
    pub category: String,
    pub cohort: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub variable: String,
    pub categories: Vec<String>,
    pub cohorts: Vec<String>,
    /// Row-major: `counts[category][cohort]`.
    pub counts: Vec<Vec<usize>>,
    pub missing: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMethod {
    MannWhitneyExact,
    MannWhitneyAsymptotic,
    ChiSquared,
    ChiSquaredYates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub variable: String,
    pub method: TestMethod,
    pub statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dof: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Tested(TestResult),
    Undefined { variable: String, reason: String },
}

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;
