use serde::Serialize;
use tracing::debug;

use crate::catalog::{Catalog, VariableKind};
use crate::dataset::Dataset;
use crate::describe;
use crate::error::{AnalysisError, Result};
use crate::frequency;
use crate::hypothesis::{self, Sample};
use crate::models::{
    Descriptives, FrequencyCell, FrequencyTable, GroupSummary, TestOutcome, TestResult, Value,
};

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub cohorts: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSeries {
    pub cohort: String,
    pub values: Vec<f64>,
    pub summary: Option<Descriptives>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantitativeReport {
    pub summaries: Vec<GroupSummary>,
    pub tests: Vec<TestOutcome>,
    pub selected: String,
    pub series: Vec<CohortSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalReport {
    pub selected: String,
    pub table: FrequencyTable,
    pub distribution: Vec<FrequencyCell>,
    pub tests: Vec<TestResult>,
}

/// Raw rows for display; `limit` caps the number of rows returned.
pub fn overview(dataset: &Dataset, limit: Option<usize>) -> Overview {
    let rows: Vec<Vec<String>> = dataset
        .records()
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|record| record.values.iter().map(Value::display).collect())
        .collect();

    Overview {
        columns: dataset.columns().to_vec(),
        row_count: dataset.row_count(),
        column_count: dataset.column_count(),
        cohorts: dataset.cohorts().to_vec(),
        rows,
    }
}

pub fn quantitative_report(
    dataset: &Dataset,
    catalog: &Catalog,
    selected: &str,
) -> Result<QuantitativeReport> {
    ensure_kind(catalog, selected, VariableKind::Quantitative)?;
    let variables = catalog.quantitative();

    let summaries = describe::summarize_all(dataset, &variables)?;

    let mut tests = Vec::with_capacity(variables.len());
    for variable in &variables {
        tests.push(compare_cohorts(dataset, catalog, variable)?);
    }

    let mut series = Vec::with_capacity(dataset.cohorts().len());
    for cohort in dataset.cohorts() {
        let values = dataset.numeric_sample(selected, cohort)?;
        series.push(CohortSeries {
            cohort: cohort.clone(),
            summary: describe::describe(&values),
            values,
        });
    }

    Ok(QuantitativeReport {
        summaries,
        tests,
        selected: selected.to_string(),
        series,
    })
}

fn compare_cohorts(dataset: &Dataset, catalog: &Catalog, variable: &str) -> Result<TestOutcome> {
    let pair = &catalog.comparison;
    let first = dataset.numeric_sample(variable, &pair.first)?;
    let second = dataset.numeric_sample(variable, &pair.second)?;

    let outcome = hypothesis::mann_whitney_u(
        variable,
        Sample {
            cohort: &pair.first,
            values: &first,
        },
        Sample {
            cohort: &pair.second,
            values: &second,
        },
    );

    match outcome {
        Ok(result) => Ok(TestOutcome::Tested(result)),
        Err(err @ AnalysisError::EmptySample { .. }) => {
            debug!(variable, error = %err, "mann-whitney test undefined");
            Ok(TestOutcome::Undefined {
                variable: variable.to_string(),
                reason: err.to_string(),
            })
        }
        Err(err) => Err(err),
    }
}

pub fn categorical_report(
    dataset: &Dataset,
    catalog: &Catalog,
    selected: &str,
    yates: bool,
) -> Result<CategoricalReport> {
    ensure_kind(catalog, selected, VariableKind::Categorical)?;

    let table = frequency::crosstab(dataset, selected)?;
    let distribution = table.cells();

    let mut tests = Vec::new();
    for variable in catalog.categorical() {
        let observed = frequency::crosstab(dataset, variable)?.observed();
        match hypothesis::chi_squared(variable, &observed, yates) {
            Ok(result) => tests.push(result),
            Err(err @ AnalysisError::DegenerateTable { .. }) => {
                debug!(variable, error = %err, "chi-squared test skipped");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(CategoricalReport {
        selected: selected.to_string(),
        table,
        distribution,
        tests,
    })
}

fn ensure_kind(catalog: &Catalog, variable: &str, kind: VariableKind) -> Result<()> {
    if catalog.kind_of(variable) == Some(kind) {
        Ok(())
    } else {
        Err(AnalysisError::UnknownVariable {
            variable: variable.to_string(),
            kind: kind.label(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ComparisonPair, Variable};
    use crate::dataset::{load_from_reader, CsvFormat};

    fn catalog() -> Catalog {
        let variable = |name: &str, kind| Variable {
            name: name.to_string(),
            kind,
        };
        Catalog {
            cohort_column: "sujeto".to_string(),
            comparison: ComparisonPair {
                first: "Infractor".to_string(),
                second: "control".to_string(),
            },
            variables: vec![
                variable("vs_edad", VariableKind::Quantitative),
                variable("pc_moca", VariableKind::Quantitative),
                variable("vs_tienehijos", VariableKind::Categorical),
                variable("vs_pandillismo", VariableKind::Categorical),
            ],
        }
    }

    fn dataset() -> Dataset {
        let csv = "sujeto,vs_edad,pc_moca,vs_tienehijos,vs_pandillismo\n\
                   Infractor,15,,Sí,Sí\n\
                   Infractor,17,,No,Sí\n\
                   control,20,26,Sí,Sí\n\
                   control,22,27,No,Sí\n";
        load_from_reader(csv.as_bytes(), &catalog(), CsvFormat::default()).unwrap()
    }

    #[test]
    fn overview_reports_shape_and_rows() {
        let data = dataset();
        let view = overview(&data, Some(2));
        assert_eq!(view.row_count, 4);
        assert_eq!(view.column_count, 5);
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0], vec!["Infractor", "15", "", "Sí", "Sí"]);
        assert_eq!(overview(&data, None).rows.len(), 4);
    }

    #[test]
    fn quantitative_report_covers_every_variable_and_cohort() {
        let data = dataset();
        let report = quantitative_report(&data, &catalog(), "vs_edad").unwrap();

        assert_eq!(report.summaries.len(), 4);
        let infractor = report.summaries[0].stats.as_ref().unwrap();
        assert_eq!(infractor.mean, 16.0);
        assert_eq!(infractor.min, 15.0);
        assert_eq!(infractor.max, 17.0);

        assert_eq!(report.tests.len(), 2);
        match &report.tests[0] {
            TestOutcome::Tested(result) => {
                assert_eq!(result.variable, "vs_edad");
                assert_eq!(result.statistic, 0.0);
                assert!(!result.significant);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(
            &report.tests[1],
            TestOutcome::Undefined { variable, .. } if variable == "pc_moca"
        ));

        assert_eq!(report.series.len(), 2);
        assert_eq!(report.series[1].cohort, "control");
        assert_eq!(report.series[1].values, vec![20.0, 22.0]);
    }

    #[test]
    fn reports_are_idempotent() {
        let data = dataset();
        let catalog = catalog();
        assert_eq!(
            quantitative_report(&data, &catalog, "pc_moca").unwrap(),
            quantitative_report(&data, &catalog, "pc_moca").unwrap()
        );
        assert_eq!(
            categorical_report(&data, &catalog, "vs_tienehijos", true).unwrap(),
            categorical_report(&data, &catalog, "vs_tienehijos", true).unwrap()
        );
    }

    #[test]
    fn categorical_report_skips_single_category_variables() {
        let data = dataset();
        let report = categorical_report(&data, &catalog(), "vs_tienehijos", true).unwrap();

        assert!(report
            .distribution
            .iter()
            .all(|cell| (cell.percent - 50.0).abs() < 1e-9));
        assert_eq!(report.tests.len(), 1);
        assert_eq!(report.tests[0].variable, "vs_tienehijos");
    }

    #[test]
    fn selection_must_match_declared_kind() {
        let data = dataset();
        assert!(matches!(
            quantitative_report(&data, &catalog(), "vs_tienehijos"),
            Err(AnalysisError::UnknownVariable { .. })
        ));
        assert!(matches!(
            categorical_report(&data, &catalog(), "nope", false),
            Err(AnalysisError::UnknownVariable { .. })
        ));
    }
}
