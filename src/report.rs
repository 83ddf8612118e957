use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{format_number, GroupSummary, TestMethod, TestOutcome, TestResult};
use crate::views::{CategoricalReport, Overview, QuantitativeReport};

const NO_DATA: &str = "—";

pub fn significance_label(significant: bool) -> &'static str {
    if significant {
        "Sí"
    } else {
        "No"
    }
}

/// Display rounding only; computations keep full precision.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn method_label(method: TestMethod) -> &'static str {
    match method {
        TestMethod::MannWhitneyExact => "exact",
        TestMethod::MannWhitneyAsymptotic => "asymptotic",
        TestMethod::ChiSquared => "pearson",
        TestMethod::ChiSquaredYates => "yates",
    }
}

pub fn summary_row(summary: &GroupSummary) -> [String; 6] {
    let Some(stats) = &summary.stats else {
        return [
            summary.variable.clone(),
            summary.cohort.clone(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
            NO_DATA.to_string(),
        ];
    };

    [
        summary.variable.clone(),
        summary.cohort.clone(),
        format!("{:.2} ± {:.2}", stats.mean, stats.std_dev),
        format!("{:.2} [{:.2}]", stats.median, stats.iqr),
        format!("{} – {}", format_number(stats.min), format_number(stats.max)),
        format_number(stats.mode),
    ]
}

fn table_header(output: &mut String, headers: &[&str]) {
    let _ = writeln!(output, "| {} |", headers.join(" | "));
    let _ = writeln!(
        output,
        "|{}",
        headers.iter().map(|_| "---|").collect::<String>()
    );
}

fn table_row<I, S>(output: &mut String, cells: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let cells: Vec<S> = cells.into_iter().collect();
    let cells: Vec<&str> = cells.iter().map(AsRef::as_ref).collect();
    let _ = writeln!(output, "| {} |", cells.join(" | "));
}

pub fn render_overview(overview: &Overview) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "## Dataset overview");
    let _ = writeln!(
        output,
        "Rows and columns: ({}, {})",
        overview.row_count, overview.column_count
    );
    let _ = writeln!(output, "Cohorts: {}", overview.cohorts.join(", "));
    let _ = writeln!(output);

    let headers: Vec<&str> = overview.columns.iter().map(String::as_str).collect();
    table_header(&mut output, &headers);
    for row in &overview.rows {
        table_row(&mut output, row);
    }
    if overview.rows.len() < overview.row_count {
        let _ = writeln!(
            output,
            "\n_{} of {} rows shown._",
            overview.rows.len(),
            overview.row_count
        );
    }

    output
}

pub fn render_quantitative(report: &QuantitativeReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "## Descriptive statistics by cohort");
    table_header(
        &mut output,
        &["Variable", "Cohort", "Mean ± SD", "Median [IQR]", "Min – Max", "Mode"],
    );
    for summary in &report.summaries {
        table_row(&mut output, summary_row(summary));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Mann-Whitney U test by variable");
    table_header(&mut output, &["Variable", "U", "p-value", "p < 0.05", "Method"]);
    for outcome in &report.tests {
        match outcome {
            TestOutcome::Tested(result) => table_row(
                &mut output,
                [
                    result.variable.clone(),
                    format_number(result.statistic),
                    format!("{:.4}", result.p_value),
                    significance_label(result.significant).to_string(),
                    method_label(result.method).to_string(),
                ],
            ),
            TestOutcome::Undefined { variable, reason } => table_row(
                &mut output,
                [variable.as_str(), NO_DATA, NO_DATA, NO_DATA, reason.as_str()],
            ),
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Distribution of {}", report.selected);
    for series in &report.series {
        let values: Vec<String> = series.values.iter().map(|v| format_number(*v)).collect();
        match &series.summary {
            Some(stats) => {
                let _ = writeln!(
                    output,
                    "- {} (n={}): min {} · median {:.2} · max {} · IQR {:.2}",
                    series.cohort,
                    series.values.len(),
                    format_number(stats.min),
                    stats.median,
                    format_number(stats.max),
                    stats.iqr
                );
            }
            None => {
                let _ = writeln!(output, "- {} (n=0): no data", series.cohort);
            }
        }
        if !values.is_empty() {
            let _ = writeln!(output, "  values: {}", values.join(", "));
        }
    }

    output
}

pub fn chi_squared_row(result: &TestResult) -> [String; 4] {
    [
        result.variable.clone(),
        format!("{}", round_to(result.statistic, 3)),
        format!("{}", round_to(result.p_value, 4)),
        significance_label(result.significant).to_string(),
    ]
}

pub fn render_categorical(report: &CategoricalReport) -> String {
    let mut output = String::new();
    let table = &report.table;

    let _ = writeln!(output, "## Distribution of {} (% of cohort)", report.selected);
    let mut headers = vec!["Category"];
    headers.extend(table.cohorts.iter().map(String::as_str));
    table_header(&mut output, &headers);
    for (row, category) in table.categories.iter().enumerate() {
        let mut cells = vec![category.clone()];
        for column in 0..table.cohorts.len() {
            cells.push(format!(
                "{:.1} ({})",
                table.percent(row, column),
                table.counts[row][column]
            ));
        }
        table_row(&mut output, &cells);
    }
    if table.missing.iter().any(|&count| count > 0) {
        let missing: Vec<String> = table
            .cohorts
            .iter()
            .zip(&table.missing)
            .map(|(cohort, count)| format!("{cohort}: {count}"))
            .collect();
        let _ = writeln!(output, "\n_Missing values excluded ({})._", missing.join(", "));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Chi-squared test by variable");
    if report.tests.is_empty() {
        let _ = writeln!(output, "No variable has at least two categories in two cohorts.");
    } else {
        table_header(&mut output, &["Variable", "Chi²", "p-value", "p < 0.05"]);
        for result in &report.tests {
            table_row(&mut output, chi_squared_row(result));
        }
    }

    output
}

pub fn build_report(
    source: &str,
    generated_on: NaiveDate,
    overview: &Overview,
    quantitative: &QuantitativeReport,
    categorical: &CategoricalReport,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Exploratory analysis: offenders vs control");
    let _ = writeln!(output, "Generated on {} from {}", generated_on, source);
    let _ = writeln!(output);
    output.push_str(&render_overview(overview));
    let _ = writeln!(output);
    output.push_str(&render_quantitative(quantitative));
    let _ = writeln!(output);
    output.push_str(&render_categorical(categorical));

    output
}
