use tracing::debug;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::models::{Descriptives, GroupSummary};

pub fn summarize_variable(dataset: &Dataset, variable: &str) -> Result<Vec<GroupSummary>> {
    let mut summaries = Vec::with_capacity(dataset.cohorts().len());

    for cohort in dataset.cohorts() {
        let mut present = Vec::new();
        let mut missing = 0usize;
        for value in dataset.cohort_values(variable, cohort)? {
            match value.as_number() {
                Some(number) => present.push(number),
                None => missing += 1,
            }
        }

        let stats = describe(&present);
        if stats.is_none() {
            debug!(variable, cohort = %cohort, "group has no present values");
        }

        summaries.push(GroupSummary {
            variable: variable.to_string(),
            cohort: cohort.clone(),
            count: present.len(),
            missing,
            stats,
        });
    }

    Ok(summaries)
}

pub fn summarize_all(dataset: &Dataset, variables: &[&str]) -> Result<Vec<GroupSummary>> {
    let mut summaries = Vec::new();
    for variable in variables {
        summaries.extend(summarize_variable(dataset, variable)?);
    }
    Ok(summaries)
}

pub fn describe(values: &[f64]) -> Option<Descriptives> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = mean(values);
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);

    Some(Descriptives {
        mean,
        std_dev: sample_std_dev(values, mean),
        median: quantile(&sorted, 0.5),
        iqr: q3 - q1,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mode: mode(values)?,
    })
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let squares: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
    (squares / (values.len() - 1) as f64).sqrt()
}

/// Linear interpolation between closest ranks; `sorted` must be ascending
/// and non-empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

// Ties go to the value seen first.
pub fn mode(values: &[f64]) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}
