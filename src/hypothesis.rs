use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::error::{AnalysisError, Result};
use crate::models::{TestMethod, TestResult, SIGNIFICANCE_LEVEL};

const EXACT_MAX_SAMPLE: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub cohort: &'a str,
    pub values: &'a [f64],
}

/// Two-sided Mann-Whitney U test. The statistic is U for `first`.
pub fn mann_whitney_u(variable: &str, first: Sample<'_>, second: Sample<'_>) -> Result<TestResult> {
    for sample in [first, second] {
        if sample.values.is_empty() {
            return Err(AnalysisError::EmptySample {
                variable: variable.to_string(),
                cohort: sample.cohort.to_string(),
            });
        }
    }

    let n1 = first.values.len();
    let n2 = second.values.len();
    let (ranks, tie_term) = rank(first.values.iter().chain(second.values).copied().collect());

    let rank_sum: f64 = ranks[..n1].iter().sum();
    let u1 = rank_sum - (n1 * (n1 + 1)) as f64 / 2.0;
    let u_max = u1.max((n1 * n2) as f64 - u1);

    let (method, p_value) = if tie_term == 0.0 && n1.min(n2) <= EXACT_MAX_SAMPLE {
        (TestMethod::MannWhitneyExact, exact_p_value(u_max, n1, n2))
    } else {
        (
            TestMethod::MannWhitneyAsymptotic,
            asymptotic_p_value(u_max, n1, n2, tie_term),
        )
    };
    let p_value = p_value.clamp(0.0, 1.0);

    Ok(TestResult {
        variable: variable.to_string(),
        method,
        statistic: u1,
        p_value,
        significant: p_value < SIGNIFICANCE_LEVEL,
        dof: None,
    })
}

// Ranks are 1-based and averaged over ties; the tie term is sum(t^3 - t).
fn rank(values: Vec<f64>) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let average = (start + end + 1) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = average;
        }
        let t = (end - start) as f64;
        tie_term += t * t * t - t;
        start = end;
    }

    (ranks, tie_term)
}

fn exact_p_value(u_max: f64, n1: usize, n2: usize) -> f64 {
    let frequencies = u_frequencies(n1.min(n2), n1.max(n2));
    let total: f64 = frequencies.iter().sum();
    let start = u_max.round() as usize;
    let upper_tail: f64 = frequencies.iter().skip(start).sum();
    2.0 * upper_tail / total
}

/// Number of orderings producing each U value for samples of size `m` and
/// `n`: the coefficients of the Gaussian binomial [m + n choose m].
fn u_frequencies(m: usize, n: usize) -> Vec<f64> {
    let mut coefficients = vec![1.0];
    for i in 1..=m {
        let shift = n + i;
        let mut next = vec![0.0; coefficients.len() + shift];
        for (k, &value) in coefficients.iter().enumerate() {
            next[k] += value;
            next[k + shift] -= value;
        }
        for k in i..next.len() {
            next[k] += next[k - i];
        }
        coefficients = next;
    }
    coefficients.truncate(m * n + 1);
    coefficients
}

fn asymptotic_p_value(u_max: f64, n1: usize, n2: usize, tie_term: f64) -> f64 {
    let (n1, n2) = (n1 as f64, n2 as f64);
    let n = n1 + n2;
    let mean = n1 * n2 / 2.0;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        return 1.0;
    }

    let z = (u_max - mean - 0.5) / variance.sqrt();
    match Normal::new(0.0, 1.0) {
        Ok(normal) => 2.0 * normal.sf(z),
        Err(_) => 1.0,
    }
}

/// `observed` must have nonzero margins. With `yates`, 2x2 tables get the
/// continuity correction.
pub fn chi_squared(variable: &str, observed: &[Vec<f64>], yates: bool) -> Result<TestResult> {
    let rows = observed.len();
    let columns = observed.first().map_or(0, Vec::len);
    if rows < 2 || columns < 2 {
        return Err(AnalysisError::DegenerateTable {
            variable: variable.to_string(),
            rows,
            columns,
        });
    }

    let row_totals: Vec<f64> = observed.iter().map(|row| row.iter().sum()).collect();
    let column_totals: Vec<f64> = (0..columns)
        .map(|column| observed.iter().map(|row| row[column]).sum())
        .collect();
    let total: f64 = row_totals.iter().sum();

    let dof = (rows - 1) * (columns - 1);
    let corrected = yates && dof == 1;

    let mut statistic = 0.0;
    for (row, row_total) in observed.iter().zip(&row_totals) {
        for (&count, column_total) in row.iter().zip(&column_totals) {
            let expected = row_total * column_total / total;
            if expected <= 0.0 {
                continue;
            }
            let mut diff = (count - expected).abs();
            if corrected {
                diff -= diff.min(0.5);
            }
            statistic += diff * diff / expected;
        }
    }

    let p_value = ChiSquared::new(dof as f64)
        .map(|distribution| distribution.sf(statistic).clamp(0.0, 1.0))
        .unwrap_or(1.0);

    Ok(TestResult {
        variable: variable.to_string(),
        method: if corrected {
            TestMethod::ChiSquaredYates
        } else {
            TestMethod::ChiSquared
        },
        statistic,
        p_value,
        significant: p_value < SIGNIFICANCE_LEVEL,
        dof: Some(dof),
    })
}
