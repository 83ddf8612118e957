use std::cmp::Ordering;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::models::{FrequencyCell, FrequencyTable};

// Missing values are tallied per cohort but never tabulated.
pub fn crosstab(dataset: &Dataset, variable: &str) -> Result<FrequencyTable> {
    let mut categories: Vec<String> = Vec::new();
    let mut observations: Vec<(String, usize)> = Vec::new();
    let mut missing = vec![0usize; dataset.cohorts().len()];

    for (cohort_index, cohort) in dataset.cohorts().iter().enumerate() {
        for value in dataset.cohort_values(variable, cohort)? {
            match value.as_category() {
                Some(category) => {
                    if !categories.contains(&category) {
                        categories.push(category.clone());
                    }
                    observations.push((category, cohort_index));
                }
                None => missing[cohort_index] += 1,
            }
        }
    }

    categories.sort_by(|a, b| compare_categories(a, b));

    let mut counts = vec![vec![0usize; dataset.cohorts().len()]; categories.len()];
    for (category, cohort_index) in observations {
        if let Ok(row) = categories.binary_search_by(|probe| compare_categories(probe, &category)) {
            counts[row][cohort_index] += 1;
        }
    }

    Ok(FrequencyTable {
        variable: variable.to_string(),
        categories,
        cohorts: dataset.cohorts().to_vec(),
        counts,
        missing,
    })
}

/// Numeric codes order by value and come before text labels.
fn compare_categories(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl FrequencyTable {
    pub fn column_total(&self, cohort: usize) -> usize {
        self.counts.iter().map(|row| row[cohort]).sum()
    }

    pub fn row_total(&self, category: usize) -> usize {
        self.counts[category].iter().sum()
    }

    pub fn percent(&self, category: usize, cohort: usize) -> f64 {
        let total = self.column_total(cohort);
        if total == 0 {
            return 0.0;
        }
        self.counts[category][cohort] as f64 * 100.0 / total as f64
    }

    pub fn cells(&self) -> Vec<FrequencyCell> {
        let mut cells = Vec::with_capacity(self.categories.len() * self.cohorts.len());
        for (row, category) in self.categories.iter().enumerate() {
            for (column, cohort) in self.cohorts.iter().enumerate() {
                cells.push(FrequencyCell {
                    category: category.clone(),
                    cohort: cohort.clone(),
                    count: self.counts[row][column],
                    percent: self.percent(row, column),
                });
            }
        }
        cells
    }

    /// Contingency table restricted to categories and cohorts with nonzero
    /// margins, as (rows, columns) of raw counts.
    pub fn observed(&self) -> Vec<Vec<f64>> {
        let columns: Vec<usize> = (0..self.cohorts.len())
            .filter(|&column| self.column_total(column) > 0)
            .collect();

        (0..self.categories.len())
            .filter(|&row| self.row_total(row) > 0)
            .map(|row| {
                columns
                    .iter()
                    .map(|&column| self.counts[row][column] as f64)
                    .collect()
            })
            .collect()
    }
}
