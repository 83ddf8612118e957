use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::catalog::{Catalog, VariableKind};
use crate::error::{AnalysisError, Result};
use crate::models::{Record, Value};

// Compared lowercased; mirrors the spreadsheet/pandas default NA list.
const MISSING_MARKERS: &[&str] = &[
    "", "#n/a", "#n/a n/a", "#na", "-1.#ind", "-1.#qnan", "-nan", "1.#ind", "1.#qnan", "<na>",
    "n/a", "na", "nan", "null", "none",
];

#[derive(Debug, Clone, Copy)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub decimal: char,
}

impl Default for CsvFormat {
    fn default() -> Self {
        CsvFormat {
            delimiter: b',',
            decimal: '.',
        }
    }
}

/// Immutable table of records sharing one schema. The cohort set is derived
/// once at load time so every summarizer sees the same ordering.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
    cohorts: Vec<String>,
}

pub fn load(path: &Path, catalog: &Catalog, format: CsvFormat) -> Result<Dataset> {
    let file = std::fs::File::open(path)?;
    let dataset = load_from_reader(file, catalog, format)?;
    info!(
        path = %path.display(),
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        cohorts = ?dataset.cohorts(),
        "dataset loaded"
    );
    Ok(dataset)
}

pub fn load_from_reader<R: Read>(reader: R, catalog: &Catalog, format: CsvFormat) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let position = |name: &str| {
        columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| AnalysisError::Schema {
                column: name.to_string(),
            })
    };

    let cohort_index = position(&catalog.cohort_column)?;
    let mut kinds = vec![None; columns.len()];
    for variable in &catalog.variables {
        kinds[position(&variable.name)?] = Some(variable.kind);
    }

    let mut records = Vec::new();
    let mut cohorts: Vec<String> = Vec::new();

    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let line = index + 1;

        let cohort = row.get(cohort_index).unwrap_or("").to_string();
        if is_missing(&cohort) {
            return Err(AnalysisError::EmptyCohort { row: line });
        }
        if !cohorts.contains(&cohort) {
            cohorts.push(cohort.clone());
        }

        let mut values = Vec::with_capacity(columns.len());
        for (column, kind) in columns.iter().zip(&kinds) {
            let raw = row.get(values.len()).unwrap_or("");
            values.push(parse_cell(raw, *kind, format.decimal, line, column)?);
        }

        records.push(Record { cohort, values });
    }

    Ok(Dataset {
        columns,
        records,
        cohorts,
    })
}

fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim().to_lowercase().as_str())
}

fn parse_cell(
    raw: &str,
    kind: Option<VariableKind>,
    decimal: char,
    row: usize,
    column: &str,
) -> Result<Value> {
    if is_missing(raw) {
        return Ok(Value::Missing);
    }

    match kind {
        Some(VariableKind::Quantitative) => parse_number(raw.trim(), decimal)
            .map(Value::Number)
            .ok_or_else(|| AnalysisError::InvalidNumber {
                row,
                column: column.to_string(),
                value: raw.to_string(),
            }),
        _ => Ok(Value::Text(raw.trim().to_string())),
    }
}

fn parse_number(raw: &str, decimal: char) -> Option<f64> {
    if decimal == '.' {
        return raw.parse().ok();
    }
    if raw.contains('.') {
        return None;
    }
    raw.replacen(decimal, ".", 1).parse().ok()
}

impl Dataset {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn cohorts(&self) -> &[String] {
        &self.cohorts
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| AnalysisError::Schema {
                column: name.to_string(),
            })
    }

    /// Values of `column` for the records of `cohort`, in dataset order.
    pub fn cohort_values<'a>(
        &'a self,
        column: &str,
        cohort: &'a str,
    ) -> Result<impl Iterator<Item = &'a Value> + 'a> {
        let index = self.column_index(column)?;
        Ok(self
            .records
            .iter()
            .filter(move |record| record.cohort == cohort)
            .map(move |record| &record.values[index]))
    }

    /// Present numeric values of `column` for `cohort`, in dataset order.
    pub fn numeric_sample(&self, column: &str, cohort: &str) -> Result<Vec<f64>> {
        Ok(self
            .cohort_values(column, cohort)?
            .filter_map(Value::as_number)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ComparisonPair, Variable};

    fn catalog() -> Catalog {
        Catalog {
            cohort_column: "sujeto".to_string(),
            comparison: ComparisonPair {
                first: "Infractor".to_string(),
                second: "control".to_string(),
            },
            variables: vec![
                Variable {
                    name: "vs_edad".to_string(),
                    kind: VariableKind::Quantitative,
                },
                Variable {
                    name: "vs_tienehijos".to_string(),
                    kind: VariableKind::Categorical,
                },
            ],
        }
    }

    #[test]
    fn loads_records_and_cohorts_in_first_seen_order() {
        let csv = "sujeto,vs_edad,vs_tienehijos,extra\n\
                   control,20,No,x\n\
                   Infractor,15,Sí,y\n\
                   control,,NA,z\n";
        let dataset = load_from_reader(csv.as_bytes(), &catalog(), CsvFormat::default()).unwrap();

        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.column_count(), 4);
        assert_eq!(dataset.cohorts(), ["control", "Infractor"]);
        assert_eq!(dataset.numeric_sample("vs_edad", "control").unwrap(), vec![20.0]);
        let hijos: Vec<_> = dataset.cohort_values("vs_tienehijos", "control").unwrap().collect();
        assert_eq!(hijos, vec![&Value::Text("No".to_string()), &Value::Missing]);
    }

    #[test]
    fn missing_declared_column_fails_fast() {
        let csv = "sujeto,vs_edad\ncontrol,20\n";
        let err = load_from_reader(csv.as_bytes(), &catalog(), CsvFormat::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { column } if column == "vs_tienehijos"));
    }

    #[test]
    fn missing_cohort_column_fails_fast() {
        let csv = "grupo,vs_edad,vs_tienehijos\ncontrol,20,No\n";
        let err = load_from_reader(csv.as_bytes(), &catalog(), CsvFormat::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { column } if column == "sujeto"));
    }

    #[test]
    fn empty_cohort_label_is_rejected() {
        let csv = "sujeto,vs_edad,vs_tienehijos\ncontrol,20,No\n,21,Sí\n";
        let err = load_from_reader(csv.as_bytes(), &catalog(), CsvFormat::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyCohort { row: 2 }));
    }

    #[test]
    fn non_numeric_quantitative_cell_is_rejected() {
        let csv = "sujeto,vs_edad,vs_tienehijos\ncontrol,veinte,No\n";
        let err = load_from_reader(csv.as_bytes(), &catalog(), CsvFormat::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidNumber { row: 1, ref column, ref value }
                if column == "vs_edad" && value == "veinte"
        ));
    }

    #[test]
    fn honours_custom_delimiter() {
        let csv = "sujeto;vs_edad;vs_tienehijos\nInfractor;16.5;Sí\n";
        let format = CsvFormat {
            delimiter: b';',
            ..CsvFormat::default()
        };
        let dataset = load_from_reader(csv.as_bytes(), &catalog(), format).unwrap();
        assert_eq!(dataset.numeric_sample("vs_edad", "Infractor").unwrap(), vec![16.5]);
    }

    #[test]
    fn decimal_comma_exports_parse_when_configured() {
        let csv = "sujeto;vs_edad;vs_tienehijos\nInfractor;22,5;Sí\ncontrol;18;No\n";
        let format = CsvFormat {
            delimiter: b';',
            decimal: ',',
        };
        let dataset = load_from_reader(csv.as_bytes(), &catalog(), format).unwrap();
        assert_eq!(dataset.numeric_sample("vs_edad", "Infractor").unwrap(), vec![22.5]);
        assert_eq!(dataset.numeric_sample("vs_edad", "control").unwrap(), vec![18.0]);

        let strict = CsvFormat {
            delimiter: b';',
            ..CsvFormat::default()
        };
        let err = load_from_reader(csv.as_bytes(), &catalog(), strict).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidNumber { row: 1, .. }));
    }

    #[test]
    fn spreadsheet_na_markers_are_missing() {
        let csv = "sujeto,vs_edad,vs_tienehijos\n\
                   Infractor,#N/A,Sí\n\
                   Infractor,N/A,#N/A\n\
                   control,20,<NA>\n\
                   control,NULL,No\n\
                   control,-NaN,n/a\n";
        let dataset = load_from_reader(csv.as_bytes(), &catalog(), CsvFormat::default()).unwrap();

        assert!(dataset.numeric_sample("vs_edad", "Infractor").unwrap().is_empty());
        assert_eq!(dataset.numeric_sample("vs_edad", "control").unwrap(), vec![20.0]);
        let hijos: Vec<_> = dataset.cohort_values("vs_tienehijos", "Infractor").unwrap().collect();
        assert_eq!(hijos, vec![&Value::Text("Sí".to_string()), &Value::Missing]);

        let table = crate::frequency::crosstab(&dataset, "vs_tienehijos").unwrap();
        assert_eq!(table.categories, vec!["No", "Sí"]);
        assert_eq!(table.missing, vec![1, 2]);
    }
}
