use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Quantitative,
    Categorical,
}

impl VariableKind {
    pub fn label(self) -> &'static str {
        match self {
            VariableKind::Quantitative => "quantitative",
            VariableKind::Categorical => "categorical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub first: String,
    pub second: String,
}

/// Static declaration of the cohort column, the compared cohorts and the
/// variables to summarize. Fields not listed here are never processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub cohort_column: String,
    pub comparison: ComparisonPair,
    pub variables: Vec<Variable>,
}

const QUANTITATIVE: &[&str] = &[
    "vs_edad",
    "vs_cantidadhijos",
    "vs_cantidadhermanos",
    "vs_numero_ocupantes_vivienda",
    "pc_ineco",
    "pc_moca",
];

const CATEGORICAL: &[&str] = &[
    "vs_tienehijos",
    "vs_nivel_educacion",
    "vs_desercion_escolar",
    "vs_pandillismo",
    "vs_consumospa",
    "vs_tipo_familia",
    "vs_violencia_intrafamiliar",
    "vs_tiene_televisor",
    "vs_tiene_celular",
    "vs_tiene_computador",
    "vs_tiene_internet",
    "vs_ingreso_familiar",
    "vs_tenencia_vivienda",
    "vs_estrato_socioeconómico",
];

impl Default for Catalog {
    fn default() -> Self {
        let quantitative = QUANTITATIVE.iter().map(|name| Variable {
            name: name.to_string(),
            kind: VariableKind::Quantitative,
        });
        let categorical = CATEGORICAL.iter().map(|name| Variable {
            name: name.to_string(),
            kind: VariableKind::Categorical,
        });

        Catalog {
            cohort_column: "sujeto".to_string(),
            comparison: ComparisonPair {
                first: "Infractor".to_string(),
                second: "control".to_string(),
            },
            variables: quantitative.chain(categorical).collect(),
        }
    }
}

impl Catalog {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for variable in &self.variables {
            if !seen.insert(variable.name.as_str()) || variable.name == self.cohort_column {
                return Err(AnalysisError::DuplicateVariable(variable.name.clone()));
            }
        }
        Ok(())
    }

    pub fn kind_of(&self, name: &str) -> Option<VariableKind> {
        self.variables
            .iter()
            .find(|variable| variable.name == name)
            .map(|variable| variable.kind)
    }

    pub fn names(&self, kind: VariableKind) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .filter(move |variable| variable.kind == kind)
            .map(|variable| variable.name.as_str())
    }

    pub fn quantitative(&self) -> Vec<&str> {
        self.names(VariableKind::Quantitative).collect()
    }

    pub fn categorical(&self) -> Vec<&str> {
        self.names(VariableKind::Categorical).collect()
    }

    /// Resolves a user selection, falling back to the first declared
    /// variable of that kind.
    pub fn select<'a>(&'a self, requested: Option<&'a str>, kind: VariableKind) -> Result<&'a str> {
        match requested {
            Some(name) if self.kind_of(name) == Some(kind) => Ok(name),
            Some(name) => Err(AnalysisError::UnknownVariable {
                variable: name.to_string(),
                kind: kind.label(),
            }),
            None => self
                .names(kind)
                .next()
                .ok_or_else(|| AnalysisError::UnknownVariable {
                    variable: "<none declared>".to_string(),
                    kind: kind.label(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_splits_variables_by_kind() {
        let catalog = Catalog::default();
        assert_eq!(catalog.quantitative().len(), 6);
        assert_eq!(catalog.categorical().len(), 14);
        assert_eq!(catalog.kind_of("vs_edad"), Some(VariableKind::Quantitative));
        assert_eq!(catalog.kind_of("vs_tienehijos"), Some(VariableKind::Categorical));
        assert_eq!(catalog.kind_of("sujeto"), None);
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn select_defaults_to_first_of_kind() {
        let catalog = Catalog::default();
        assert_eq!(catalog.select(None, VariableKind::Quantitative).unwrap(), "vs_edad");
        assert_eq!(
            catalog.select(None, VariableKind::Categorical).unwrap(),
            "vs_tienehijos"
        );
    }

    #[test]
    fn select_rejects_wrong_kind() {
        let catalog = Catalog::default();
        let err = catalog
            .select(Some("vs_tienehijos"), VariableKind::Quantitative)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownVariable { .. }));
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let mut catalog = Catalog::default();
        catalog.variables.push(Variable {
            name: "vs_edad".to_string(),
            kind: VariableKind::Categorical,
        });
        assert!(matches!(
            catalog.validate(),
            Err(AnalysisError::DuplicateVariable(name)) if name == "vs_edad"
        ));
    }

    #[test]
    fn catalog_parses_from_json() {
        let raw = r#"{
            "cohort_column": "group",
            "comparison": {"first": "a", "second": "b"},
            "variables": [
                {"name": "age", "kind": "quantitative"},
                {"name": "smoker", "kind": "categorical"}
            ]
        }"#;
        let catalog: Catalog = serde_json::from_str(raw).unwrap();
        assert_eq!(catalog.quantitative(), vec!["age"]);
        assert_eq!(catalog.categorical(), vec!["smoker"]);
    }
}
