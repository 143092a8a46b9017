//! Process-wide nutrient reference data.
//!
//! The catalog is built once (from the built-in table or a CSV export) and is
//! read-only afterwards. Lookups are keyed by [`NutrientId`] and iteration
//! always follows the declared ordering.

mod import;
mod standard;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Display name of a tracked vitamin or mineral, e.g. `"Vitamin D"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NutrientId(String);

impl NutrientId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NutrientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NutrientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NutrientId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<NutrientId> for String {
    fn from(value: NutrientId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrient {
    pub id: NutrientId,
    pub recommended_foods: Vec<String>,
    pub foods_to_avoid: Vec<String>,
    pub symptoms: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown nutrient '{0}'")]
    UnknownNutrient(NutrientId),
    #[error("nutrient '{0}' is declared more than once")]
    DuplicateNutrient(NutrientId),
    #[error("catalog must declare at least one nutrient")]
    EmptyCatalog,
    #[error("catalog entry {position} has a blank nutrient name")]
    BlankNutrient { position: usize },
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Ordered, immutable set of nutrients with their food and symptom guidance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NutrientCatalog {
    nutrients: Vec<Nutrient>,
}

impl NutrientCatalog {
    /// Validates names, uniqueness and non-emptiness; the given order is kept.
    pub fn new(nutrients: Vec<Nutrient>) -> Result<Self, CatalogError> {
        if nutrients.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for (index, nutrient) in nutrients.iter().enumerate() {
            if nutrient.id.as_str().is_empty() {
                return Err(CatalogError::BlankNutrient {
                    position: index + 1,
                });
            }
            if !seen.insert(&nutrient.id) {
                return Err(CatalogError::DuplicateNutrient(nutrient.id.clone()));
            }
        }

        Ok(Self { nutrients })
    }

    /// The seven nutrients shipped with the dashboard.
    pub fn standard() -> Self {
        Self {
            nutrients: standard::nutrients(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        Self::new(import::parse_nutrients(reader)?)
    }

    pub fn list_nutrients(&self) -> Vec<NutrientId> {
        self.nutrients.iter().map(|n| n.id.clone()).collect()
    }

    pub fn nutrients(&self) -> &[Nutrient] {
        &self.nutrients
    }

    pub fn len(&self) -> usize {
        self.nutrients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nutrients.is_empty()
    }

    pub fn contains(&self, id: &NutrientId) -> bool {
        self.nutrients.iter().any(|n| &n.id == id)
    }

    pub fn get(&self, id: &NutrientId) -> Result<&Nutrient, CatalogError> {
        self.nutrients
            .iter()
            .find(|n| &n.id == id)
            .ok_or_else(|| CatalogError::UnknownNutrient(id.clone()))
    }

    pub fn recommended_foods(&self, id: &NutrientId) -> Result<&[String], CatalogError> {
        self.get(id).map(|n| n.recommended_foods.as_slice())
    }

    pub fn foods_to_avoid(&self, id: &NutrientId) -> Result<&[String], CatalogError> {
        self.get(id).map(|n| n.foods_to_avoid.as_slice())
    }

    pub fn symptoms(&self, id: &NutrientId) -> Result<&str, CatalogError> {
        self.get(id).map(|n| n.symptoms.as_str())
    }
}
