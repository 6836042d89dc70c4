//! Engine results: named quantities with units, retrieved by key.

pub mod units;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PlantError, Result};

/// One named result: a scalar, or an ordered series for multi-run results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuantity")]
pub struct Quantity {
    pub values: Vec<f64>,
    pub unit: String,
}

/// Wire form accepting either `value` or `values`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuantity {
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    values: Option<Vec<f64>>,
    #[serde(default)]
    unit: String,
}

impl TryFrom<RawQuantity> for Quantity {
    type Error = String;

    fn try_from(raw: RawQuantity) -> std::result::Result<Self, Self::Error> {
        let values = match (raw.value, raw.values) {
            (Some(v), None) => vec![v],
            (None, Some(vs)) if !vs.is_empty() => vs,
            (None, Some(_)) => return Err("`values` must not be empty".to_string()),
            (Some(_), Some(_)) => {
                return Err("give either `value` or `values`, not both".to_string());
            }
            (None, None) => return Err("missing `value` or `values`".to_string()),
        };
        Ok(Quantity {
            values,
            unit: raw.unit,
        })
    }
}

/// An extracted result converted into the requested unit.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Scalar(f64),
    Series(Vec<f64>),
}

impl ResultValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ResultValue::Scalar(v) => Some(*v),
            ResultValue::Series(_) => None,
        }
    }

    pub fn values(&self) -> &[f64] {
        match self {
            ResultValue::Scalar(v) => std::slice::from_ref(v),
            ResultValue::Series(vs) => vs,
        }
    }
}

/// Results of one engine run.
///
/// The only contract with engines is key-based retrieval with an explicit
/// unit; keys are free-form (`"lcoe"`, `"capex.wind"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultHandle {
    quantities: BTreeMap<String, Quantity>,
}

impl ResultHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64, unit: impl Into<String>) {
        self.quantities.insert(
            key.into(),
            Quantity {
                values: vec![value],
                unit: unit.into(),
            },
        );
    }

    pub fn insert_series(
        &mut self,
        key: impl Into<String>,
        values: Vec<f64>,
        unit: impl Into<String>,
    ) {
        self.quantities.insert(
            key.into(),
            Quantity {
                values,
                unit: unit.into(),
            },
        );
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.quantities.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Quantity)> {
        self.quantities.iter().map(|(k, q)| (k.as_str(), q))
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.quantities.contains_key(key)
    }

    /// Stored quantity, in the unit the engine reported.
    ///
    /// # Errors
    ///
    /// `UnknownResultKey` if absent.
    pub fn quantity(&self, key: &str) -> Result<&Quantity> {
        self.quantities
            .get(key)
            .ok_or_else(|| PlantError::UnknownResultKey {
                key: key.to_string(),
            })
    }

    /// Retrieves `key` converted into `unit`.
    ///
    /// # Errors
    ///
    /// `UnknownResultKey` if absent, `UnitConversionError` if `unit` does not
    /// parse or has a different dimension than the stored unit.
    pub fn extract(&self, key: &str, unit: &str) -> Result<ResultValue> {
        let q = self.quantity(key)?;
        let from: units::Unit = q.unit.parse().map_err(|reason| PlantError::UnitConversionError {
            from: q.unit.clone(),
            to: unit.to_string(),
            reason,
        })?;
        let to: units::Unit = unit.parse().map_err(|reason| PlantError::UnitConversionError {
            from: q.unit.clone(),
            to: unit.to_string(),
            reason,
        })?;
        let factor = from
            .factor_to(&to)
            .map_err(|reason| PlantError::UnitConversionError {
                from: q.unit.clone(),
                to: unit.to_string(),
                reason,
            })?;
        let converted: Vec<f64> = q.values.iter().map(|v| v * factor).collect();
        Ok(match converted.as_slice() {
            [single] => ResultValue::Scalar(*single),
            _ => ResultValue::Series(converted),
        })
    }

    /// Retrieves a single-valued `key` converted into `unit`.
    ///
    /// # Errors
    ///
    /// As [`ResultHandle::extract`], plus `NotScalar` for series results.
    pub fn scalar(&self, key: &str, unit: &str) -> Result<f64> {
        match self.extract(key, unit)? {
            ResultValue::Scalar(v) => Ok(v),
            ResultValue::Series(vs) => Err(PlantError::NotScalar {
                key: key.to_string(),
                len: vs.len(),
            }),
        }
    }

    /// First stored value in the engine's own unit; used to rank candidates.
    pub(crate) fn raw_scalar(&self, key: &str) -> Result<f64> {
        let q = self.quantity(key)?;
        q.values.first().copied().ok_or_else(|| PlantError::NotScalar {
            key: key.to_string(),
            len: 0,
        })
    }
}
