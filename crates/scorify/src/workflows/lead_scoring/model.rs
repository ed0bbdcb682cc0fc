use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::features::{FeaturePayload, FeatureValue};
use super::scoring::{InferenceError, ScoringModel};

/// Logistic regression over the lead features.
///
/// Numeric features are multiplied by their coefficient, categorical
/// features add the weight of their observed level. Nulls and unseen levels
/// contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    #[serde(default)]
    pub numeric: BTreeMap<String, f64>,
    #[serde(default)]
    pub categorical: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid model definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model coefficient for '{0}' is not finite")]
    NonFinite(String),
}

impl LogisticModel {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelLoadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ModelLoadError> {
        let model: Self = serde_json::from_reader(reader)?;
        model.validate()?;
        Ok(model)
    }

    /// Coefficients used when no model file is configured. Calls that come
    /// through the cellular channel after a previous success score highest.
    pub fn baseline() -> Self {
        let numeric = BTreeMap::from([
            ("campaign".to_string(), -0.08),
            ("previous".to_string(), 0.25),
            ("emp.var.rate".to_string(), -0.35),
            ("euribor3m".to_string(), -0.12),
        ]);
        let categorical = BTreeMap::from([
            (
                "contact".to_string(),
                BTreeMap::from([
                    ("cellular".to_string(), 0.45),
                    ("telephone".to_string(), -0.35),
                ]),
            ),
            (
                "poutcome".to_string(),
                BTreeMap::from([
                    ("success".to_string(), 1.6),
                    ("failure".to_string(), -0.2),
                ]),
            ),
            (
                "default".to_string(),
                BTreeMap::from([("yes".to_string(), -0.6)]),
            ),
            (
                "job".to_string(),
                BTreeMap::from([
                    ("student".to_string(), 0.5),
                    ("retired".to_string(), 0.45),
                    ("blue-collar".to_string(), -0.3),
                ]),
            ),
        ]);

        Self {
            intercept: -1.9,
            numeric,
            categorical,
        }
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        if !self.intercept.is_finite() {
            return Err(ModelLoadError::NonFinite("intercept".to_string()));
        }
        if let Some(name) = self
            .numeric
            .iter()
            .find(|(_, weight)| !weight.is_finite())
            .map(|(name, _)| name)
        {
            return Err(ModelLoadError::NonFinite(name.clone()));
        }
        for (feature, levels) in &self.categorical {
            if levels.values().any(|weight| !weight.is_finite()) {
                return Err(ModelLoadError::NonFinite(feature.clone()));
            }
        }
        Ok(())
    }

    fn logit(&self, features: &FeaturePayload) -> Result<f64, InferenceError> {
        let mut z = self.intercept;

        for (name, coefficient) in &self.numeric {
            match features.get(name) {
                None | Some(FeatureValue::Null) => {}
                Some(FeatureValue::Text(raw)) => {
                    return Err(InferenceError::MalformedInput {
                        feature: name.clone(),
                        reason: format!("expected a number, got '{raw}'"),
                    });
                }
                Some(value) => {
                    let number = value.as_f64().unwrap_or_default();
                    if !number.is_finite() {
                        return Err(InferenceError::MalformedInput {
                            feature: name.clone(),
                            reason: "value is not finite".to_string(),
                        });
                    }
                    z += coefficient * number;
                }
            }
        }

        for (name, levels) in &self.categorical {
            if let Some(level) = features.get(name).and_then(FeatureValue::as_text) {
                z += levels.get(level).copied().unwrap_or_default();
            }
        }

        Ok(z)
    }
}

impl ScoringModel for LogisticModel {
    fn score(&self, features: &FeaturePayload) -> Result<f64, InferenceError> {
        let z = self.logit(features)?;
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}
