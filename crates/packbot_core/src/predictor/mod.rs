//! Packaging-type classifier: calendar and transport features in, one of
//! Plastic / Biodegradable / Paper / Metal out.

pub mod dataset;
pub mod features;
pub mod preprocess;
pub mod tree;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PredictError;
use dataset::TrainingRow;
use features::{PackagingFeatures, PredictRequest};
use preprocess::Preprocessor;
use tree::DecisionTree;

pub const PLASTIC: &str = "Plastic";
/// Metal is still a training label but is reported to clients as plastic.
pub const METAL: &str = "Metal";
pub const DEFAULT_MODEL_PATH: &str = "supply_packaging_model.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagingModel {
    /// Sorted class labels; probability vectors follow this order.
    pub classes: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub samples: usize,
    preprocessor: Preprocessor,
    tree: DecisionTree,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probabilities: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlasticProbability {
    Value(f64),
    NotAvailable(&'static str),
}

/// Response body of a prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub prediction: String,
    pub probability_plastic: PlasticProbability,
    pub features: PackagingFeatures,
}

impl PackagingModel {
    pub fn fit(rows: &[TrainingRow]) -> Result<Self> {
        if rows.is_empty() {
            bail!("no training rows");
        }

        let mut classes: Vec<String> = rows.iter().map(|r| r.packaging_type.clone()).collect();
        classes.sort();
        classes.dedup();

        let features: Vec<PackagingFeatures> = rows.iter().map(TrainingRow::features).collect();
        let preprocessor = Preprocessor::fit(&features);
        let x: Vec<Vec<f64>> = features.iter().map(|f| preprocessor.transform(f)).collect();
        let y: Vec<usize> = rows
            .iter()
            .map(|r| classes.binary_search(&r.packaging_type).unwrap_or_default())
            .collect();

        let tree = DecisionTree::fit(&x, &y, classes.len())?;
        info!(
            samples = rows.len(),
            classes = classes.len(),
            depth = tree.depth(),
            "packaging model trained"
        );

        Ok(Self {
            classes,
            trained_at: Utc::now(),
            samples: rows.len(),
            preprocessor,
            tree,
        })
    }

    pub fn predict(&self, features: &PackagingFeatures) -> Result<Prediction, PredictError> {
        let x = self.preprocessor.transform(features);
        if x.len() != self.tree.n_features() {
            return Err(PredictError::Model(format!(
                "expected {} features, got {}",
                self.tree.n_features(),
                x.len()
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PredictError::Model("non-finite feature value".to_string()));
        }

        let probabilities = self.tree.predict_proba(&x);
        if probabilities.len() != self.classes.len() {
            return Err(PredictError::Model(
                "class count does not match the tree".to_string(),
            ));
        }

        let best = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probabilities[best] { i } else { best });

        Ok(Prediction {
            label: self.classes[best].clone(),
            probabilities,
        })
    }

    pub fn probability_of(&self, prediction: &Prediction, class: &str) -> Option<f64> {
        let idx = self.classes.iter().position(|c| c == class)?;
        prediction.probabilities.get(idx).copied()
    }

    pub fn predict_request(&self, req: &PredictRequest) -> Result<PredictionReport, PredictError> {
        let features = PackagingFeatures::from_request(req)?;
        let prediction = self.predict(&features)?;

        let probability_plastic = match self.probability_of(&prediction, PLASTIC) {
            Some(p) => PlasticProbability::Value((p * 10_000.0).round() / 10_000.0),
            None => PlasticProbability::NotAvailable("N/A"),
        };
        let label = if prediction.label == METAL {
            PLASTIC.to_string()
        } else {
            prediction.label
        };

        Ok(PredictionReport {
            prediction: label,
            probability_plastic,
            features,
        })
    }
}
