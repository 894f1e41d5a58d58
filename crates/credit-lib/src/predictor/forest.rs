//! Decision forest classifier loaded from a JSON artifact
//!
//! The artifact mirrors a random forest classifier: every tree votes with
//! the normalized class distribution of the leaf a row lands in, and the
//! forest probability is the mean of those votes. Node indices are checked
//! at load time so traversal always terminates.
//!
//! Leaf columns follow the artifact's `classes` order; probabilities leave
//! this module reordered by class id.

use super::{Classifier, FeatureImportances, ModelMetadata, ProbabilityEstimator, RowPrediction};
use crate::schema::{CreditCategory, FEATURE_COUNT};
use anyhow::{Context, Result};
use serde::Deserialize;

fn default_model_type() -> String {
    "RandomForestClassifier".to_string()
}

/// On-disk layout of a forest artifact
#[derive(Debug, Clone, Deserialize)]
struct ForestArtifact {
    #[serde(default = "default_model_type")]
    model_type: String,
    /// Class id emitted for each probability column
    classes: Vec<i64>,
    n_features: usize,
    #[serde(default)]
    max_depth: Option<u32>,
    #[serde(default)]
    random_state: Option<u64>,
    #[serde(default)]
    feature_importances: Option<Vec<f64>>,
    trees: Vec<DecisionTree>,
}

#[derive(Debug, Clone, Deserialize)]
struct DecisionTree {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        impurity_decrease: f64,
        #[serde(default)]
        n_samples: u64,
    },
    Leaf {
        /// Per-class weights (sample counts or fractions)
        value: Vec<f64>,
    },
}

impl DecisionTree {
    fn validate(&self, tree_idx: usize, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            anyhow::bail!("Tree {} has no nodes", tree_idx);
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        anyhow::bail!(
                            "Tree {} node {} splits on feature {} of {}",
                            tree_idx,
                            idx,
                            feature,
                            n_features
                        );
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            anyhow::bail!(
                                "Tree {} node {} has invalid child index {}",
                                tree_idx,
                                idx,
                                child
                            );
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        anyhow::bail!(
                            "Tree {} leaf {} has {} class weights, expected {}",
                            tree_idx,
                            idx,
                            value.len(),
                            n_classes
                        );
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        anyhow::bail!("Tree {} leaf {} has invalid class weights", tree_idx, idx);
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Normalized impurity decrease per feature, `None` without statistics
    fn impurity_importances(&self, n_features: usize) -> Option<Vec<f64>> {
        let mut importance = vec![0.0; n_features];
        let mut total = 0.0;
        for node in &self.nodes {
            if let TreeNode::Split {
                feature,
                impurity_decrease,
                n_samples,
                ..
            } = node
            {
                let weighted = impurity_decrease * *n_samples as f64;
                importance[*feature] += weighted;
                total += weighted;
            }
        }
        if total > 0.0 {
            importance.iter_mut().for_each(|v| *v /= total);
            Some(importance)
        } else {
            None
        }
    }
}

fn normalized(weights: &[f64]) -> impl Iterator<Item = f64> + '_ {
    let total: f64 = weights.iter().sum();
    let uniform = 1.0 / weights.len() as f64;
    weights
        .iter()
        .map(move |w| if total > 0.0 { w / total } else { uniform })
}

/// Forest-wide importances: trees without statistics are skipped
fn mean_importances(trees: &[DecisionTree], n_features: usize) -> Option<Vec<f64>> {
    let per_tree: Vec<Vec<f64>> = trees
        .iter()
        .filter_map(|t| t.impurity_importances(n_features))
        .collect();
    if per_tree.is_empty() {
        return None;
    }
    let mut mean = vec![0.0; n_features];
    for tree in &per_tree {
        for (acc, v) in mean.iter_mut().zip(tree) {
            *acc += v;
        }
    }
    let total: f64 = mean.iter().sum();
    mean.iter_mut().for_each(|v| *v /= total);
    Some(mean)
}

/// Tree ensemble classifier with probability and importance capabilities
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    model_type: String,
    /// Class id (and output position) of each leaf column
    column_class: Vec<usize>,
    trees: Vec<DecisionTree>,
    importances: Option<Vec<f64>>,
    metadata: ModelMetadata,
}

impl ForestClassifier {
    /// Parse and validate a JSON forest artifact
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let artifact: ForestArtifact =
            serde_json::from_slice(bytes).context("Failed to parse forest artifact")?;
        Self::from_artifact(artifact)
    }

    fn from_artifact(artifact: ForestArtifact) -> Result<Self> {
        if artifact.n_features != FEATURE_COUNT {
            anyhow::bail!(
                "Model expects {} features, schema has {}",
                artifact.n_features,
                FEATURE_COUNT
            );
        }
        let column_class = class_columns(&artifact.classes)?;
        if artifact.trees.is_empty() {
            anyhow::bail!("Model has no trees");
        }
        for (idx, tree) in artifact.trees.iter().enumerate() {
            tree.validate(idx, artifact.n_features, artifact.classes.len())?;
        }

        let importances = match artifact.feature_importances {
            Some(given) => {
                if given.len() != artifact.n_features {
                    anyhow::bail!(
                        "Model has {} feature importances for {} features",
                        given.len(),
                        artifact.n_features
                    );
                }
                if given.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    anyhow::bail!("Feature importances must be non-negative");
                }
                Some(given)
            }
            None => mean_importances(&artifact.trees, artifact.n_features),
        };

        let metadata = ModelMetadata {
            n_estimators: Some(artifact.trees.len()),
            max_depth: artifact.max_depth,
            random_state: artifact.random_state,
        };

        Ok(Self {
            model_type: artifact.model_type,
            column_class,
            trees: artifact.trees,
            importances,
            metadata,
        })
    }

    fn check_row(&self, features: &[f64]) -> Result<()> {
        if features.len() != FEATURE_COUNT {
            anyhow::bail!(
                "Expected {} features, got {}",
                FEATURE_COUNT,
                features.len()
            );
        }
        Ok(())
    }

    /// Mean leaf distribution indexed by class id
    fn class_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.column_class.len()];
        for tree in &self.trees {
            for (&class, p) in self.column_class.iter().zip(normalized(tree.leaf(features))) {
                proba[class] += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }
}

/// Map each artifact column to its class id
///
/// The columns must be a permutation of the credit category ids.
fn class_columns(classes: &[i64]) -> Result<Vec<usize>> {
    if classes.len() != CreditCategory::ALL.len() {
        anyhow::bail!(
            "Model declares {} classes, expected {}",
            classes.len(),
            CreditCategory::ALL.len()
        );
    }
    let mut seen = [false; CreditCategory::ALL.len()];
    classes
        .iter()
        .map(|&id| -> Result<usize> {
            let category = CreditCategory::from_id(id)
                .with_context(|| format!("Model declares unknown class id {}", id))?;
            let column = category.id() as usize;
            if std::mem::replace(&mut seen[column], true) {
                anyhow::bail!("Model declares class id {} more than once", id);
            }
            Ok(column)
        })
        .collect()
}

/// Index of the highest probability; the lowest class id wins on ties
fn arg_max(proba: &[f64]) -> usize {
    proba
        .iter()
        .enumerate()
        .fold(0, |best, (i, p)| if *p > proba[best] { i } else { best })
}

impl Classifier for ForestClassifier {
    fn predict_category(&self, features: &[f64]) -> Result<i64> {
        self.check_row(features)?;
        Ok(arg_max(&self.class_proba(features)) as i64)
    }

    fn predict_row(&self, features: &[f64]) -> Result<RowPrediction> {
        self.check_row(features)?;
        let proba = self.class_proba(features);
        Ok(RowPrediction {
            category: arg_max(&proba) as i64,
            probabilities: Some(Ok(proba)),
        })
    }

    fn model_type(&self) -> &str {
        &self.model_type
    }

    fn metadata(&self) -> ModelMetadata {
        self.metadata.clone()
    }

    fn as_probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        Some(self)
    }

    fn as_feature_importances(&self) -> Option<&dyn FeatureImportances> {
        if self.importances.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl ProbabilityEstimator for ForestClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        self.check_row(features)?;
        Ok(self.class_proba(features))
    }
}

impl FeatureImportances for ForestClassifier {
    fn feature_importances(&self) -> Result<Vec<f64>> {
        self.importances
            .clone()
            .context("Model carries no impurity statistics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forest_json() -> serde_json::Value {
        json!({
            "model_type": "RandomForestClassifier",
            "classes": [0, 1, 2],
            "n_features": 7,
            "max_depth": 2,
            "random_state": 42,
            "trees": [
                {"nodes": [
                    {"split": {"feature": 6, "threshold": 4.5, "left": 1, "right": 4,
                               "impurity_decrease": 0.3, "n_samples": 30}},
                    {"split": {"feature": 0, "threshold": 6000.0, "left": 2, "right": 3,
                               "impurity_decrease": 0.2, "n_samples": 20}},
                    {"leaf": {"value": [8.0, 1.0, 1.0]}},
                    {"leaf": {"value": [1.0, 2.0, 7.0]}},
                    {"leaf": {"value": [0.0, 9.0, 1.0]}}
                ]},
                {"nodes": [
                    {"split": {"feature": 5, "threshold": 40000.0, "left": 1, "right": 2,
                               "impurity_decrease": 0.25, "n_samples": 20}},
                    {"leaf": {"value": [1.0, 6.0, 3.0]}},
                    {"leaf": {"value": [6.0, 1.0, 3.0]}}
                ]}
            ]
        })
    }

    fn load(value: serde_json::Value) -> Result<ForestClassifier> {
        ForestClassifier::from_slice(&serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_predicts_each_profile() {
        let forest = load(forest_json()).unwrap();
        let good = [5000.0, 1.0, 36.0, 2500.0, 85.0, 60000.0, 2.0];
        let poor = [15000.0, 0.0, 12.0, 8000.0, 45.0, 35000.0, 8.0];
        let standard = [8000.0, 2.0, 24.0, 4000.0, 70.0, 50000.0, 3.0];
        assert_eq!(forest.predict_category(&good).unwrap(), 0);
        assert_eq!(forest.predict_category(&poor).unwrap(), 1);
        assert_eq!(forest.predict_category(&standard).unwrap(), 2);
    }

    #[test]
    fn test_probabilities_are_mean_of_leaves() {
        let forest = load(forest_json()).unwrap();
        let proba = forest
            .predict_proba(&[5000.0, 1.0, 36.0, 2500.0, 85.0, 60000.0, 2.0])
            .unwrap();
        let expected = [0.7, 0.1, 0.2];
        for (p, e) in proba.iter().zip(expected) {
            assert!((p - e).abs() < 1e-9, "{:?}", proba);
        }
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_importances_from_impurity() {
        let forest = load(forest_json()).unwrap();
        let importances = forest.feature_importances().unwrap();
        assert_eq!(importances.len(), FEATURE_COUNT);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((importances[5] - 0.5).abs() < 1e-9);
        assert!((importances[6] - 9.0 / 26.0).abs() < 1e-9);
        assert!((importances[0] - 4.0 / 26.0).abs() < 1e-9);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_explicit_importances_preferred() {
        let mut value = forest_json();
        value["feature_importances"] = json!([0.3, 0.1, 0.1, 0.1, 0.1, 0.2, 0.1]);
        let forest = load(value).unwrap();
        assert_eq!(forest.feature_importances().unwrap()[0], 0.3);
    }

    #[test]
    fn test_no_statistics_means_no_capability() {
        let value = json!({
            "classes": [0, 1, 2],
            "n_features": 7,
            "trees": [{"nodes": [
                {"split": {"feature": 0, "threshold": 1.0, "left": 1, "right": 2}},
                {"leaf": {"value": [1.0, 0.0, 0.0]}},
                {"leaf": {"value": [0.0, 0.0, 1.0]}}
            ]}]
        });
        let forest = load(value).unwrap();
        assert!(forest.as_feature_importances().is_none());
        assert!(forest.as_probability_estimator().is_some());
        assert_eq!(forest.model_type(), "RandomForestClassifier");
    }

    #[test]
    fn test_metadata() {
        let forest = load(forest_json()).unwrap();
        let metadata = forest.metadata();
        assert_eq!(metadata.n_estimators, Some(2));
        assert_eq!(metadata.max_depth, Some(2));
        assert_eq!(metadata.random_state, Some(42));
    }

    #[test]
    fn test_permuted_classes_reordered_by_id() {
        let value = json!({
            "classes": [2, 0, 1],
            "n_features": 7,
            "trees": [{"nodes": [{"leaf": {"value": [9.0, 1.0, 0.0]}}]}]
        });
        let forest = load(value).unwrap();
        let row = [0.0; 7];

        let proba = forest.predict_proba(&row).unwrap();
        assert!((proba[0] - 0.1).abs() < 1e-12, "{:?}", proba);
        assert_eq!(proba[1], 0.0);
        assert!((proba[2] - 0.9).abs() < 1e-12, "{:?}", proba);
        assert_eq!(forest.predict_category(&row).unwrap(), 2);

        let output = forest.predict_row(&row).unwrap();
        assert_eq!(output.category, 2);
        assert_eq!(output.probabilities.unwrap().unwrap(), proba);
    }

    #[test]
    fn test_class_list_must_cover_categories() {
        for classes in [json!([0, 0, 1]), json!([0, 1, 3]), json!([0, 1]), json!([])] {
            let mut value = forest_json();
            value["classes"] = classes.clone();
            assert!(load(value).is_err(), "classes {} accepted", classes);
        }
        let mut value = forest_json();
        value["classes"] = json!([0, 1, 1]);
        let err = load(value).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_backward_child_rejected() {
        let mut value = forest_json();
        value["trees"][1]["nodes"][0]["split"]["left"] = json!(0);
        let err = load(value).unwrap_err();
        assert!(err.to_string().contains("invalid child index"));
    }

    #[test]
    fn test_out_of_range_feature_rejected() {
        let mut value = forest_json();
        value["trees"][0]["nodes"][0]["split"]["feature"] = json!(7);
        assert!(load(value).is_err());
    }

    #[test]
    fn test_leaf_arity_rejected() {
        let mut value = forest_json();
        value["trees"][1]["nodes"][1]["leaf"]["value"] = json!([1.0, 2.0]);
        assert!(load(value).is_err());
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let mut value = forest_json();
        value["n_features"] = json!(9);
        assert!(load(value).is_err());
    }

    #[test]
    fn test_empty_forest_rejected() {
        let mut value = forest_json();
        value["trees"] = json!([]);
        assert!(load(value).is_err());
        assert!(ForestClassifier::from_slice(b"{\"classes\": [").is_err());
    }

    #[test]
    fn test_zero_weight_leaf_is_uniform() {
        let value = json!({
            "classes": [0, 1, 2],
            "n_features": 7,
            "trees": [{"nodes": [{"leaf": {"value": [0.0, 0.0, 0.0]}}]}]
        });
        let forest = load(value).unwrap();
        let proba = forest.predict_proba(&[0.0; 7]).unwrap();
        assert!(proba.iter().all(|p| (p - 1.0 / 3.0).abs() < 1e-12));
        assert_eq!(forest.predict_category(&[0.0; 7]).unwrap(), 0);
    }
}
