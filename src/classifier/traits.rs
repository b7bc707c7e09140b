// Topic classifier trait.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for assigning topic labels to text. Implementations return every
/// label the model knows with its probability (0.0 to 1.0).
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<(String, f64)>>;
}

/// Keep labels with probability strictly above `threshold`, highest first.
///
/// Equal probabilities keep the model's label order.
pub fn labels_above(scores: Vec<(String, f64)>, threshold: f64) -> Vec<String> {
    let mut kept: Vec<(String, f64)> = scores.into_iter().filter(|(_, p)| *p > threshold).collect();
    kept.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    kept.into_iter().map(|(label, _)| label).collect()
}
