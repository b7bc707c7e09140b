// Local ONNX topic classifier.
//
// A fine-tuned transformer exported to ONNX with one sigmoid output per
// topic. Label names come from `labels.json` next to the model, in the
// order the model emits its logits.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::traits::TopicClassifier;

/// Longest token sequence passed to the model.
const MAX_SEQUENCE_TOKENS: usize = 512;

/// Multi-label topic classifier running on the local CPU.
pub struct OnnxTopicClassifier {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    labels: Arc<Vec<String>>,
}

impl OnnxTopicClassifier {
    /// Load the model, tokenizer and label list from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let labels_path = model_dir.join("labels.json");

        for path in [&model_path, &tokenizer_path, &labels_path] {
            if !path.exists() {
                anyhow::bail!(
                    "Topic model file not found: {}\nPlace the exported classifier in {}.",
                    path.display(),
                    model_dir.display()
                );
            }
        }

        let labels_json = std::fs::read_to_string(&labels_path)
            .with_context(|| format!("Failed to read {}", labels_path.display()))?;
        let labels = parse_labels(&labels_json)
            .with_context(|| format!("Invalid label file {}", labels_path.display()))?;

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        debug!(
            labels = labels.len(),
            "Loaded ONNX topic model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            labels: Arc::new(labels),
        })
    }
}

#[async_trait]
impl TopicClassifier for OnnxTopicClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<(String, f64)>> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let labels = Arc::clone(&self.labels);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let seq_len = encoding.get_ids().len().min(MAX_SEQUENCE_TOKENS);
            let input_ids: Vec<i64> = encoding.get_ids()[..seq_len]
                .iter()
                .map(|&id| id as i64)
                .collect();
            let attention_mask: Vec<i64> = encoding.get_attention_mask()[..seq_len]
                .iter()
                .map(|&m| m as i64)
                .collect();

            let shape = [1_i64, seq_len as i64];
            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // Output shape: [1, labels] raw logits
                let (_out_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            let scores = label_probabilities(&labels, &logits)?;
            debug!(
                tokens = seq_len,
                text_preview = %crate::content::text::truncate_chars(&text, 50),
                "Classified text"
            );
            Ok(scores)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Parse `labels.json`: a JSON array of label names.
fn parse_labels(json: &str) -> Result<Vec<String>> {
    let labels: Vec<String> = serde_json::from_str(json).context("Expected a JSON array of strings")?;
    if labels.is_empty() {
        anyhow::bail!("Label list is empty");
    }
    Ok(labels)
}

/// Pair each label with the sigmoid of its logit.
fn label_probabilities(labels: &[String], logits: &[f32]) -> Result<Vec<(String, f64)>> {
    if logits.len() != labels.len() {
        anyhow::bail!(
            "Model returned {} outputs but {} labels are defined",
            logits.len(),
            labels.len()
        );
    }
    Ok(labels
        .iter()
        .zip(logits)
        .map(|(label, &logit)| (label.clone(), sigmoid(logit as f64)))
        .collect())
}
