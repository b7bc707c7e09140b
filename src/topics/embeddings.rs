// Sentence embeddings using multi-qa-MiniLM-L6-cos-v1.
//
// Page text is embedded into a 384-dimensional vector with a sentence
// transformer exported to ONNX. The model was trained for cosine similarity,
// so token embeddings are mean-pooled (weighted by the attention mask) and the
// result is L2-normalized, matching what the model produces in its original
// runtime. Vectors are compared by cosine distance to find similar pages.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::traits::TextEmbedder;

/// Embedding dimension for multi-qa-MiniLM-L6-cos-v1.
pub const EMBEDDING_DIM: usize = 384;

/// Name of the sentence-transformer model, also its directory name.
pub const MODEL_NAME: &str = "multi-qa-MiniLM-L6-cos-v1";

/// Longest token sequence the model accepts.
pub const MAX_SEQUENCE_TOKENS: usize = 512;

/// Sentence embedder backed by a local ONNX model.
///
/// `Session::run` takes `&mut self`, so the session sits behind a Mutex; both
/// handles are Arc'd so inference can move into spawn_blocking.
pub struct SentenceEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl SentenceEmbedder {
    /// Load the embedding model and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nExport {} to ONNX and place it there.",
                model_path.display(),
                MODEL_NAME
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;

        debug!(model_dir = %model_dir.display(), "Loaded sentence embedding model");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl TextEmbedder for SentenceEmbedder {
    /// Tokenization and inference are CPU-bound and run on the blocking pool.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || embed_sync(&session, &tokenizer, &texts))
            .await
            .context("spawn_blocking panicked")?
    }
}

/// Synchronous embedding: tokenize, run the model, mean-pool, normalize.
fn embed_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    texts: &[String],
) -> Result<Vec<Vec<f64>>> {
    let encodings: Vec<_> = texts
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len().min(MAX_SEQUENCE_TOKENS))
        .max()
        .unwrap_or(0);

    if max_len == 0 {
        return Ok(vec![vec![0.0; EMBEDDING_DIM]; batch_size]);
    }

    // BERT inputs: token ids (pad 0), attention mask, and all-zero token types
    let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

    for enc in &encodings {
        let seq_len = enc.get_ids().len().min(MAX_SEQUENCE_TOKENS);
        let ids = &enc.get_ids()[..seq_len];
        let mask = &enc.get_attention_mask()[..seq_len];

        input_ids_flat.extend(ids.iter().map(|&id| id as i64));
        attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, seq_len));

        let pad_len = max_len - seq_len;
        input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
        attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
        token_type_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
    }

    let shape = [batch_size as i64, max_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids_flat)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat.clone()))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids_flat))
        .context("Failed to create token_type_ids tensor")?;

    // Output 0 is last_hidden_state: [batch, seq_len, 384]
    let hidden_states = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("Embedding ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        data.to_vec()
    };

    let embeddings = (0..batch_size)
        .map(|i| {
            let mask = &attention_mask_flat[i * max_len..(i + 1) * max_len];
            let tokens = &hidden_states[i * max_len * EMBEDDING_DIM..(i + 1) * max_len * EMBEDDING_DIM];
            l2_normalize(mean_pool(tokens, mask))
        })
        .collect();

    debug!(
        batch_size = batch_size,
        dim = EMBEDDING_DIM,
        "Computed sentence embeddings"
    );

    Ok(embeddings)
}

/// Average token vectors where the attention mask is set.
///
/// `tokens` is a flattened `[seq_len, EMBEDDING_DIM]` block.
fn mean_pool(tokens: &[f32], mask: &[i64]) -> Vec<f64> {
    let mut sum = vec![0.0_f64; EMBEDDING_DIM];
    let mut mask_sum = 0.0_f64;

    for (j, &m) in mask.iter().enumerate() {
        if m > 0 {
            mask_sum += m as f64;
            let row = &tokens[j * EMBEDDING_DIM..(j + 1) * EMBEDDING_DIM];
            for (acc, &v) in sum.iter_mut().zip(row) {
                *acc += v as f64 * m as f64;
            }
        }
    }

    if mask_sum > 0.0 {
        for val in &mut sum {
            *val /= mask_sum;
        }
    }
    sum
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(mut v: Vec<f64>) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Cosine similarity in -1.0..=1.0. Mismatched, empty or zero vectors give 0.0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Cosine distance: 0.0 for identical direction, 2.0 for opposite.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Rank candidates by cosine distance to `query`, closest first, keeping `limit`.
pub fn rank_by_distance<T>(query: &[f64], candidates: Vec<(T, Vec<f64>)>, limit: usize) -> Vec<(T, f64)> {
    let mut scored: Vec<(T, f64)> = candidates
        .into_iter()
        .map(|(item, vector)| {
            let distance = cosine_distance(query, &vector);
            (item, distance)
        })
        .collect();
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}
