// Model file locations.
//
// Models are not downloaded by topical: they are exported ahead of time and
// placed in a platform-appropriate directory
// (~/.local/share/topical/models/ on Linux) or wherever TOPICAL_MODEL_DIR
// points. The sentence-transformer model can also live under
// SENTENCE_TRANSFORMERS_HOME, which takes priority.

use std::path::{Path, PathBuf};

use crate::topics::embeddings::MODEL_NAME;

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const LABELS_FILE: &str = "labels.json";

/// Subdirectory holding the topic classifier.
const TOPIC_MODEL_SUBDIR: &str = "topics";

/// Returns the default directory for model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("topical")
        .join("models")
}

/// Directory of the sentence-transformer model.
///
/// `st_home` (SENTENCE_TRANSFORMERS_HOME) replaces `base` when set.
pub fn embedding_model_dir(base: &Path, st_home: Option<&Path>) -> PathBuf {
    st_home.unwrap_or(base).join(MODEL_NAME)
}

/// Directory of the topic classifier model.
pub fn topic_model_dir(base: &Path) -> PathBuf {
    base.join(TOPIC_MODEL_SUBDIR)
}

/// Whether the sentence-transformer files exist in `dir`.
pub fn embedding_files_present(dir: &Path) -> bool {
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

/// Whether the topic classifier files (including labels) exist in `dir`.
pub fn topic_files_present(dir: &Path) -> bool {
    dir.join(MODEL_FILE).exists()
        && dir.join(TOKENIZER_FILE).exists()
        && dir.join(LABELS_FILE).exists()
}
