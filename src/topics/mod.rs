// Keyword and topic extraction: corpus counting, TextRank, TF-IDF, and
// sentence embeddings.

pub mod corpus;
pub mod embeddings;
pub mod naive;
pub mod textrank;
pub mod tfidf;
pub mod traits;
