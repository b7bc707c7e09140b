// Topic classification: pretrained multi-label classifier behind a trait.
//
// The TopicClassifier trait lets the analyzer run against the local ONNX
// model in production and against a fixed-score fake in tests.

pub mod models;
pub mod onnx;
pub mod traits;
