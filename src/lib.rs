// Topical: keyword and topic analysis for pages that serve ads.
//
// This is the library root. Each module corresponds to a stage of the
// analysis flow or to the storage and tooling around it.

pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod content;
pub mod db;
pub mod fetch;
pub mod language;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod status;
pub mod topics;
pub mod urls;
