// Output formatting: terminal display of analyses, similar URLs and manifests.

pub mod terminal;

pub use crate::content::text::truncate_chars;
