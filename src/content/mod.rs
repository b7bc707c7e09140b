// Content handling: HTML main-content extraction and text preprocessing.

pub mod extract;
pub mod text;
