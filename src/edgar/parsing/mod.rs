pub mod text;

pub use text::{clip_chars, html_to_text, keyword_windows, truncate_at_marker};
