//! Content module - documents, front matter, markdown and asset references

pub mod assets;
mod document;
mod frontmatter;
pub mod loader;
mod markdown;

pub use assets::{AssetResolver, Resolved};
pub use document::{Document, Status};
pub use frontmatter::FrontMatter;
pub use markdown::{MarkdownRenderer, RenderedBody};

use std::path::Path;

/// Check if a file is a markdown source
pub(crate) fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}
