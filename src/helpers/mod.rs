//! Helper functions shared by the renderer, templates and feed writer

mod date;
mod url;

pub use date::*;
pub use url::*;
