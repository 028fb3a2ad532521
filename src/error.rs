//! Error types for loading and rendering documents
//!
//! Every error here is scoped to a single document. The generator collects
//! them into a [`crate::generator::BuildReport`] instead of aborting the batch.

use std::path::PathBuf;

/// Malformed front matter or a missing/invalid required field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A header line that is neither `Key: Value` nor a continuation
    #[error("line {line}: expected `Key: Value`, found {text:?}")]
    UnterminatedKey { line: usize, text: String },

    /// An indented continuation line before any key
    #[error("line {line}: continuation line without a preceding key")]
    OrphanContinuation { line: usize },

    /// The same key appears twice (compared case-insensitively)
    #[error("line {line}: duplicate key {key:?}")]
    DuplicateKey { line: usize, key: String },

    /// A `---` fenced header without its closing fence
    #[error("front-matter block opened with `---` is never closed")]
    UnterminatedBlock,

    /// A required field is absent or empty
    #[error("missing required field {0:?}")]
    MissingField(&'static str),

    #[error("invalid date {value:?} for {field:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid status {0:?} (expected published, draft or hidden)")]
    InvalidStatus(String),

    #[error("document body is empty")]
    EmptyBody,
}

/// A `{filename}`-style reference that points at nothing (strict mode only)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("asset {reference:?} referenced from {source_path:?} not found")]
pub struct AssetNotFoundError {
    pub reference: String,
    pub source_path: PathBuf,
}

/// Failures while turning a loaded document into HTML
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    AssetNotFound(#[from] AssetNotFoundError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// A failure attached to one source file
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("render error in {path:?}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    /// Two documents resolve to the same output file
    #[error("{path:?} would overwrite {output:?}, already written from {first:?}")]
    DuplicateOutput {
        path: PathBuf,
        output: PathBuf,
        first: PathBuf,
    },

    /// A document's output path is taken by a generated site page
    #[error("{path:?} would overwrite the site page {output:?}")]
    ReservedOutput { path: PathBuf, output: PathBuf },

    /// The output path would land outside the output directory
    #[error("{path:?} has an invalid output path {output:?}")]
    InvalidOutput { path: PathBuf, output: String },
}

impl DocumentError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn render(path: impl Into<PathBuf>, source: impl Into<RenderError>) -> Self {
        Self::Render {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Source file the error belongs to
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::Render { path, .. }
            | Self::DuplicateOutput { path, .. }
            | Self::ReservedOutput { path, .. }
            | Self::InvalidOutput { path, .. } => path,
        }
    }

    /// The underlying parse error, if this is one
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_asset_not_found(&self) -> bool {
        matches!(
            self,
            Self::Render {
                source: RenderError::AssetNotFound(_),
                ..
            }
        )
    }
}
