//! pelite: a small static article renderer
//!
//! Reads Markdown articles with a `Key: Value` metadata header and renders
//! each one to an HTML page through embedded Tera templates, alongside an
//! article index and an RSS feed.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use error::{AssetNotFoundError, DocumentError, ParseError, RenderError};

/// A site rooted at a base directory
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content (input) directory
    pub content_dir: PathBuf,
    /// Output directory
    pub output_dir: PathBuf,
    /// Optional directory with template overrides
    pub theme_dir: Option<PathBuf>,
}

impl Site {
    /// Create a new site from a directory, reading its config if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config = config::SiteConfig::discover(base_dir.as_ref())?;
        Ok(Self::with_config(base_dir, config))
    }

    /// Create a site from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let content_dir = base_dir.join(&config.content_dir);
        let output_dir = base_dir.join(&config.output_dir);
        let theme_dir = config.theme.as_ref().map(|t| base_dir.join(t));

        Self {
            config,
            base_dir,
            content_dir,
            output_dir,
            theme_dir,
        }
    }

    /// Render every document into the output directory
    pub fn build(&self) -> Result<generator::BuildReport> {
        commands::build::run(self)
    }

    /// Remove the output directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
