//! Site configuration (pelite.yml / pelite.toml)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub sitename: String,
    pub author: String,
    pub site_url: String,
    pub timezone: String,
    pub default_lang: String,
    pub date_format: String,

    // Directories
    pub content_dir: String,
    pub output_dir: String,
    pub static_paths: Vec<String>,
    /// Directory with template overrides, relative to the base directory
    pub theme: Option<String>,

    // Writing
    pub article_save_as: String,
    pub slugify_source: SlugSource,
    pub default_category: String,
    /// Fail documents whose `{filename}` references cannot be resolved
    pub strict_assets: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Listing pages
    /// Articles per listing page, `0` puts every article on one page
    pub default_pagination: usize,
    pub category_save_as: Option<String>,
    pub tag_save_as: Option<String>,
    pub archives_save_as: Option<String>,

    // Feeds
    pub feed_all_rss: Option<String>,
    pub feed_max_items: usize,

    // Blogroll and social widget
    pub links: Vec<LinkConfig>,
    pub social: Vec<LinkConfig>,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            sitename: "My site".to_string(),
            author: String::new(),
            site_url: String::new(),
            timezone: "UTC".to_string(),
            default_lang: "en".to_string(),
            date_format: "%a %d %B %Y".to_string(),

            content_dir: "content".to_string(),
            output_dir: "output".to_string(),
            static_paths: vec!["images".to_string()],
            theme: None,

            article_save_as: "{slug}.html".to_string(),
            slugify_source: SlugSource::Title,
            default_category: "misc".to_string(),
            strict_assets: false,
            highlight: HighlightConfig::default(),

            default_pagination: 10,
            category_save_as: Some("category/{slug}.html".to_string()),
            tag_save_as: Some("tag/{slug}.html".to_string()),
            archives_save_as: Some("archives.html".to_string()),

            feed_all_rss: Some("feeds/all.rss.xml".to_string()),
            feed_max_items: 20,

            links: Vec::new(),
            social: Vec::new(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a YAML or TOML file, chosen by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        let config: SiteConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse {:?}", path))?,
            _ => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {:?}", path))?,
        };

        // Fail early on a bad timezone rather than once per document
        config.tz()?;
        Ok(config)
    }

    /// Find and load the site config in a base directory, falling back to defaults
    pub fn discover<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        for name in ["pelite.yml", "pelite.yaml", "pelite.toml"] {
            let candidate = base_dir.as_ref().join(name);
            if candidate.exists() {
                tracing::debug!("Loading config from {:?}", candidate);
                return Self::load(candidate);
            }
        }
        Ok(Self::default())
    }

    /// Timezone used for dates written without an offset
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        if self.timezone.trim().is_empty() {
            return Ok(chrono_tz::UTC);
        }
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => Ok(tz),
            Err(e) => bail!("Unknown timezone {:?}: {}", self.timezone, e),
        }
    }
}

/// Where an article's slug comes from when no `Slug` header is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugSource {
    Title,
    Basename,
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "InspiredGitHub".to_string(),
            line_number: false,
        }
    }
}

/// A named link, written either as `{name, url}` or as a `[name, url]` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LinkRepr")]
pub struct LinkConfig {
    pub name: String,
    pub url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LinkRepr {
    Pair(String, String),
    Map { name: String, url: String },
}

impl From<LinkRepr> for LinkConfig {
    fn from(repr: LinkRepr) -> Self {
        match repr {
            LinkRepr::Pair(name, url) | LinkRepr::Map { name, url } => Self { name, url },
        }
    }
}
