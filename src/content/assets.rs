//! Resolution of `{filename}`, `{static}` and `{attach}` references

use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use super::is_markdown_file;
use crate::config::SiteConfig;
use crate::error::AssetNotFoundError;
use crate::helpers::{path_to_url, url_for};

lazy_static! {
    static ref REFERENCE: Regex =
        Regex::new(r"^(?:\{(?:filename|static|attach)\}|\|(?:filename|static|attach)\|)(.*)$")
            .unwrap();
}

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Canonical URL to substitute for the reference
    pub url: String,
    /// Content-relative file to publish alongside the document, if not an article
    pub asset: Option<PathBuf>,
}

/// Maps intra-site references to canonical URLs
#[derive(Debug, Clone)]
pub struct AssetResolver {
    content_dir: PathBuf,
    config: SiteConfig,
    /// Content-relative article sources and their output URLs
    articles: HashMap<PathBuf, String>,
    strict: bool,
}

impl AssetResolver {
    pub fn new(content_dir: impl Into<PathBuf>, config: &SiteConfig, strict: bool) -> Self {
        Self {
            content_dir: content_dir.into(),
            config: config.clone(),
            articles: HashMap::new(),
            strict,
        }
    }

    /// Register the output URL of an article so `{filename}` links to it resolve
    pub fn add_article(&mut self, source: &Path, url: String) {
        self.articles.insert(normalize(source), url);
    }

    /// Resolve a reference found in `source` (content-relative)
    ///
    /// Returns `Ok(None)` when `target` is not a reference, or when it cannot
    /// be resolved outside strict mode.
    pub fn resolve(
        &self,
        target: &str,
        source: &Path,
    ) -> Result<Option<Resolved>, AssetNotFoundError> {
        let Some(caps) = REFERENCE.captures(target) else {
            return Ok(None);
        };
        let rest = caps.get(1).map_or("", |m| m.as_str());

        let split = rest.find(['#', '?']).unwrap_or(rest.len());
        let (path_part, suffix) = rest.split_at(split);
        let decoded = percent_decode_str(path_part).decode_utf8_lossy();

        let candidate = if let Some(absolute) = decoded.strip_prefix('/') {
            PathBuf::from(absolute)
        } else {
            source
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(&*decoded)
        };

        if let Some(relative) = normalize_within_root(&candidate) {
            if let Some(url) = self.articles.get(&relative) {
                return Ok(Some(Resolved {
                    url: format!("{}{}", url, suffix),
                    asset: None,
                }));
            }
            // Sources are only reachable through their registered output URL
            if !relative.as_os_str().is_empty()
                && !is_markdown_file(&relative)
                && self.content_dir.join(&relative).is_file()
            {
                let url = url_for(&self.config, &path_to_url(&relative));
                return Ok(Some(Resolved {
                    url: format!("{}{}", url, suffix),
                    asset: Some(relative),
                }));
            }
        }

        if self.strict {
            return Err(AssetNotFoundError {
                reference: target.to_string(),
                source_path: source.to_path_buf(),
            });
        }
        tracing::debug!("Unresolved reference {:?} in {:?}", target, source);
        Ok(None)
    }

    /// Whether `target` uses one of the reference prefixes
    pub fn is_reference(target: &str) -> bool {
        REFERENCE.is_match(target)
    }
}

fn normalize(path: &Path) -> PathBuf {
    normalize_within_root(path).unwrap_or_else(|| path.to_path_buf())
}

/// Lexically resolve `.` and `..`; `None` when the path climbs above the root
fn normalize_within_root(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(parts.iter().collect())
}
