//! Content loader - discovers and loads documents from the content directory

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{is_markdown_file, Document};
use crate::error::DocumentError;
use crate::Site;

/// Loads documents from the content directory
pub struct ContentLoader<'a> {
    site: &'a Site,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    /// List markdown sources under the content directory, sorted by path
    ///
    /// Entries that cannot be read are returned in place as failures so the
    /// rest of the batch still runs.
    pub fn discover(&self) -> Result<Vec<Result<PathBuf, DocumentError>>> {
        let content_dir = &self.site.content_dir;
        if !content_dir.exists() {
            tracing::warn!("Content directory {:?} does not exist", content_dir);
            return Ok(Vec::new());
        }

        let static_paths: Vec<PathBuf> = self
            .site
            .config
            .static_paths
            .iter()
            .map(PathBuf::from)
            .collect();
        let is_static = |path: &Path| {
            let relative = path.strip_prefix(content_dir).unwrap_or(path);
            static_paths.iter().any(|p| relative.starts_with(p))
        };

        let mut sources = Vec::new();
        let walker = WalkDir::new(content_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let Some(path) = e.path().map(Path::to_path_buf) else {
                        return Err(e.into());
                    };
                    if is_hidden(&path) || is_static(&path) {
                        continue;
                    }
                    if is_markdown_file(&path) || path.is_dir() {
                        sources.push(Err(DocumentError::io(
                            self.relative_source(&path),
                            e.into(),
                        )));
                    } else {
                        tracing::warn!("Skipping unreadable {:?}: {}", path, e);
                    }
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_markdown_file(path) || is_static(path) {
                continue;
            }
            sources.push(Ok(path.to_path_buf()));
        }

        Ok(sources)
    }

    /// Load a single document from a file
    pub fn load(&self, path: &Path) -> Result<Document, DocumentError> {
        let raw = fs::read_to_string(path).map_err(|e| DocumentError::io(path, e))?;
        let source = self.relative_source(path);

        Document::from_source(&source, &raw, &self.site.config)
            .map_err(|e| DocumentError::parse(&source, e))
    }

    /// Load every document, keeping failures apart from successes
    pub fn load_all(&self) -> Result<(Vec<Document>, Vec<DocumentError>)> {
        let mut documents = Vec::new();
        let mut failures = Vec::new();

        for source in self.discover()? {
            match source.and_then(|path| self.load(&path)) {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    tracing::warn!("{}", e);
                    failures.push(e);
                }
            }
        }

        // Sort by date descending (newest first)
        documents.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.source.cmp(&b.source)));

        Ok((documents, failures))
    }

    /// Source path relative to the content directory
    pub fn relative_source(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.site.content_dir)
            .unwrap_or(path)
            .to_path_buf()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;

    fn site_with(files: &[(&str, &str)]) -> (tempfile::TempDir, Site) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join("content").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    #[test]
    fn test_discover_skips_static_and_hidden() {
        let (_dir, site) = site_with(&[
            ("b.md", "x"),
            ("a/one.markdown", "x"),
            ("images/readme.md", "x"),
            (".drafts/secret.md", "x"),
            ("notes.txt", "x"),
        ]);
        let loader = ContentLoader::new(&site);
        let found: Vec<_> = loader
            .discover()
            .unwrap()
            .into_iter()
            .map(|p| loader.relative_source(&p.unwrap()))
            .collect();
        assert_eq!(found, vec![PathBuf::from("a/one.markdown"), PathBuf::from("b.md")]);
    }

    #[test]
    fn test_load_all_collects_failures() {
        let (_dir, site) = site_with(&[
            ("old.md", "Title: Old\nDate: 2017-05-01\n\nOld body"),
            ("new.md", "Title: New\nDate: 2018-05-01\n\nNew body"),
            ("broken.md", "Date: 2018-01-01\n\nNo title"),
        ]);
        let (docs, failures) = ContentLoader::new(&site).load_all().unwrap();
        assert_eq!(
            docs.iter().map(|d| d.title.as_str()).collect::<Vec<_>>(),
            vec!["New", "Old"]
        );
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path(), Path::new("broken.md"));
        assert_eq!(
            failures[0].as_parse(),
            Some(&ParseError::MissingField("Title"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entry_is_a_failure() {
        let (dir, site) = site_with(&[
            ("good.md", "Title: Good\nDate: 2018-05-01\n\nBody"),
            ("images/logo.png", "png"),
        ]);
        let content = dir.path().join("content");
        std::os::unix::fs::symlink(content.join("gone.md"), content.join("bad.md")).unwrap();
        std::os::unix::fs::symlink(content.join("gone.png"), content.join("stale.png")).unwrap();

        let (docs, failures) = ContentLoader::new(&site).load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Good");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path(), Path::new("bad.md"));
        assert!(matches!(failures[0], DocumentError::Io { .. }));
    }

    #[test]
    fn test_missing_content_dir() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert!(ContentLoader::new(&site).discover().unwrap().is_empty());
    }
}
