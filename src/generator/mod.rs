//! Generator module - renders documents and site pages into the output directory

use anyhow::Result;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::content::loader::ContentLoader;
use crate::content::{AssetResolver, Document, MarkdownRenderer, Status};
use crate::error::DocumentError;
use crate::helpers::{date_rfc2822, format_date, path_to_url, url_for};
use crate::templates::{
    escape_attr, ArticleData, ListingData, PaginationData, SiteData, TemplateRenderer,
};
use crate::Site;

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Article files written, relative to the output directory
    pub written: Vec<PathBuf>,
    /// Documents skipped because their status is draft
    pub drafts: usize,
    /// Per-document failures, in source order
    pub failures: Vec<DocumentError>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} written, {} draft(s) skipped, {} failed",
            self.written.len(),
            self.drafts,
            self.failures.len()
        )
    }
}

/// A document that made it to disk
struct Written {
    save_as: PathBuf,
    article: ArticleData,
    document: Document,
    assets: Vec<PathBuf>,
}

/// One page of a listing, over documents or written articles
struct ListingPage<'a, T> {
    template: &'static str,
    name: Option<String>,
    save_as: PathBuf,
    pagination: PaginationData,
    articles: Vec<&'a T>,
}

/// Static site generator
pub struct Generator {
    site: Site,
    markdown: MarkdownRenderer,
    templates: TemplateRenderer,
    strict: bool,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let markdown = MarkdownRenderer::with_options(
            &site.config.highlight.theme,
            site.config.highlight.line_number,
        );
        let templates = TemplateRenderer::new(site.theme_dir.as_deref())?;

        Ok(Self {
            site: site.clone(),
            markdown,
            templates,
            strict: site.config.strict_assets,
        })
    }

    /// Fail documents with unresolvable references instead of passing them through
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Generate the entire site
    pub fn generate(&self) -> Result<BuildReport> {
        let config = &self.site.config;
        fs::create_dir_all(&self.site.output_dir)?;

        let loader = ContentLoader::new(&self.site);
        let sources = loader.discover()?;
        tracing::info!("Found {} source file(s)", sources.len());

        let loaded: Vec<Result<Document, DocumentError>> = sources
            .into_par_iter()
            .map(|source| source.and_then(|path| loader.load(&path)))
            .collect();

        let mut report = BuildReport::default();
        let mut resolver = AssetResolver::new(&self.site.content_dir, config, self.strict);
        let mut outputs: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut accepted = Vec::new();

        // Site pages win over articles that would land on the same file
        let listed_docs: Vec<&Document> = loaded
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .filter(|d| d.is_listed())
            .collect();
        let mut reserved: BTreeSet<PathBuf> = self
            .plan_listings(&listed_docs, |d| d)
            .into_iter()
            .map(|page| page.save_as)
            .collect();
        if let Some(feed_path) = &config.feed_all_rss {
            reserved.insert(PathBuf::from(feed_path.trim_start_matches('/')));
        }

        for result in loaded {
            let doc = match result {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failures.push(e);
                    continue;
                }
            };

            if doc.status == Status::Draft {
                tracing::debug!("Skipping draft {:?}", doc.source);
                report.drafts += 1;
                continue;
            }

            let save_as = match doc.save_as(config) {
                Ok(save_as) => save_as,
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failures.push(e);
                    continue;
                }
            };
            if reserved.contains(&save_as) {
                let e = DocumentError::ReservedOutput {
                    path: doc.source.clone(),
                    output: save_as,
                };
                tracing::warn!("{}", e);
                report.failures.push(e);
                continue;
            }
            if let Some(first) = outputs.get(&save_as) {
                let e = DocumentError::DuplicateOutput {
                    path: doc.source.clone(),
                    output: save_as,
                    first: first.clone(),
                };
                tracing::warn!("{}", e);
                report.failures.push(e);
                continue;
            }

            outputs.insert(save_as.clone(), doc.source.clone());
            resolver.add_article(&doc.source, url_for(config, &path_to_url(&save_as)));
            accepted.push((doc, save_as));
        }

        let site_data = self.build_site_data();
        let rendered: Vec<Result<Written, DocumentError>> = accepted
            .into_par_iter()
            .map(|(doc, save_as)| self.write_document(doc, save_as, &resolver, &site_data))
            .collect();

        let mut written = Vec::new();
        for result in rendered {
            match result {
                Ok(w) => written.push(w),
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failures.push(e);
                }
            }
        }

        self.copy_static_paths()?;
        let assets: BTreeSet<&Path> = written
            .iter()
            .flat_map(|w| w.assets.iter().map(PathBuf::as_path))
            .collect();
        self.copy_assets(assets)?;

        // Sort by date (newest first)
        let mut listed: Vec<&Written> = written
            .iter()
            .filter(|w| w.document.is_listed())
            .collect();
        listed.sort_by(|a, b| {
            b.document
                .date
                .cmp(&a.document.date)
                .then_with(|| a.document.title.cmp(&b.document.title))
        });

        self.generate_listings(&listed, &site_data)?;
        if let Some(feed_path) = &config.feed_all_rss {
            self.generate_rss_feed(&listed, feed_path)?;
        }

        report.written = written.into_iter().map(|w| w.save_as).collect();
        tracing::info!("Build finished: {}", report.summary());
        Ok(report)
    }

    /// Render one document and write it to its output path
    fn write_document(
        &self,
        doc: Document,
        save_as: PathBuf,
        resolver: &AssetResolver,
        site_data: &SiteData,
    ) -> Result<Written, DocumentError> {
        let body = self
            .markdown
            .render(&doc.body, resolver, &doc.source)
            .map_err(|e| DocumentError::render(&doc.source, e))?;
        let mut assets = body.assets;

        let image = match &doc.image {
            Some(reference) => match resolver
                .resolve(reference, &doc.source)
                .map_err(|e| DocumentError::render(&doc.source, e))?
            {
                Some(resolved) => {
                    assets.extend(resolved.asset);
                    Some(resolved.url)
                }
                None => Some(reference.clone()),
            },
            None => None,
        };

        let article = self.build_article_data(&doc, &save_as, body.html, image);
        let html = self
            .templates
            .render_article(&article, site_data)
            .map_err(|e| DocumentError::render(&doc.source, e))?;

        let output_path = self.site.output_dir.join(&save_as);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| DocumentError::io(parent, e))?;
        }
        fs::write(&output_path, html).map_err(|e| DocumentError::io(&output_path, e))?;
        tracing::debug!("Generated: {:?}", output_path);

        Ok(Written {
            save_as,
            article,
            document: doc,
            assets,
        })
    }

    /// Build site data for templates
    fn build_site_data(&self) -> SiteData {
        let config = &self.site.config;
        SiteData {
            sitename: config.sitename.clone(),
            author: config.author.clone(),
            default_lang: config.default_lang.clone(),
            home_url: url_for(config, ""),
            feed_url: config.feed_all_rss.as_deref().map(|p| url_for(config, p)),
            links: config.links.clone(),
            social: config.social.clone(),
        }
    }

    fn build_article_data(
        &self,
        doc: &Document,
        save_as: &Path,
        content: String,
        image: Option<String>,
    ) -> ArticleData {
        let config = &self.site.config;
        ArticleData {
            title: doc.title.clone(),
            url: url_for(config, &path_to_url(save_as)),
            date_iso: doc.date.to_rfc3339(),
            date_display: format_date(&doc.date, &config.date_format),
            modified_iso: doc.modified.map(|m| m.to_rfc3339()),
            category: doc.category.clone(),
            tags: doc.tags.iter().cloned().collect(),
            description: doc.description.clone(),
            image,
            lang: doc.lang.clone().unwrap_or_else(|| config.default_lang.clone()),
            content,
            extra: doc.extra.clone(),
        }
    }

    /// Plan the index, category, tag and archive pages for listed items, newest first
    fn plan_listings<'a, T>(
        &self,
        items: &[&'a T],
        document: impl Fn(&T) -> &Document,
    ) -> Vec<ListingPage<'a, T>> {
        let config = &self.site.config;
        let mut pages = self.paginate("index.html", None, "index.html", items);

        if let Some(pattern) = &config.category_save_as {
            let groups = group_by(items, |item| {
                vec![document(item)
                    .category
                    .clone()
                    .unwrap_or_else(|| config.default_category.clone())]
            });
            for (slug, (name, group)) in groups {
                let save_as = pattern.replace("{slug}", &slug);
                pages.extend(self.paginate("category.html", Some(name), &save_as, &group));
            }
        }

        if let Some(pattern) = &config.tag_save_as {
            let groups = group_by(items, |item| document(item).tags.iter().cloned().collect());
            for (slug, (name, group)) in groups {
                let save_as = pattern.replace("{slug}", &slug);
                pages.extend(self.paginate("tag.html", Some(name), &save_as, &group));
            }
        }

        if let Some(archives) = &config.archives_save_as {
            pages.push(ListingPage {
                template: "archives.html",
                name: None,
                save_as: PathBuf::from(archives.trim_start_matches('/')),
                pagination: PaginationData::single(),
                articles: items.to_vec(),
            });
        }

        pages
    }

    /// Split a listing into pages of `default_pagination` items
    fn paginate<'a, T>(
        &self,
        template: &'static str,
        name: Option<String>,
        save_as: &str,
        items: &[&'a T],
    ) -> Vec<ListingPage<'a, T>> {
        let config = &self.site.config;
        let base = PathBuf::from(save_as.trim_start_matches('/'));
        let per_page = match config.default_pagination {
            0 => items.len().max(1),
            n => n,
        };

        // An empty index still gets its first page
        let chunks: Vec<&[&'a T]> = if items.is_empty() {
            vec![items]
        } else {
            items.chunks(per_page).collect()
        };
        let total = chunks.len();
        let url = |number: usize| url_for(config, &path_to_url(&page_path(&base, number)));

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let current = i + 1;
                ListingPage {
                    template,
                    name: name.clone(),
                    save_as: page_path(&base, current),
                    pagination: PaginationData {
                        current,
                        total,
                        prev_url: (current > 1).then(|| url(current - 1)),
                        next_url: (current < total).then(|| url(current + 1)),
                    },
                    articles: chunk.to_vec(),
                }
            })
            .collect()
    }

    /// Write the index, category, tag and archive pages
    fn generate_listings(&self, listed: &[&Written], site_data: &SiteData) -> Result<()> {
        let pages = self.plan_listings(listed, |w| &w.document);

        for page in &pages {
            let listing = ListingData {
                name: page.name.clone(),
                articles: page.articles.iter().map(|w| w.article.clone()).collect(),
                pagination: page.pagination.clone(),
            };
            let html = self
                .templates
                .render_listing(page.template, &listing, site_data)?;

            let output_path = self.site.output_dir.join(&page.save_as);
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output_path, html)?;
            tracing::debug!("Generated: {:?}", output_path);
        }
        tracing::info!("Generated {} listing page(s)", pages.len());

        Ok(())
    }

    /// Generate the RSS 2.0 feed
    fn generate_rss_feed(&self, listed: &[&Written], feed_path: &str) -> Result<()> {
        let config = &self.site.config;
        let home = url_for(config, "");

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<rss version="2.0"><channel>"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.sitename)));
        feed.push_str(&format!("  <link>{}</link>\n", escape_xml(&home)));
        feed.push_str(&format!(
            "  <description>{}</description>\n",
            escape_xml(&config.sitename)
        ));
        feed.push_str(&format!(
            "  <language>{}</language>\n",
            escape_xml(&config.default_lang)
        ));
        // Newest article date keeps the feed stable across rebuilds
        if let Some(newest) = listed.first() {
            feed.push_str(&format!(
                "  <lastBuildDate>{}</lastBuildDate>\n",
                date_rfc2822(&newest.document.date)
            ));
        }

        for written in listed.iter().take(config.feed_max_items) {
            let article = &written.article;
            feed.push_str("  <item>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&article.title)));
            feed.push_str(&format!("    <link>{}</link>\n", escape_xml(&article.url)));
            feed.push_str(&format!(
                "    <guid isPermaLink=\"true\">{}</guid>\n",
                escape_xml(&article.url)
            ));
            feed.push_str(&format!(
                "    <pubDate>{}</pubDate>\n",
                date_rfc2822(&written.document.date)
            ));
            if !config.author.is_empty() {
                feed.push_str(&format!(
                    "    <dc:creator xmlns:dc=\"http://purl.org/dc/elements/1.1/\">{}</dc:creator>\n",
                    escape_xml(&config.author)
                ));
            }
            if let Some(category) = &article.category {
                feed.push_str(&format!("    <category>{}</category>\n", escape_xml(category)));
            }
            // Both branches are HTML: the plain-text description is escaped,
            // the rendered body is already markup
            let description = match &article.description {
                Some(d) => escape_attr(d),
                None => article.content.clone(),
            };
            let description = strip_invalid_xml_chars(&description);
            feed.push_str(&format!(
                "    <description><![CDATA[{}]]></description>\n",
                description.replace("]]>", "]]]]><![CDATA[>")
            ));
            feed.push_str("  </item>\n");
        }

        feed.push_str("</channel></rss>\n");

        let output_path = self.site.output_dir.join(feed_path.trim_start_matches('/'));
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, feed)?;
        tracing::info!("Generated {}", feed_path);

        Ok(())
    }

    /// Copy configured static directories verbatim
    fn copy_static_paths(&self) -> Result<()> {
        for static_path in &self.site.config.static_paths {
            let source_dir = self.site.content_dir.join(static_path);
            if !source_dir.exists() {
                continue;
            }

            for entry in WalkDir::new(&source_dir)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
                })
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable static file: {}", e);
                        continue;
                    }
                };
                if entry.file_type().is_file() {
                    let relative = entry.path().strip_prefix(&self.site.content_dir)?;
                    self.copy_file(relative)?;
                }
            }
        }

        Ok(())
    }

    /// Copy files referenced from documents that live outside static paths
    fn copy_assets<'a>(&self, assets: impl IntoIterator<Item = &'a Path>) -> Result<()> {
        for relative in assets {
            self.copy_file(relative)?;
        }
        Ok(())
    }

    fn copy_file(&self, relative: &Path) -> Result<()> {
        let dest = self.site.output_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(self.site.content_dir.join(relative), &dest)?;
        Ok(())
    }
}

/// Group items by slugified key, keeping the first spelling as the display name
fn group_by<'a, T>(
    items: &[&'a T],
    keys: impl Fn(&T) -> Vec<String>,
) -> BTreeMap<String, (String, Vec<&'a T>)> {
    let mut groups: BTreeMap<String, (String, Vec<&'a T>)> = BTreeMap::new();
    for item in items {
        for name in keys(*item) {
            let slug = slug::slugify(&name);
            if slug.is_empty() {
                continue;
            }
            groups
                .entry(slug)
                .or_insert_with(|| (name, Vec::new()))
                .1
                .push(*item);
        }
    }
    groups
}

/// `index.html`, `index2.html`, `index3.html`...
fn page_path(base: &Path, number: usize) -> PathBuf {
    if number <= 1 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}{}.{}", stem, number, ext.to_string_lossy()),
        None => format!("{}{}", stem, number),
    };
    base.with_file_name(name)
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Strip invalid XML control characters (except tab, newline, carriage return)
fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            c == '\t'
                || c == '\n'
                || c == '\r'
                || ('\u{0020}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}
