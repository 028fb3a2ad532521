//! Built-in article templates using the Tera template engine
//!
//! The default templates are embedded in the binary. A theme directory may
//! override any of them by providing a file with the same name.

use anyhow::{Context as _, Result};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera};

use crate::config::LinkConfig;

const TEMPLATE_NAMES: [&str; 7] = [
    "base.html",
    "article.html",
    "summaries.html",
    "index.html",
    "category.html",
    "tag.html",
    "archives.html",
];

lazy_static! {
    static ref META_TITLE: Regex =
        Regex::new(r#"<meta property="og:title" content="([^"]*)">"#).unwrap();
    static ref META_DATE: Regex =
        Regex::new(r#"<meta property="article:published_time" content="([^"]*)">"#).unwrap();
}

/// Template renderer with the embedded default theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a renderer, letting files in `theme_dir` replace embedded templates
    pub fn new(theme_dir: Option<&Path>) -> Result<Self> {
        let mut tera = Tera::default();

        // Escaping is explicit through the `attr` filter; rendered bodies are inserted raw
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("base.html", include_str!("theme/base.html")),
            ("article.html", include_str!("theme/article.html")),
            ("summaries.html", include_str!("theme/summaries.html")),
            ("index.html", include_str!("theme/index.html")),
            ("category.html", include_str!("theme/category.html")),
            ("tag.html", include_str!("theme/tag.html")),
            ("archives.html", include_str!("theme/archives.html")),
        ])?;

        if let Some(theme_dir) = theme_dir {
            let overrides: Vec<_> = TEMPLATE_NAMES
                .iter()
                .map(|name| (theme_dir.join(name), Some(*name)))
                .filter(|(path, _)| path.is_file())
                .collect();
            if !overrides.is_empty() {
                tracing::debug!("Loading {} template(s) from {:?}", overrides.len(), theme_dir);
                tera.add_template_files(overrides)
                    .with_context(|| format!("Failed to load templates from {:?}", theme_dir))?;
            }
        }

        // Register custom filters
        tera.register_filter("attr", attr_filter);
        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a single article page
    pub fn render_article(
        &self,
        article: &ArticleData,
        site: &SiteData,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("article", article);
        self.tera.render("article.html", &context)
    }

    /// Render one page of a listing (index, category, tag or archives)
    pub fn render_listing(
        &self,
        template: &str,
        listing: &ListingData,
        site: &SiteData,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("name", &listing.name);
        context.insert("articles", &listing.articles);
        context.insert("pagination", &listing.pagination);
        self.tera.render(template, &context)
    }
}

/// Title and date recovered from a rendered article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMetadata {
    pub title: String,
    pub date: DateTime<FixedOffset>,
}

/// Read the title and publication date back out of a rendered article
pub fn read_metadata(html: &str) -> Option<RenderedMetadata> {
    let title = META_TITLE.captures(html)?.get(1)?.as_str();
    let date = META_DATE.captures(html)?.get(1)?.as_str();
    Some(RenderedMetadata {
        title: unescape_attr(title),
        date: DateTime::parse_from_rfc3339(&unescape_attr(date)).ok()?,
    })
}

/// Escape text for use in element content and quoted attributes
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn unescape_attr(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Tera filter: escape a string for HTML
fn attr_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("attr", "value", String, value);
    Ok(tera::Value::String(escape_attr(&s)))
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    let collapsed = result.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(tera::Value::String(collapsed))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => " …".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub sitename: String,
    pub author: String,
    pub default_lang: String,
    pub home_url: String,
    pub feed_url: Option<String>,
    pub links: Vec<LinkConfig>,
    pub social: Vec<LinkConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleData {
    pub title: String,
    pub url: String,
    pub date_iso: String,
    pub date_display: String,
    pub modified_iso: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    /// Resolved image URL
    pub image: Option<String>,
    pub lang: String,
    pub content: String,
    pub extra: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingData {
    /// Category or tag name
    pub name: Option<String>,
    pub articles: Vec<ArticleData>,
    pub pagination: PaginationData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationData {
    pub current: usize,
    pub total: usize,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl PaginationData {
    /// A listing that fits on one page
    pub fn single() -> Self {
        Self {
            current: 1,
            total: 1,
            prev_url: None,
            next_url: None,
        }
    }
}
