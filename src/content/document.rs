//! Document model

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use super::FrontMatter;
use crate::config::{SiteConfig, SlugSource};
use crate::error::{DocumentError, ParseError};
use crate::helpers::parse_date;

/// Header keys with a dedicated field on [`Document`]
const KNOWN_KEYS: [&str; 11] = [
    "title",
    "date",
    "modified",
    "category",
    "tags",
    "description",
    "summary",
    "image",
    "slug",
    "status",
    "lang",
];

/// Publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Written and listed
    Published,
    /// Loaded but never written
    Draft,
    /// Written but left out of the index and feed
    Hidden,
}

impl std::str::FromStr for Status {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "published" => Ok(Status::Published),
            "draft" => Ok(Status::Draft),
            "hidden" => Ok(Status::Hidden),
            _ => Err(ParseError::InvalidStatus(s.to_string())),
        }
    }
}

/// One parsed article
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Article title
    pub title: String,

    /// Publication date
    pub date: DateTime<FixedOffset>,

    /// Last modification date
    pub modified: Option<DateTime<FixedOffset>>,

    pub category: Option<String>,

    /// Tags, deduplicated
    pub tags: BTreeSet<String>,

    pub description: Option<String>,

    /// Unresolved image reference, as written in the header
    pub image: Option<String>,

    /// Explicit slug from the header
    pub slug: Option<String>,

    pub status: Status,

    pub lang: Option<String>,

    /// Every header pair, as written
    pub metadata: IndexMap<String, String>,

    /// Header pairs without a dedicated field
    pub extra: IndexMap<String, String>,

    /// Source file path, relative to the content directory
    pub source: PathBuf,

    /// Raw markdown body
    pub body: String,
}

impl Document {
    /// Build a document from the raw text of a source file
    pub fn from_source(
        source: impl Into<PathBuf>,
        raw: &str,
        config: &SiteConfig,
    ) -> Result<Self, ParseError> {
        let (fm, body) = FrontMatter::parse(raw)?;
        let tz = config.tz().unwrap_or(chrono_tz::UTC);

        let title = non_empty(fm.get("title"))
            .ok_or(ParseError::MissingField("Title"))?
            .to_string();

        let date_raw = non_empty(fm.get("date")).ok_or(ParseError::MissingField("Date"))?;
        let date = parse_date(date_raw, tz).ok_or_else(|| ParseError::InvalidDate {
            field: "Date",
            value: date_raw.to_string(),
        })?;

        let modified = match non_empty(fm.get("modified")) {
            Some(value) => Some(parse_date(value, tz).ok_or_else(|| ParseError::InvalidDate {
                field: "Modified",
                value: value.to_string(),
            })?),
            None => None,
        };

        let status = match non_empty(fm.get("status")) {
            Some(value) => value.parse()?,
            None => Status::Published,
        };

        let tags: BTreeSet<String> = fm
            .get("tags")
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let body = body.trim_end_matches(['\n', '\r']);
        if body.trim().is_empty() {
            return Err(ParseError::EmptyBody);
        }

        let owned = |key: &str| non_empty(fm.get(key)).map(str::to_string);
        let category = owned("category");
        let description = owned("description").or_else(|| owned("summary"));
        let image = owned("image");
        let slug = owned("slug");
        let lang = owned("lang");

        let metadata = fm.into_inner();
        let extra = metadata
            .iter()
            .filter(|(k, _)| !KNOWN_KEYS.iter().any(|known| k.eq_ignore_ascii_case(known)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            title,
            date,
            modified,
            category,
            tags,
            description,
            image,
            slug,
            status,
            lang,
            metadata,
            extra,
            source: source.into(),
            body: body.to_string(),
        })
    }

    /// URL-friendly name, from the header, the title or the file name
    pub fn slug(&self, config: &SiteConfig) -> String {
        if let Some(slug) = self.slug.as_deref().map(slug::slugify) {
            if !slug.is_empty() {
                return slug;
            }
        }

        let stem = self
            .source
            .file_stem()
            .and_then(|s| s.to_str())
            .map(slug::slugify)
            .unwrap_or_default();

        let from_title = slug::slugify(&self.title);
        let slug = match config.slugify_source {
            SlugSource::Title if !from_title.is_empty() => from_title,
            _ => stem,
        };

        if slug.is_empty() {
            "untitled".to_string()
        } else {
            slug
        }
    }

    /// Output path relative to the output directory
    ///
    /// Every placeholder is slugified, and the result must stay inside the
    /// output directory.
    pub fn save_as(&self, config: &SiteConfig) -> Result<PathBuf, DocumentError> {
        let category = self
            .category
            .as_deref()
            .unwrap_or(&config.default_category);
        let lang = self.lang.as_deref().unwrap_or(&config.default_lang);

        let path = config
            .article_save_as
            .replace("{slug}", &self.slug(config))
            .replace("{category}", &slug::slugify(category))
            .replace("{lang}", &slug::slugify(lang));

        let relative = Path::new(path.trim_start_matches('/'));
        let contained = relative.components().next().is_some()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !contained {
            return Err(DocumentError::InvalidOutput {
                path: self.source.clone(),
                output: path,
            });
        }
        Ok(relative.to_path_buf())
    }

    pub fn is_listed(&self) -> bool {
        self.status == Status::Published
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
