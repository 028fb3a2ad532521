//! Markdown rendering with syntax highlighting

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::path::{Path, PathBuf};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::assets::AssetResolver;
use crate::error::AssetNotFoundError;

lazy_static! {
    /// `src=`/`href=` attributes inside raw HTML blocks
    static ref HTML_ATTR: Regex =
        Regex::new(r#"\b(src|href)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
}

/// Output of rendering one markdown body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBody {
    pub html: String,
    /// Content-relative files referenced by the body
    pub assets: Vec<PathBuf>,
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Option<Theme>,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options("InspiredGitHub", false)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set.themes.remove(theme).or_else(|| {
            tracing::warn!("Unknown highlight theme {:?}, using a default", theme);
            theme_set.themes.into_values().next()
        });
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            line_numbers,
        }
    }

    /// Render markdown to HTML, rewriting `{filename}`-style references
    pub fn render(
        &self,
        markdown: &str,
        resolver: &AssetResolver,
        source: &Path,
    ) -> Result<RenderedBody, AssetNotFoundError> {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES;
        let parser = Parser::new_ext(markdown, options);

        let mut assets = Vec::new();
        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        // Unresolved references are written as raw HTML so pulldown-cmark
        // does not percent-encode them
        let mut verbatim_links: Vec<bool> = Vec::new();
        let mut raw_image: Option<RawImage> = None;

        for event in parser {
            if let Some(image) = raw_image.as_mut() {
                match event {
                    Event::Start(Tag::Image { .. }) => image.nesting += 1,
                    Event::End(TagEnd::Image) if image.nesting > 0 => image.nesting -= 1,
                    Event::End(TagEnd::Image) => {
                        events.push(Event::InlineHtml(CowStr::from(image.to_html())));
                        raw_image = None;
                    }
                    Event::Text(text) | Event::Code(text) => image.alt.push_str(&text),
                    Event::SoftBreak | Event::HardBreak => image.alt.push(' '),
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(lang) => lang
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted =
                        self.highlight_code(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => match rewrite(&dest_url, resolver, source, &mut assets)? {
                    Rewrite::Resolved(url) => events.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url: url,
                        title,
                        id,
                    })),
                    Rewrite::Verbatim => {
                        raw_image = Some(RawImage {
                            src: dest_url.to_string(),
                            title: title.to_string(),
                            alt: String::new(),
                            nesting: 0,
                        });
                    }
                    Rewrite::Untouched => events.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url,
                        title,
                        id,
                    })),
                },
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => match rewrite(&dest_url, resolver, source, &mut assets)? {
                    Rewrite::Resolved(url) => {
                        verbatim_links.push(false);
                        events.push(Event::Start(Tag::Link {
                            link_type,
                            dest_url: url,
                            title,
                            id,
                        }));
                    }
                    Rewrite::Verbatim => {
                        verbatim_links.push(true);
                        events.push(Event::InlineHtml(CowStr::from(open_anchor(
                            &dest_url, &title,
                        ))));
                    }
                    Rewrite::Untouched => {
                        verbatim_links.push(false);
                        events.push(Event::Start(Tag::Link {
                            link_type,
                            dest_url,
                            title,
                            id,
                        }));
                    }
                },
                Event::End(TagEnd::Link) => {
                    if verbatim_links.pop().unwrap_or(false) {
                        events.push(Event::InlineHtml(CowStr::from("</a>")));
                    } else {
                        events.push(event);
                    }
                }
                Event::Html(raw) => {
                    let raw = rewrite_html(&raw, resolver, source, &mut assets)?;
                    events.push(Event::Html(CowStr::from(raw)));
                }
                Event::InlineHtml(raw) => {
                    let raw = rewrite_html(&raw, resolver, source, &mut assets)?;
                    events.push(Event::InlineHtml(CowStr::from(raw)));
                }
                _ => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        assets.sort();
        assets.dedup();
        Ok(RenderedBody {
            html: html_output,
            assets,
        })
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");
        let class = html_escape(lang);

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let highlighted = self
            .theme
            .as_ref()
            .and_then(|theme| {
                highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
            });

        match highlighted {
            Some(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, &class),
            Some(highlighted) => format!(
                r#"<div class="highlight language-{}">{}</div>"#,
                class, highlighted
            ),
            // Fallback to plain code block
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                class,
                html_escape(code)
            ),
        }
    }

    /// Add line numbers to highlighted code
    fn add_line_numbers(&self, code: &str, lang: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<table class="highlighttable language-{}"><tr><td class="linenos"><pre>{}</pre></td><td class="code">{}</td></tr></table>"#,
            lang,
            gutter,
            lines.join("\n")
        )
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do with a link or image destination
enum Rewrite<'a> {
    /// A reference replaced by its canonical URL
    Resolved(CowStr<'a>),
    /// An unresolved reference, kept exactly as written
    Verbatim,
    /// Not a reference
    Untouched,
}

fn rewrite<'a>(
    dest_url: &str,
    resolver: &AssetResolver,
    source: &Path,
    assets: &mut Vec<PathBuf>,
) -> Result<Rewrite<'a>, AssetNotFoundError> {
    match resolver.resolve(dest_url, source)? {
        Some(resolved) => {
            assets.extend(resolved.asset);
            Ok(Rewrite::Resolved(CowStr::from(resolved.url)))
        }
        None if AssetResolver::is_reference(dest_url) => Ok(Rewrite::Verbatim),
        None => Ok(Rewrite::Untouched),
    }
}

/// An image whose source is an unresolved reference
struct RawImage {
    src: String,
    title: String,
    alt: String,
    nesting: usize,
}

impl RawImage {
    fn to_html(&self) -> String {
        let mut html = format!(
            r#"<img src="{}" alt="{}""#,
            html_escape(&self.src),
            html_escape(&self.alt)
        );
        if !self.title.is_empty() {
            html.push_str(&format!(r#" title="{}""#, html_escape(&self.title)));
        }
        html.push_str(" />");
        html
    }
}

fn open_anchor(href: &str, title: &str) -> String {
    if title.is_empty() {
        format!(r#"<a href="{}">"#, html_escape(href))
    } else {
        format!(
            r#"<a href="{}" title="{}">"#,
            html_escape(href),
            html_escape(title)
        )
    }
}

/// Rewrite reference attributes inside a raw HTML fragment
fn rewrite_html(
    raw: &str,
    resolver: &AssetResolver,
    source: &Path,
    assets: &mut Vec<PathBuf>,
) -> Result<String, AssetNotFoundError> {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;

    for caps in HTML_ATTR.captures_iter(raw) {
        let Some(target) = caps.get(2).or_else(|| caps.get(3)) else {
            continue;
        };
        if let Some(resolved) = resolver.resolve(target.as_str(), source)? {
            assets.extend(resolved.asset);
            out.push_str(&raw[last..target.start()]);
            out.push_str(&html_escape(&resolved.url));
            last = target.end();
        }
    }

    out.push_str(&raw[last..]);
    Ok(out)
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
