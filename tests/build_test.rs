use std::fs;
use std::path::Path;

use pelite::content::Document;
use pelite::templates::read_metadata;
use pelite::{ParseError, Site};

const CONFIG: &str = r#"
sitename: Mon labo
author: Serge
site_url: https://example.github.io
timezone: Europe/Paris
default_lang: fr
links:
  - [Pelican, "http://getpelican.com/"]
"#;

const GIT_ARTICLE: &str = "Title: Git: les objets\nDate: 2018-02-03 10:00\nCategory: Git\nTags: git, internals\nImage: {filename}/images/tree.png\n\n# Les blobs\n\n![arbre]({filename}/images/tree.png)\n\nVoir [les générateurs]({filename}python/generators.md).\n";

const PYTHON_ARTICLE: &str = "Title: Les générateurs\nDate: 2018-01-01\nCategory: Python\nSummary: Des fonctions qui se mettent en pause\n\n```python\ndef count():\n    yield 1\n```\n";

fn write(base: &Path, relative: &str, content: &str) {
    let path = base.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn setup() -> tempfile::TempDir {
    setup_with("")
}

fn setup_with(extra_config: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "pelite.yml", &format!("{}{}", CONFIG, extra_config));
    write(dir.path(), "content/git.md", GIT_ARTICLE);
    write(dir.path(), "content/python/generators.md", PYTHON_ARTICLE);
    write(dir.path(), "content/images/tree.png", "png");
    dir
}

#[test]
fn test_build_writes_documents_and_site_pages() {
    let dir = setup();
    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();

    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.written.len(), 2);

    let output = &site.output_dir;
    assert!(output.join("git-les-objets.html").is_file());
    assert!(output.join("les-generateurs.html").is_file());
    assert!(output.join("index.html").is_file());
    assert!(output.join("feeds/all.rss.xml").is_file());
    assert!(output.join("images/tree.png").is_file());

    let git = fs::read_to_string(output.join("git-les-objets.html")).unwrap();
    assert!(git.contains(r#"src="https://example.github.io/images/tree.png""#));
    assert!(git.contains(r#"href="https://example.github.io/les-generateurs.html""#));
    assert!(git.contains(r#"<meta property="og:image" content="https://example.github.io/images/tree.png">"#));
    assert!(!git.contains("{filename}"));

    let index = fs::read_to_string(output.join("index.html")).unwrap();
    let git_pos = index.find("git-les-objets.html").unwrap();
    let python_pos = index.find("les-generateurs.html").unwrap();
    assert!(git_pos < python_pos, "index should list newest first");
}

#[test]
fn test_rendered_metadata_round_trips() {
    let dir = setup();
    let site = Site::new(dir.path()).unwrap();
    site.build().unwrap();

    let raw = fs::read_to_string(dir.path().join("content/git.md")).unwrap();
    let doc = Document::from_source("git.md", &raw, &site.config).unwrap();

    let html = fs::read_to_string(site.output_dir.join("git-les-objets.html")).unwrap();
    let meta = read_metadata(&html).unwrap();
    assert_eq!(meta.title, doc.title);
    assert_eq!(meta.date, doc.date);
    assert_eq!(meta.date.to_rfc3339(), "2018-02-03T10:00:00+01:00");
}

#[test]
fn test_malformed_document_does_not_abort_batch() {
    let dir = setup();
    write(dir.path(), "content/broken.md", "Date: 2018-01-01\n\nNo title here");
    write(dir.path(), "content/worse.md", "Title: Bad\nnot a key line\n\nBody");

    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].path(), Path::new("broken.md"));
    assert_eq!(
        report.failures[0].as_parse(),
        Some(&ParseError::MissingField("Title"))
    );
    assert!(matches!(
        report.failures[1].as_parse(),
        Some(ParseError::UnterminatedKey { line: 2, .. })
    ));
    assert!(site.output_dir.join("git-les-objets.html").is_file());
}

#[test]
fn test_build_is_idempotent() {
    let dir = setup();
    let site = Site::new(dir.path()).unwrap();

    site.build().unwrap();
    let first_article = fs::read(site.output_dir.join("les-generateurs.html")).unwrap();
    let first_feed = fs::read(site.output_dir.join("feeds/all.rss.xml")).unwrap();

    site.build().unwrap();
    let second_article = fs::read(site.output_dir.join("les-generateurs.html")).unwrap();
    let second_feed = fs::read(site.output_dir.join("feeds/all.rss.xml")).unwrap();

    assert_eq!(first_article, second_article);
    assert_eq!(first_feed, second_feed);
}

#[test]
fn test_missing_asset_strict_and_lenient() {
    let dir = setup();
    write(
        dir.path(),
        "content/missing.md",
        "Title: Missing\nDate: 2018-03-01\n\n<img src=\"{filename}/images/nope.png\" alt=\"x\">\n\nSee ![plan]({static}/images/plan.png).\n",
    );

    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();
    assert!(report.is_success());
    let html = fs::read_to_string(site.output_dir.join("missing.html")).unwrap();
    assert!(html.contains("{filename}/images/nope.png"));
    assert!(html.contains(r#"<img src="{static}/images/plan.png" alt="plan" />"#));

    let report = pelite::commands::build::run_with_options(&site, true).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].is_asset_not_found());
    assert_eq!(report.failures[0].path(), Path::new("missing.md"));
}

#[test]
fn test_drafts_hidden_and_duplicates() {
    let dir = setup();
    write(
        dir.path(),
        "content/draft.md",
        "Title: Brouillon\nDate: 2018-04-01\nStatus: draft\n\nBody",
    );
    write(
        dir.path(),
        "content/hidden.md",
        "Title: Caché\nDate: 2018-04-02\nStatus: hidden\n\nBody",
    );
    write(
        dir.path(),
        "content/zz-copy.md",
        "Title: Les générateurs\nDate: 2018-04-03\n\nSame slug",
    );

    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();

    assert_eq!(report.drafts, 1);
    assert!(!site.output_dir.join("brouillon.html").exists());
    assert!(site.output_dir.join("cache.html").is_file());

    let index = fs::read_to_string(site.output_dir.join("index.html")).unwrap();
    assert!(!index.contains("cache.html"));

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0],
        pelite::DocumentError::DuplicateOutput { .. }
    ));
    assert_eq!(report.failures[0].path(), Path::new("zz-copy.md"));
}

#[test]
fn test_unknown_keys_are_exposed() {
    let dir = setup();
    write(
        dir.path(),
        "content/extra.md",
        "Title: Extra\nDate: 2018-05-01\nAuthors: Serge\nX-Series: git-internals\n\nBody",
    );

    let site = Site::new(dir.path()).unwrap();
    site.build().unwrap();

    let html = fs::read_to_string(site.output_dir.join("extra.html")).unwrap();
    assert!(html.contains(r#"<meta name="Authors" content="Serge">"#));
    assert!(html.contains(r#"<meta name="X-Series" content="git-internals">"#));
}

#[test]
fn test_article_cannot_replace_site_pages() {
    let dir = setup();
    write(dir.path(), "content/index.md", "Title: Index\nDate: 2018-03-01\n\nBody");

    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0],
        pelite::DocumentError::ReservedOutput { .. }
    ));
    assert_eq!(report.failures[0].path(), Path::new("index.md"));
    assert!(!report.written.contains(&"index.html".into()));

    let index = fs::read_to_string(site.output_dir.join("index.html")).unwrap();
    assert!(index.contains("git-les-objets.html"));
}

#[test]
fn test_output_path_stays_inside_output_dir() {
    let dir = setup_with("article_save_as: \"{lang}/{slug}.html\"\n");
    write(
        dir.path(),
        "content/escape.md",
        "Title: Escape\nDate: 2018-03-01\nLang: ../../pwned\n\nBody",
    );

    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();

    assert!(report.is_success(), "{:?}", report.failures);
    assert!(site.output_dir.join("pwned/escape.html").is_file());
    assert!(site.output_dir.join("fr/git-les-objets.html").is_file());
    assert!(!dir.path().join("pwned").exists());
}

#[cfg(unix)]
#[test]
fn test_unreadable_source_does_not_abort_batch() {
    let dir = setup();
    let content = dir.path().join("content");
    std::os::unix::fs::symlink(content.join("gone.md"), content.join("bad.md")).unwrap();

    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path(), Path::new("bad.md"));
    assert!(matches!(
        report.failures[0],
        pelite::DocumentError::Io { .. }
    ));
}

#[test]
fn test_links_to_drafts_are_not_published() {
    let dir = setup();
    write(
        dir.path(),
        "content/secret.md",
        "Title: Secret\nDate: 2018-03-01\nStatus: draft\n\nTOP SECRET DRAFT",
    );
    write(
        dir.path(),
        "content/public.md",
        "Title: Public\nDate: 2018-03-02\n\nSee [the draft]({filename}secret.md).",
    );

    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();
    assert!(report.is_success(), "{:?}", report.failures);
    assert!(!site.output_dir.join("secret.md").exists());
    assert!(!site.output_dir.join("secret.html").exists());

    let html = fs::read_to_string(site.output_dir.join("public.html")).unwrap();
    assert!(html.contains(r#"<a href="{filename}secret.md">the draft</a>"#));

    let report = pelite::commands::build::run_with_options(&site, true).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].is_asset_not_found());
    assert_eq!(report.failures[0].path(), Path::new("public.md"));
}

#[test]
fn test_listing_pages() {
    let dir = setup_with("default_pagination: 1\n");
    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();
    assert!(report.is_success(), "{:?}", report.failures);

    let output = &site.output_dir;
    let first = fs::read_to_string(output.join("index.html")).unwrap();
    assert!(first.contains("git-les-objets.html"));
    assert!(!first.contains("les-generateurs.html"));
    assert!(first.contains(r#"<a rel="next" href="https://example.github.io/index2.html">"#));

    let second = fs::read_to_string(output.join("index2.html")).unwrap();
    assert!(second.contains("les-generateurs.html"));
    assert!(second.contains(r#"<a rel="prev" href="https://example.github.io/index.html">"#));
    assert!(!output.join("index3.html").exists());

    let category = fs::read_to_string(output.join("category/python.html")).unwrap();
    assert!(category.contains(r#"<h1 class="category">Python</h1>"#));
    assert!(category.contains("les-generateurs.html"));
    assert!(!category.contains("git-les-objets.html"));

    assert!(output.join("category/git.html").is_file());
    let tag = fs::read_to_string(output.join("tag/internals.html")).unwrap();
    assert!(tag.contains("git-les-objets.html"));

    let archives = fs::read_to_string(output.join("archives.html")).unwrap();
    assert!(archives.contains("git-les-objets.html"));
    assert!(archives.contains("les-generateurs.html"));
}

#[test]
fn test_feed_contents() {
    let dir = setup();
    write(
        dir.path(),
        "content/cdata.md",
        "Title: Balises\nDate: 2018-01-15\n\n<div>a]]>b</div>\n",
    );
    write(
        dir.path(),
        "content/hidden.md",
        "Title: Caché\nDate: 2018-06-01\nStatus: hidden\n\nBody",
    );

    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();
    assert!(report.is_success(), "{:?}", report.failures);

    let feed = fs::read_to_string(site.output_dir.join("feeds/all.rss.xml")).unwrap();
    assert_eq!(feed.matches("<item>").count(), 3);
    assert!(!feed.contains("cache.html"));

    let git = feed.find("<link>https://example.github.io/git-les-objets.html</link>").unwrap();
    let cdata = feed.find("<link>https://example.github.io/balises.html</link>").unwrap();
    let python = feed.find("<link>https://example.github.io/les-generateurs.html</link>").unwrap();
    assert!(git < cdata && cdata < python, "feed should list newest first");

    assert!(feed.contains("a]]]]><![CDATA[>b"));
    assert!(feed.contains("<![CDATA[Des fonctions qui se mettent en pause]]>"));
    assert!(feed.contains("<category>Python</category>"));
}

#[test]
fn test_feed_limit() {
    let dir = setup_with("feed_max_items: 1\n");
    let site = Site::new(dir.path()).unwrap();
    site.build().unwrap();

    let feed = fs::read_to_string(site.output_dir.join("feeds/all.rss.xml")).unwrap();
    assert_eq!(feed.matches("<item>").count(), 1);
    assert!(feed.contains("git-les-objets.html"));
    assert!(!feed.contains("les-generateurs.html"));
}

#[test]
fn test_feed_disabled() {
    let dir = setup_with("feed_all_rss: ~\n");
    let site = Site::new(dir.path()).unwrap();
    let report = site.build().unwrap();
    assert!(report.is_success());

    assert!(!site.output_dir.join("feeds").exists());
    let index = fs::read_to_string(site.output_dir.join("index.html")).unwrap();
    assert!(!index.contains("application/rss+xml"));
}
