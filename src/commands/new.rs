//! Create a new article

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::Site;

/// Scaffold an article with a metadata header, returning its path
pub fn create_article(
    site: &Site,
    title: &str,
    category: Option<&str>,
    tags: &[String],
) -> Result<PathBuf> {
    let tz = site.config.tz()?;
    let now = chrono::Utc::now().with_timezone(&tz);

    let slug = slug::slugify(title);
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a file name from title {:?}", title);
    }

    let target_dir = match category {
        Some(category) => site.content_dir.join(slug::slugify(category)),
        None => site.content_dir.clone(),
    };
    fs::create_dir_all(&target_dir)?;

    let file_path = target_dir.join(format!("{}.md", slug));

    // Check if file already exists
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let mut header = format!(
        "Title: {}\nDate: {}\n",
        title.trim(),
        now.format("%Y-%m-%d %H:%M")
    );
    if let Some(category) = category {
        header.push_str(&format!("Category: {}\n", category));
    }
    if !tags.is_empty() {
        header.push_str(&format!("Tags: {}\n", tags.join(", ")));
    }
    header.push_str("Status: draft\n\n");
    header.push_str("Write here.\n");

    fs::write(&file_path, header)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}
