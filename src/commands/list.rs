//! List site content

use anyhow::Result;
use std::collections::BTreeMap;

use crate::content::loader::ContentLoader;
use crate::Site;

/// List site content by type
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    let loader = ContentLoader::new(site);
    let (documents, failures) = loader.load_all()?;

    match content_type {
        "article" | "articles" => {
            println!("Articles ({}):", documents.len());
            for doc in &documents {
                println!(
                    "  {} - {} [{}]{}",
                    doc.date.format("%Y-%m-%d"),
                    doc.title,
                    doc.source.display(),
                    match doc.status {
                        crate::content::Status::Published => "",
                        crate::content::Status::Draft => " (draft)",
                        crate::content::Status::Hidden => " (hidden)",
                    }
                );
            }
        }
        "tag" | "tags" => {
            let tags = count_by(documents.iter().flat_map(|d| d.tags.iter().cloned()));
            println!("Tags ({}):", tags.len());
            for (tag, count) in tags {
                println!("  {} ({})", tag, count);
            }
        }
        "category" | "categories" => {
            let categories = count_by(documents.iter().map(|d| {
                d.category
                    .clone()
                    .unwrap_or_else(|| site.config.default_category.clone())
            }));
            println!("Categories ({}):", categories.len());
            for (category, count) in categories {
                println!("  {} ({})", category, count);
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: article, tag, category",
                content_type
            );
        }
    }

    if !failures.is_empty() {
        println!("Failed to load ({}):", failures.len());
        for failure in &failures {
            println!("  {}", failure);
        }
    }

    Ok(())
}

/// Count occurrences, most frequent first
fn count_by(items: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
