//! Clean the output directory

use anyhow::Result;
use std::fs;

use crate::Site;

/// Remove the output directory
pub fn run(site: &Site) -> Result<()> {
    if site.output_dir == site.base_dir || site.content_dir.starts_with(&site.output_dir) {
        anyhow::bail!(
            "Refusing to delete {:?}: it contains the site sources",
            site.output_dir
        );
    }

    if site.output_dir.exists() {
        fs::remove_dir_all(&site.output_dir)?;
        tracing::info!("Deleted: {:?}", site.output_dir);
    }

    Ok(())
}
