//! Build the site

use anyhow::Result;

use crate::generator::{BuildReport, Generator};
use crate::Site;

/// Build the site with the configured strictness
pub fn run(site: &Site) -> Result<BuildReport> {
    run_with_options(site, site.config.strict_assets)
}

/// Build, failing documents with unresolvable references when `strict` is set
pub fn run_with_options(site: &Site, strict: bool) -> Result<BuildReport> {
    let start = std::time::Instant::now();

    let generator = Generator::new(site)?.strict(strict);
    let report = generator.generate()?;

    for failure in &report.failures {
        tracing::error!("{}", failure);
    }

    let duration = start.elapsed();
    tracing::info!("Built in {:.2}s", duration.as_secs_f64());

    Ok(report)
}
