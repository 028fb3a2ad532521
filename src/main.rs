//! CLI entry point for pelite

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pelite")]
#[command(version)]
#[command(about = "Render Markdown articles with metadata headers into a static site", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every article into the output directory
    #[command(alias = "b")]
    Build {
        /// Fail articles whose {filename} references cannot be resolved
        #[arg(long)]
        strict: bool,

        /// Override the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove the output directory
    Clean,

    /// List site content
    List {
        /// Type of content to list (article, tag, category)
        #[arg(default_value = "article")]
        r#type: String,
    },

    /// Create a new article
    New {
        /// Title of the new article
        title: String,

        /// Category, also used as the sub-directory
        #[arg(short, long)]
        category: Option<String>,

        /// Comma separated tags
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "pelite=debug,info"
    } else {
        "pelite=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Build { strict, output } => {
            let mut site = pelite::Site::new(&base_dir)?;
            if let Some(output) = output {
                site.output_dir = if output.is_absolute() {
                    output
                } else {
                    base_dir.join(output)
                };
            }

            tracing::info!("Building {:?} into {:?}", site.content_dir, site.output_dir);
            let strict = strict || site.config.strict_assets;
            let report = pelite::commands::build::run_with_options(&site, strict)?;
            println!("{}", report.summary());

            if !report.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Clean => {
            let site = pelite::Site::new(&base_dir)?;
            tracing::info!("Cleaning output folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let site = pelite::Site::new(&base_dir)?;
            pelite::commands::list::run(&site, &r#type)?;
        }

        Commands::New {
            title,
            category,
            tags,
        } => {
            let site = pelite::Site::new(&base_dir)?;
            let tags: Vec<String> = tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            let path =
                pelite::commands::new::create_article(&site, &title, category.as_deref(), &tags)?;
            println!("Created: {}", path.display());
        }
    }

    Ok(())
}
