//! Catalog Repricing CLI Application.
//!
//! This binary provides a command-line interface for the repricer library:
//! re-marking a catalog, generating page thumbnails and dumping text.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use repricer::{CatalogPlan, CatalogService};

/// PDF Catalog Repricer
///
/// Adds a markup to every price printed in a PDF catalog and optionally
/// brands it with a logo, a cover page and an intro page.
/// By default, processes a catalog. Use subcommands for other tasks.
#[derive(Parser)]
#[command(name = "repricer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source catalog PDF
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output catalog PDF
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Amount added to every price (may be negative)
    #[arg(short, long, value_name = "AMOUNT", allow_negative_numbers = true)]
    markup: Option<f64>,

    /// Brand image stamped on product pictures
    #[arg(short, long, value_name = "IMAGE")]
    logo: Option<PathBuf>,

    /// Zero-based page indices to leave out (comma separated)
    #[arg(short, long, value_name = "PAGES", value_delimiter = ',')]
    exclude: Vec<usize>,

    /// Prepend a cover page with the logo
    #[arg(long)]
    cover: bool,

    /// Prepend an intro page with title and date
    #[arg(long)]
    intro: bool,

    /// Title printed on the intro page
    #[arg(short, long, value_name = "TITLE")]
    title: Option<String>,

    /// TOML plan file; flags override its values
    #[arg(long, value_name = "FILE")]
    plan: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from a PDF (for debugging and verification)
    Extract {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output text file (optional, defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Render low-resolution page previews
    Thumbnails {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Directory for the images (defaults to the system temp directory)
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

/// Command handler around the catalog service.
struct CatalogHandler {
    service: CatalogService,
    verbose: bool,
}

impl CatalogHandler {
    fn new(verbose: bool) -> Self {
        Self {
            service: CatalogService::new(),
            verbose,
        }
    }

    /// Processes a catalog.
    fn process(&self, input: &Path, output: &Path, plan: &CatalogPlan) -> Result<()> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }

        if self.verbose {
            println!("Input:  {}", input.display());
            println!("Output: {}", output.display());
            println!("Markup: {:.2}", plan.price_markup);
            if !plan.pages_to_exclude.is_empty() {
                println!("Excluded pages: {:?}", plan.pages_to_exclude);
            }
        }

        let mut last = -1i32;
        let report = self
            .service
            .process_catalog(input, output, plan, |fraction| {
                let percent = (fraction * 100.0).round() as i32;
                if percent != last {
                    last = percent;
                    eprintln!("Progress: {}%", percent);
                }
            })
            .with_context(|| "Catalog processing failed")?;

        if self.verbose {
            println!("\nCatalog Summary:");
            println!("  Prices updated: {}", report.prices_updated);
            println!("  Logos inserted: {}", report.logos_inserted);
            println!("  Pages written:  {}", report.pages_written);
            println!("  Pages excluded: {}", report.pages_excluded);
        }

        println!("✓ {} → {}", report, output.display());
        Ok(())
    }

    /// Extracts text from a PDF.
    fn extract(&self, input: &Path, output: Option<&Path>) -> Result<()> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }

        let text = self
            .service
            .extract_text(input)
            .with_context(|| "Text extraction failed")?;

        if let Some(output_path) = output {
            std::fs::write(output_path, &text)
                .with_context(|| format!("Failed to write to {}", output_path.display()))?;
            println!(
                "✓ Extracted {} characters → {}",
                text.len(),
                output_path.display()
            );
        } else {
            println!("{}", text);
        }

        Ok(())
    }

    /// Writes page thumbnails and prints their paths.
    fn thumbnails(&self, input: &Path, dir: Option<&Path>) -> Result<()> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }

        let thumbs = match dir {
            Some(dir) => self.service.generate_thumbnails_in(input, dir),
            None => self.service.generate_thumbnails(input),
        }
        .with_context(|| "Thumbnail generation failed")?;

        for thumb in &thumbs {
            println!("{}", thumb.display());
        }
        if self.verbose {
            eprintln!("✓ {} thumbnail(s)", thumbs.len());
        }
        Ok(())
    }
}

/// Builds the run plan from an optional plan file and the CLI flags.
fn build_plan(cli: &Cli) -> Result<CatalogPlan> {
    let mut plan = match &cli.plan {
        Some(path) => CatalogPlan::load(path)
            .with_context(|| format!("Failed to load plan {}", path.display()))?,
        None => CatalogPlan::default(),
    };

    if let Some(markup) = cli.markup {
        plan.price_markup = markup;
    }
    if let Some(logo) = &cli.logo {
        plan.logo_image = Some(logo.clone());
    }
    plan.pages_to_exclude.extend(cli.exclude.iter().copied());
    plan.add_cover_page |= cli.cover;
    plan.add_intro_page |= cli.intro;
    if let Some(title) = &cli.title {
        plan.catalog_title = title.clone();
    }

    Ok(plan)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "repricer=debug" } else { "repricer=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let handler = CatalogHandler::new(cli.verbose);

    match &cli.command {
        Some(Commands::Extract { input, output }) => {
            handler.extract(input, output.as_deref())?;
        }
        Some(Commands::Thumbnails { input, dir }) => {
            handler.thumbnails(input, dir.as_deref())?;
        }
        None => {
            // Default: catalog processing
            let input = cli
                .input
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("--input is required"))?;
            let output = cli
                .output
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("--output is required"))?;

            let plan = build_plan(&cli)?;
            handler.process(input, output, &plan)?;
        }
    }

    Ok(())
}
