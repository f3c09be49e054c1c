//! Résumé redaction CLI.
//!
//! Thin front end over [`resume_redactor::RedactionService`]: redact a
//! document, dry-run analyze it, or dump its text projection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use resume_redactor::{RedactionConfig, RedactionReport, RedactionService};

/// Exit status when the output was written but needs a manual check.
const EXIT_REVIEW: u8 = 2;

/// Résumé PII Redaction Tool
///
/// Removes phone numbers, email addresses and national ID numbers from
/// PDF and DOCX résumés.
#[derive(Parser)]
#[command(name = "resume-redactor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output and debug logs
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Redact a PDF or DOCX document
    Redact {
        /// Input document
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output document
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Skip OCR for scanned documents and blank the baseline regions
        #[arg(long)]
        no_ocr: bool,

        /// OCR time budget in seconds
        #[arg(long, value_name = "SECS", env = "REDACTOR_OCR_TIMEOUT_SECS")]
        ocr_timeout: Option<u64>,
    },

    /// Show what would be redacted, page by page, without writing anything
    Analyze {
        /// Input document
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Print the analysis as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Extract the text projection used for matching (for debugging and verification)
    Extract {
        /// Input document
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output text file (optional, defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Command handler holding the configured service.
struct RedactionHandler {
    service: RedactionService,
    verbose: bool,
}

impl RedactionHandler {
    fn new(config: RedactionConfig, verbose: bool) -> Result<Self> {
        let service = RedactionService::new(config).context("Invalid configuration")?;
        Ok(Self { service, verbose })
    }

    /// Redacts and returns whether the output needs review.
    fn redact(&self, input: &Path, output: &Path, json: bool) -> Result<bool> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }

        if self.verbose {
            eprintln!("Input:  {}", input.display());
            eprintln!("Output: {}", output.display());
        }

        let report = self
            .service
            .redact(input, output)
            .with_context(|| format!("Redaction failed for {}", input.display()))?;

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_summary(&report, output, self.verbose);
        }
        Ok(report.requires_review())
    }

    fn analyze(&self, input: &Path, json: bool) -> Result<()> {
        let analysis = self
            .service
            .analyze(input)
            .with_context(|| format!("Analysis failed for {}", input.display()))?;

        if json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            return Ok(());
        }

        println!(
            "Format: {}{}",
            analysis.format,
            if analysis.image_based { " (image based)" } else { "" }
        );
        for page in &analysis.pages {
            println!(
                "Page {}: {} chars, {} image(s), {} match(es)",
                page.page,
                page.text_chars,
                page.images,
                page.matches.len()
            );
            for m in &page.matches {
                println!(
                    "  {:<12} x{} {}",
                    m.kind.as_str(),
                    m.occurrences,
                    if m.is_located() { "located" } else { "NOT LOCATED" }
                );
            }
        }
        Ok(())
    }

    fn extract(&self, input: &Path, output: Option<&Path>) -> Result<()> {
        let text = self
            .service
            .extract_text(input)
            .with_context(|| "Text extraction failed")?;

        if let Some(output_path) = output {
            std::fs::write(output_path, &text)
                .with_context(|| format!("Failed to write to {}", output_path.display()))?;
            println!(
                "✓ Extracted {} characters → {}",
                text.chars().count(),
                output_path.display()
            );
        } else {
            println!("{}", text);
        }
        Ok(())
    }
}

fn print_summary(report: &RedactionReport, output: &Path, verbose: bool) {
    if verbose {
        println!("Redaction Summary:");
        println!("  Format:          {}", report.format);
        println!("  Strategy:        {}", report.strategy);
        println!("  Pages processed: {}", report.pages_processed);
        println!("  Pages modified:  {}", report.pages_modified);
        println!(
            "  Found:           {} phone, {} email, {} national id",
            report.found.phone, report.found.email, report.found.national_id
        );
        println!("  Regions removed: {}", report.regions_redacted);
        println!("  Output size:     {} bytes", report.output_bytes);
        if let Some(r) = &report.recompression {
            println!(
                "  Recompression:   {} → {} bytes ({} image(s))",
                r.bytes_before, r.bytes_after, r.images_reencoded
            );
        }
    }

    if report.total_redacted() > 0 || report.regions_redacted > 0 {
        println!(
            "✓ Redacted {} match(es) → {}",
            report.total_redacted(),
            output.display()
        );
    } else {
        println!("⚠ No PII found, output is a copy of the input → {}", output.display());
    }

    for warning in &report.warnings {
        eprintln!("⚠ {}", warning);
    }
}

fn init_logging(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = RedactionConfig::from_env().context("Invalid REDACTOR_* environment")?;
    let verbose = cli.verbose > 0;

    match cli.command {
        Commands::Redact {
            input,
            output,
            json,
            no_ocr,
            ocr_timeout,
        } => {
            if no_ocr {
                config = config.without_ocr();
            }
            if let Some(secs) = ocr_timeout {
                config = config.with_ocr_timeout(Duration::from_secs(secs));
            }
            let handler = RedactionHandler::new(config, verbose)?;
            if handler.redact(&input, &output, json)? {
                return Ok(ExitCode::from(EXIT_REVIEW));
            }
        }
        Commands::Analyze { input, json } => {
            RedactionHandler::new(config, verbose)?.analyze(&input, json)?;
        }
        Commands::Extract { input, output } => {
            RedactionHandler::new(config, verbose)?.extract(&input, output.as_deref())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}
