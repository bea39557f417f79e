//! diffpdf CLI - visual PDF revision comparison

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use diffpdf::{
    compare_files, resolve_layout, DiffOptions, DiffOutput, DocumentReader, JsonFormat,
    PageContent, PdfReader, ProgressEvent, SourceDocument, DEFAULT_OUTPUT_NAME,
};

#[derive(Parser)]
#[command(name = "diffpdf")]
#[command(version)]
#[command(about = "Highlight the differences between two revisions of a PDF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two PDF revisions and write a combined, highlighted PDF
    #[command(alias = "diff")]
    Compare {
        /// Old revision
        #[arg(value_name = "OLD")]
        old: PathBuf,

        /// New revision
        #[arg(value_name = "NEW")]
        new: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT_NAME)]
        output: PathBuf,

        /// Layout: "side-by-side" or "single"
        #[arg(long, env = "DIFFPDF_VIEW", value_name = "MODE")]
        view: Option<String>,

        /// Write a JSON change report
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Worker threads (0 = all cores)
        #[arg(long, env = "DIFFPDF_THREADS", default_value = "0")]
        threads: usize,

        /// Process pages one at a time
        #[arg(long)]
        sequential: bool,

        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Print the tokens and images extracted from a PDF as JSON
    Inspect {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Only this page (1-based)
        #[arg(long)]
        page: Option<usize>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compare {
            old,
            new,
            output,
            view,
            report,
            threads,
            sequential,
            timeout,
        } => cmd_compare(
            &old,
            &new,
            &output,
            view.as_deref(),
            report.as_deref(),
            threads,
            sequential,
            timeout,
        ),
        Commands::Inspect {
            input,
            page,
            compact,
        } => cmd_inspect(&input, page, compact),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        log::debug!("{:?}", e);
        eprintln!("{}: {}", "Error".red().bold(), error_message(e.as_ref()));
        std::process::exit(1);
    }
}

/// Text shown for a failed command. Comparison errors go through
/// [`diffpdf::Error::public_message`]; file errors name the local problem.
fn error_message(e: &(dyn std::error::Error + 'static)) -> String {
    match e.downcast_ref::<diffpdf::Error>() {
        Some(diffpdf::Error::Io(io)) => io.to_string(),
        Some(err) => err.public_message(),
        None => e.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_compare(
    old: &Path,
    new: &Path,
    output: &Path,
    view: Option<&str>,
    report: Option<&Path>,
    threads: usize,
    sequential: bool,
    timeout: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = crossbeam_channel::unbounded();

    let mut options = DiffOptions::new()
        .with_layout(resolve_layout(view)?)
        .with_threads(threads)
        .with_parallel(!sequential)
        .with_progress(tx);
    if let Some(secs) = timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    let layout = options.layout;
    log::debug!("comparing {} with {} ({} layout)", old.display(), new.display(), layout);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let result: diffpdf::Result<DiffOutput> = std::thread::scope(|scope| {
        let worker = scope.spawn(move || compare_files(old, new, &options));

        // ends when the worker drops the options and with them the sender
        for event in rx {
            match event {
                ProgressEvent::Started { pages } => {
                    pb.set_length(pages as u64);
                    pb.set_message("Comparing pages...");
                }
                ProgressEvent::PageDone { .. } => pb.inc(1),
                ProgressEvent::Rendering => pb.set_message("Writing PDF..."),
                ProgressEvent::Finished => pb.set_message("Done"),
            }
        }

        worker
            .join()
            .unwrap_or_else(|_| Err(diffpdf::Error::Other("comparison thread panicked".to_string())))
    });
    pb.finish_and_clear();
    let result = result?;

    fs::write(output, &result.document)?;
    if let Some(path) = report {
        fs::write(path, result.report.to_json(JsonFormat::Pretty)?)?;
    }

    let totals = &result.report.totals;
    println!("{}", "Comparison".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Layout".bold(), layout);
    println!(
        "{}: {} → {}",
        "Pages".bold(),
        result.report.old_pages,
        result.report.new_pages
    );
    if result.report.is_identical() {
        println!("{}", "No differences found".green());
    } else {
        println!("{}: {}", "Changed pages".bold(), totals.changed_pages.to_string().yellow());
        println!(
            "{}: {} inserted, {} deleted, {} replaced",
            "Words".bold(),
            totals.inserted_tokens.to_string().green(),
            totals.deleted_tokens.to_string().red(),
            totals.replaced_tokens.to_string().yellow()
        );
        println!(
            "{}: {} added, {} removed",
            "Images".bold(),
            totals.added_assets.to_string().green(),
            totals.removed_assets.to_string().red()
        );
        if totals.added_pages > 0 {
            println!("{}: {}", "Added pages".bold(), totals.added_pages.to_string().blue());
        }
    }
    if totals.degraded_pages > 0 {
        println!(
            "{} {} pages could not be fully read",
            "Warning:".yellow().bold(),
            totals.degraded_pages
        );
    }

    println!();
    println!("{} {}", "Saved to".green(), output.display());
    if let Some(path) = report {
        println!("{} {}", "Report saved to".green(), path.display());
    }

    Ok(())
}

fn cmd_inspect(input: &Path, page: Option<usize>, compact: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let doc = PdfReader.load(&data)?;

    let indices: Vec<usize> = match page {
        Some(0) => return Err("page numbers start at 1".into()),
        Some(n) if n > doc.page_count() => {
            return Err(diffpdf::Error::PageOutOfRange(n, doc.page_count()).into())
        }
        Some(n) => vec![n - 1],
        None => (0..doc.page_count()).collect(),
    };

    let mut pages = Vec::with_capacity(indices.len());
    for index in indices {
        let size = doc.page_rect(index)?;
        let content = PageContent::extract(&doc, index);
        pages.push(serde_json::json!({
            "page": index + 1,
            "width": size.width,
            "height": size.height,
            "degraded": content.degraded,
            "tokens": content.tokens,
            "assets": content.assets,
        }));
    }

    let json = if compact {
        serde_json::to_string(&pages)?
    } else {
        serde_json::to_string_pretty(&pages)?
    };
    println!("{}", json);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "diffpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Visual PDF revision comparison");
}
