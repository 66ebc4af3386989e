// Agreement Fill - CLI
//
// `run` loads a matrix, applies the configured passes and writes the result.
// `review` does the same and opens the terminal review screen.
// `months` prints a slot label header for building input files.

use agreement_fill::{
    load_path, save_highlights_json, save_path, Month, Pipeline, PipelineConfig, RunReport, Step,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "agreement-fill",
    version,
    about = "Fill missing monthly agreement dates and flag rows for review"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill, mark and flag a matrix, then write it back out
    Run {
        /// Input file (.csv, or .xlsx with the `xlsx` feature)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file; extension picks the format
        #[arg(short, long)]
        output: PathBuf,

        /// Comma-separated passes, e.g. bridge,propagate,decide,complete,revisions
        #[arg(long)]
        steps: Option<String>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write highlighted cells as JSON here
        #[arg(long)]
        highlights: Option<PathBuf>,

        /// Write the run report as JSON here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Longest run still flagged for review
        #[arg(long)]
        max_run: Option<usize>,
    },

    /// Run the pipeline and browse the result in the terminal
    Review {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        steps: Option<String>,
    },

    /// Print the slot label header for a month range
    Months {
        /// First month, e.g. 2019-08
        #[arg(long)]
        start: Month,

        /// Last month, e.g. 2024-06
        #[arg(long)]
        end: Month,

        /// chrono format for each label
        #[arg(long)]
        date_format: Option<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            input,
            output,
            steps,
            config,
            highlights,
            report,
            max_run,
        } => {
            let config = build_config(config.as_deref(), steps.as_deref(), max_run)?;
            run_fill(&input, &output, config, highlights.as_deref(), report.as_deref())
        }
        Commands::Review {
            input,
            config,
            steps,
        } => {
            let config = build_config(config.as_deref(), steps.as_deref(), None)?;
            run_review(&input, config)
        }
        Commands::Months {
            start,
            end,
            date_format,
        } => print_months(start, end, date_format.as_deref()),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agreement_fill=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(path: Option<&Path>, steps: Option<&str>, max_run: Option<usize>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(list) = steps {
        config = config.with_steps(Step::parse_list(list).context("Invalid --steps")?);
    }
    if let Some(max_run) = max_run {
        config = config.with_max_run(max_run);
    }

    Ok(config)
}

fn run_fill(
    input: &Path,
    output: &Path,
    config: PipelineConfig,
    highlights_path: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    println!("🗓️  Agreement Fill");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load
    println!("\n📂 Loading {}...", input.display());
    let mut matrix = load_path(input, &config.layout)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    println!("✓ {} rows x {} monthly slots", matrix.rows(), matrix.width());

    // 2. Run passes
    let step_names: Vec<&str> = config.steps.iter().map(Step::name).collect();
    println!("\n🔧 Running passes: {}", step_names.join(" → "));
    let pipeline = Pipeline::new(config);
    let report = pipeline.run(&mut matrix);
    print_report(&report);

    // 3. Write
    println!("\n💾 Writing {}...", output.display());
    save_path(&matrix, &report.highlights, output, pipeline.config())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("✓ Output written");

    if let Some(path) = highlights_path {
        save_highlights_json(&matrix, &report.highlights, path, pipeline.config())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("✓ {} highlights written to {}", report.highlights.len(), path.display());
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("✓ Report written to {}", path.display());
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {}", report.summary());

    Ok(())
}

fn print_report(report: &RunReport) {
    for step in &report.steps {
        println!(
            "  • {:<10} filled {:>6} | marked {:>5} | highlighted {:>5}",
            step.step.name(),
            step.cells_filled,
            step.rows_marked,
            step.highlights.len()
        );
    }
}

fn print_months(start: Month, end: Month, date_format: Option<&str>) -> Result<()> {
    if end < start {
        bail!("--end {} is before --start {}", end, start);
    }

    let format = date_format.unwrap_or(agreement_fill::DEFAULT_DATE_FORMAT);
    let labels: Vec<String> = Month::range_inclusive(start, end)
        .iter()
        .map(|m| agreement_fill::format_date(m.first_day(), format))
        .collect();
    println!("{}", labels.join(","));

    Ok(())
}

#[cfg(feature = "tui")]
fn run_review(input: &Path, config: PipelineConfig) -> Result<()> {
    println!("🖥️  Loading {}...\n", input.display());

    let mut matrix = load_path(input, &config.layout)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let report = Pipeline::new(config).run(&mut matrix);

    println!("✓ {}", report.summary());
    println!("Starting review... (Press 'q' to quit)\n");

    let mut app = agreement_fill::ui::App::new(matrix, report);
    agreement_fill::ui::run_ui(&mut app)?;

    println!("\n✅ Review closed");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_review(_input: &Path, _config: PipelineConfig) -> Result<()> {
    eprintln!("❌ Review mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}
