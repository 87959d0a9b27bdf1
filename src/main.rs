use std::collections::HashMap;
use std::path::{Path, PathBuf};

use academic_early_warning::export::{export_headers, format_score, EXPORT_FILENAME};
use academic_early_warning::ingest::load_batch_from_path;
use academic_early_warning::report::{self, ReportOptions};
use academic_early_warning::{run_pipeline, FilteredView, PipelineConfig, Summary, TierSelection};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "academic-early-warning")]
#[command(about = "Academic risk scoring and alert tiers for student cohorts", long_about = None)]
struct Cli {
    /// TOML file with schema, scoring and tier settings
    #[arg(long, global = true, env = "EARLY_WARNING_CONFIG")]
    config: Option<PathBuf>,
    /// Field delimiter for input and export
    #[arg(long, global = true, default_value_t = ',')]
    delimiter: char,
    /// Column holding the failed-course count
    #[arg(long, global = true)]
    failed_field: Option<String>,
    /// Column holding the motivation level
    #[arg(long, global = true)]
    motivation_field: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and classify a batch, show the filtered view and optionally export it
    Classify {
        #[arg(long)]
        input: PathBuf,
        /// Tiers to keep: comma list of low,medium,high, or all / none
        #[arg(long, default_value = "all")]
        tiers: TierSelection,
        /// Write the filtered view as CSV (defaults to the standard file name)
        #[arg(long, num_args = 0..=1, default_missing_value = EXPORT_FILENAME)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Print the run summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Passthrough column to break the tier mix down by, e.g. career
        #[arg(long)]
        group_by: Option<String>,
        /// Passthrough column used to name students in the report
        #[arg(long)]
        label_field: Option<String>,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Classify several files concurrently, each as its own batch
    Batch {
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value = "all")]
        tiers: TierSelection,
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let delimiter = u8::try_from(cli.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter '{}' must be a single ASCII character", cli.delimiter))?;
    let config = PipelineConfig::load(cli.config.as_deref())?
        .with_overrides(cli.failed_field, cli.motivation_field)?;

    match cli.command {
        Commands::Classify {
            input,
            tiers,
            out,
            limit,
            json,
        } => {
            let batch = load_batch_from_path(&input, delimiter, &config.schema)
                .with_context(|| format!("failed to load {}", input.display()))?;
            let output = run_pipeline(&batch, &config)?;
            let view = output.view(&tiers);
            let summary = output.summary(&tiers, &view);

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
                print_view(&export_headers(&output.headers), &view, limit);
            }

            if let Some(out) = out {
                std::fs::write(&out, output.export(&view, delimiter)?)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                info!(rows = view.len(), path = %out.display(), "export written");
                if !json {
                    println!("Exported {} rows to {}.", view.len(), out.display());
                }
            }
        }
        Commands::Report {
            input,
            out,
            group_by,
            label_field,
            top,
        } => {
            let batch = load_batch_from_path(&input, delimiter, &config.schema)
                .with_context(|| format!("failed to load {}", input.display()))?;
            let output = run_pipeline(&batch, &config)?;
            let source = input.display().to_string();
            let options = ReportOptions {
                source: Some(source.as_str()),
                group_by: group_by.as_deref(),
                label_field: label_field.as_deref(),
                top,
            };
            let report = report::build_report(&output, &options, chrono::Utc::now())?;
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Batch {
            out_dir,
            tiers,
            inputs,
        } => {
            let total = inputs.len();
            let jobs = plan_exports(&out_dir, inputs)?;
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("failed to create {}", out_dir.display()))?;

            let mut tasks = JoinSet::new();
            for (input, out) in jobs {
                let config = config.clone();
                let tiers = tiers.clone();
                tasks.spawn_blocking(move || {
                    let result = process_file(&input, &out, &config, &tiers, delimiter);
                    (input, result)
                });
            }

            let mut failures = 0usize;
            while let Some(joined) = tasks.join_next().await {
                let (input, result) = joined.context("batch task panicked")?;
                match result {
                    Ok((out, summary)) => println!(
                        "{}: {} records (LOW {}, MEDIUM {}, HIGH {}), {} rows exported to {}",
                        input.display(),
                        summary.record_count,
                        summary.histogram.low,
                        summary.histogram.medium,
                        summary.histogram.high,
                        summary.view_rows,
                        out.display()
                    ),
                    Err(err) => {
                        failures += 1;
                        error!(input = %input.display(), "batch failed: {err:#}");
                    }
                }
            }

            if failures > 0 {
                bail!("{failures} of {total} batches failed");
            }
        }
    }

    Ok(())
}

/// Pairs every input with its export path, one file per input.
///
/// Two inputs sharing a file stem would write the same export, so the run is
/// refused before anything is written.
fn plan_exports(out_dir: &Path, inputs: Vec<PathBuf>) -> anyhow::Result<Vec<(PathBuf, PathBuf)>> {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut jobs = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.into_iter().enumerate() {
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("input{}", index + 1));
        let out = out_dir.join(format!("{stem}_{EXPORT_FILENAME}"));

        if let Some(previous) = claimed.insert(out.clone(), input.clone()) {
            bail!(
                "{} and {} would both export to {}; rename one of them",
                previous.display(),
                input.display(),
                out.display()
            );
        }
        jobs.push((input, out));
    }

    Ok(jobs)
}

fn process_file(
    input: &Path,
    out: &Path,
    config: &PipelineConfig,
    tiers: &TierSelection,
    delimiter: u8,
) -> anyhow::Result<(PathBuf, Summary)> {
    let batch = load_batch_from_path(input, delimiter, &config.schema)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let output = run_pipeline(&batch, config)?;
    let view = output.view(tiers);

    std::fs::write(out, output.export(&view, delimiter)?)
        .with_context(|| format!("failed to write {}", out.display()))?;

    Ok((out.to_path_buf(), output.summary(tiers, &view)))
}

fn print_summary(summary: &Summary) {
    println!("Batch {} ({} students)", summary.batch_id, summary.record_count);
    println!(
        "Cutoffs: MEDIUM above {:.2}, HIGH above {:.2}",
        summary.cutoffs.medium, summary.cutoffs.high
    );
    println!(
        "Tiers: LOW {} / MEDIUM {} / HIGH {}",
        summary.histogram.low, summary.histogram.medium, summary.histogram.high
    );
}

fn print_view(headers: &[String], view: &FilteredView, limit: usize) {
    let rows = match view {
        FilteredView::NothingSelected => {
            println!("No alert tiers selected; nothing to display.");
            return;
        }
        FilteredView::Rows(rows) if rows.is_empty() => {
            println!("No students in the selected tiers.");
            return;
        }
        FilteredView::Rows(rows) => rows,
    };

    println!("{}", headers.join(" | "));
    for record in rows.iter().take(limit) {
        let mut cells: Vec<String> = record.fields().to_vec();
        cells.push(format_score(record.risk_score()));
        cells.push(record.alert_tier.to_string());
        println!("{}", cells.join(" | "));
    }
    if rows.len() > limit {
        println!("... and {} more rows", rows.len() - limit);
    }
}
