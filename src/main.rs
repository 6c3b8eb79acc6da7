use anyhow::{anyhow, Context, Result};
use clap::Parser;

use auditmap::cli::{Cli, Commands};
use auditmap::config::{self, AnalysisMode, AuditConfig};
use auditmap::core::AnalysisReport;
use auditmap::errors::AuditError;
use auditmap::io::loader;
use auditmap::io::output::{create_writer, ReportFormat};
use auditmap::pipeline::AnalysisPipeline;
use auditmap::progress::{ProgressConfig, ProgressRenderer};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            headers,
            lines,
            mode,
            format,
            output,
            delimiter,
            config,
            seed,
            quiet,
            verbosity,
        } => {
            let config = resolve_config(config.as_deref(), mode.into(), seed)?;
            run_analyze(
                &headers,
                &lines,
                config,
                format.into(),
                output.as_deref(),
                delimiter,
                quiet,
                verbosity,
            )
        }
        Commands::Preview {
            headers,
            lines,
            delimiter,
        } => run_preview(&headers, &lines, delimiter),
    }
}

/// Join the extracts and report counts, without scoring anything.
fn run_preview(
    headers_path: &std::path::Path,
    lines_path: &std::path::Path,
    delimiter: char,
) -> Result<()> {
    let delimiter =
        u8::try_from(delimiter).map_err(|_| anyhow!("delimiter must be a single ASCII character"))?;

    let headers = loader::load_headers(headers_path, delimiter)?;
    let line_items = loader::load_line_items(lines_path, delimiter)?;
    let line_count = line_items.len();
    let joined = auditmap::pipeline::joiner::join_transactions(&headers, line_items);
    let matched = joined.iter().filter(|t| t.header.is_some()).count();

    println!(
        "{} headers, {} line items -> {} transactions ({} with header, {} without)",
        headers.len(),
        line_count,
        joined.len(),
        matched,
        joined.len() - matched
    );
    Ok(())
}

/// Layer configuration: file (explicit or discovered), then CLI overrides.
fn resolve_config(
    path: Option<&std::path::Path>,
    mode: AnalysisMode,
    seed: Option<u64>,
) -> Result<AuditConfig> {
    let mut config = match path {
        Some(path) => config::load_config_from(path).map_err(AuditError::config)?,
        None => config::load_config(),
    };
    config.mode = mode;
    if let Some(seed) = seed {
        config.detector.seed = seed;
    }
    Ok(config)
}

#[allow(clippy::too_many_arguments)]
fn run_analyze(
    headers_path: &std::path::Path,
    lines_path: &std::path::Path,
    config: AuditConfig,
    format: ReportFormat,
    output: Option<&std::path::Path>,
    delimiter: char,
    quiet: bool,
    verbosity: u8,
) -> Result<()> {
    let delimiter =
        u8::try_from(delimiter).map_err(|_| anyhow!("delimiter must be a single ASCII character"))?;

    // Validates mode and thresholds before anything is read or run
    let pipeline = AnalysisPipeline::new(config)?;
    let mode = pipeline.config().mode;

    let headers = loader::load_headers(headers_path, delimiter)?;
    let line_items = loader::load_line_items(lines_path, delimiter)?;
    log::info!(
        "analyzing {} headers and {} line items in {} mode",
        headers.len(),
        line_items.len(),
        mode
    );

    // The pipeline runs on a worker thread and reports stage progress over
    // a channel; rendering stays on this side.
    let progress_config = ProgressConfig::from_env(quiet, verbosity);
    let renderer = ProgressRenderer::new(&progress_config, pipeline.stage_count());

    let (sender, receiver) = crossbeam::channel::unbounded();
    let worker = std::thread::spawn(move || pipeline.run(headers, line_items, &sender));

    for event in receiver {
        renderer.handle(&event);
    }

    let scored = worker
        .join()
        .map_err(|_| anyhow!("analysis worker panicked"))??;

    let report = AnalysisReport::new(mode.as_str(), scored);
    write_report(&report, format, output)
}

fn write_report(
    report: &AnalysisReport,
    format: ReportFormat,
    output: Option<&std::path::Path>,
) -> Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            create_writer(format, file).write_report(report)?;
            log::info!("report written to {}", path.display());
        }
        None => {
            create_writer(format, std::io::stdout()).write_report(report)?;
        }
    }
    Ok(())
}
