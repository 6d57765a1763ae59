use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gdc_maf_cat::app::App;
use gdc_maf_cat::config::{ConfigLoader, DEFAULT_OUTPUT, RunConfig, WriteMode};
use gdc_maf_cat::domain::Selection;
use gdc_maf_cat::error::MafError;
use gdc_maf_cat::gdc::GdcHttpClient;
use gdc_maf_cat::output::{JsonOutput, LogSink, TextOutput};

#[derive(Parser)]
#[command(name = "gdc-maf-cat")]
#[command(about = "GDC MAF concatenation tool: fetch, verify and merge masked somatic mutation files")]
#[command(version)]
struct Cli {
    #[arg(short, long, value_name = "MANIFEST", help = "Select MAF files with a GDC manifest")]
    manifest: Option<String>,

    #[arg(
        short,
        long,
        value_name = "PROJECT_IDS",
        help = "Select MAF files by comma-separated project ids"
    )]
    project: Option<String>,

    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_OUTPUT)]
    output: Utf8PathBuf,

    #[arg(long, help = "Compute and report metrics without writing the output file")]
    metrics_only: bool,

    #[arg(long, help = "Truncate the output file instead of appending to it")]
    truncate: bool,

    #[arg(long, value_name = "DIR", default_value = ".")]
    scratch_dir: Utf8PathBuf,

    #[arg(long, value_name = "N", help = "Concurrent downloads (default 1)")]
    workers: Option<usize>,

    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<MafError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MafError) -> u8 {
    match error {
        MafError::InvalidManifest(_)
        | MafError::EmptyResult
        | MafError::ConflictingInput
        | MafError::MissingInput
        | MafError::ConfigRead(_)
        | MafError::ConfigParse(_) => 2,
        MafError::TransferError(_)
        | MafError::TransferStatus { .. }
        | MafError::MaxRetriesExceeded { .. }
        | MafError::MissingContentDisposition(_) => 3,
        MafError::ChecksumMismatch { .. }
        | MafError::MalformedHeader { .. }
        | MafError::SchemaMismatch { .. }
        | MafError::Decode { .. } => 4,
        MafError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let selection = Selection::from_inputs(cli.manifest.as_deref(), cli.project.as_deref())?;

    let mut settings = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        settings.workers = workers.max(1);
    }

    let config = RunConfig {
        selection,
        output: cli.output,
        metrics_only: cli.metrics_only,
        write_mode: if cli.truncate {
            WriteMode::Truncate
        } else {
            WriteMode::Append
        },
        scratch_root: cli.scratch_dir,
        settings,
    };

    let client = GdcHttpClient::new(&config.settings)?;
    let app = App::new(client);
    let report = app.run(&config, &LogSink)?;

    if cli.json {
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        TextOutput::print_report(&report).into_diagnostic()?;
    }
    Ok(())
}
