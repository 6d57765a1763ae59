use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::{RunConfig, WriteMode};
use crate::domain::FileDescriptor;
use crate::error::MafError;
use crate::fs_util;
use crate::gdc::GdcClient;
use crate::header::{HeaderMap, MergedHeader, merge_headers, split_header};
use crate::metrics::{MetricsAccumulator, MetricsColumns, MetricsSummary};
use crate::resolver;
use crate::table::{MafTable, normalize_body};
use crate::transfer::{FetchedFile, ScratchDir, TransferManager};
use crate::writer;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub selection: String,
    pub files: Vec<FileReport>,
    pub scratch_dir: String,
    pub output: Option<String>,
    pub write_mode: Option<WriteMode>,
    pub header_keys: usize,
    pub metrics: MetricsSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_id: String,
    pub file_name: String,
    pub md5sum: String,
    pub path: String,
    pub attempts: usize,
}

impl From<&FetchedFile> for FileReport {
    fn from(value: &FetchedFile) -> Self {
        let FileDescriptor {
            file_id,
            md5sum,
            file_name,
        } = value.descriptor.clone();
        Self {
            file_id,
            file_name,
            md5sum,
            path: value.path.display().to_string(),
            attempts: value.attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub header: MergedHeader,
    pub table: MafTable,
    pub metrics: MetricsSummary,
}

pub struct App<C: GdcClient> {
    client: C,
}

impl<C: GdcClient> App<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn run(&self, config: &RunConfig, sink: &dyn ProgressSink) -> Result<RunReport, MafError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; selection={}", config.selection.kind()),
            elapsed: None,
        });
        let descriptors =
            resolver::resolve(&self.client, &config.selection, config.settings.page_size)?;

        let scratch = ScratchDir::for_today(&config.scratch_root);
        scratch.ensure()?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Fetch; files={} scratch={}",
                descriptors.len(),
                scratch.path()
            ),
            elapsed: None,
        });
        let start = Instant::now();
        let manager = TransferManager::new(
            &self.client,
            config.settings.retry,
            config.settings.workers,
        );
        let fetched = manager.fetch_all(&descriptors, scratch.path().as_std_path())?;
        sink.event(ProgressEvent {
            message: format!("phase=Verify; {} files downloaded and verified", fetched.len()),
            elapsed: Some(start.elapsed()),
        });

        let merged = merge_files(&fetched, &config.settings.metrics_columns, sink)?;

        let output = if config.metrics_only {
            sink.event(ProgressEvent {
                message: "phase=Write; skipped (metrics only)".to_string(),
                elapsed: None,
            });
            None
        } else {
            sink.event(ProgressEvent {
                message: format!("phase=Write; {}", config.output),
                elapsed: None,
            });
            writer::write_maf(
                &config.output,
                &merged.header,
                &merged.table,
                config.write_mode,
            )?;
            Some(config.output.to_string())
        };

        Ok(RunReport {
            selection: config.selection.kind().to_string(),
            files: fetched.iter().map(FileReport::from).collect(),
            scratch_dir: scratch.path().to_string(),
            write_mode: output.as_ref().map(|_| config.write_mode),
            output,
            header_keys: merged.header.keys().count(),
            metrics: merged.metrics,
        })
    }
}

pub fn merge_files(
    files: &[FetchedFile],
    columns: &MetricsColumns,
    sink: &dyn ProgressSink,
) -> Result<MergeOutput, MafError> {
    let mut headers: Vec<HeaderMap> = Vec::with_capacity(files.len());
    let mut table = MafTable::new();
    let mut metrics = MetricsAccumulator::new(columns.clone());

    for file in files {
        let source = file.descriptor.file_name.as_str();
        sink.event(ProgressEvent {
            message: format!("phase=Parse; {source}"),
            elapsed: None,
        });
        let lines = fs_util::read_maf_lines(&file.path)?;
        let (body, header) = split_header(lines, source)?;
        headers.push(header);

        let Some(parsed) = normalize_body(&body, source)? else {
            tracing::warn!(file = source, "file has no column header row");
            continue;
        };
        metrics.observe_file(&parsed.schema, &parsed.records);
        tracing::debug!(file = source, records = parsed.records.len(), "normalized file");
        table.append(source, parsed)?;
    }

    sink.event(ProgressEvent {
        message: format!("phase=Merge; {} records", table.len()),
        elapsed: None,
    });
    Ok(MergeOutput {
        header: merge_headers(&headers),
        table,
        metrics: metrics.summary(),
    })
}
