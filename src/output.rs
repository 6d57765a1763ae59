use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_report(&mut stdout, report)
    }

    pub fn write_report<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
        writeln!(out, "GDC MAF summary ({} selection)", report.selection)?;
        writeln!(out, "  files:     {}", report.metrics.files)?;
        writeln!(out, "  records:   {}", report.metrics.records)?;
        writeln!(out, "  genes:     {}", report.metrics.genes)?;
        writeln!(out, "  cases:     {}", report.metrics.cases)?;
        writeln!(out, "  mutations: {}", report.metrics.mutations)?;
        writeln!(out, "  scratch:   {}", report.scratch_dir)?;
        match &report.output {
            Some(path) => writeln!(out, "  output:    {path}")?,
            None => writeln!(out, "  output:    none (metrics only)")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSummary;

    #[test]
    fn text_report_mentions_metrics_only() {
        let report = RunReport {
            selection: "project".to_string(),
            files: Vec::new(),
            scratch_dir: "tmpMAF_2024-01-01".to_string(),
            output: None,
            write_mode: None,
            header_keys: 0,
            metrics: MetricsSummary {
                files: 2,
                records: 20,
                genes: 5,
                cases: 2,
                mutations: 7,
            },
        };
        let mut buf = Vec::new();
        TextOutput::write_report(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("genes:     5"));
        assert!(text.contains("none (metrics only)"));
    }
}
