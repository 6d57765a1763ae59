use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

use camino::Utf8Path;

use crate::config::WriteMode;
use crate::error::MafError;
use crate::fs_util;
use crate::header::MergedHeader;
use crate::table::MafTable;

pub fn write_maf(
    path: &Utf8Path,
    header: &MergedHeader,
    table: &MafTable,
    mode: WriteMode,
) -> Result<(), MafError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs_util::ensure_dir(parent.as_std_path())?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        WriteMode::Append => options.append(true),
        WriteMode::Truncate => options.write(true).truncate(true),
    };
    let file = options
        .open(path.as_std_path())
        .map_err(|err| MafError::Filesystem(format!("open {path}: {err}")))?;

    let mut out = BufWriter::new(file);
    write_lines(&mut out, header, table)
        .and_then(|_| out.flush())
        .map_err(|err| MafError::Filesystem(format!("write {path}: {err}")))?;
    tracing::info!(path = %path, records = table.len(), ?mode, "wrote merged MAF");
    Ok(())
}

fn write_lines<W: Write>(out: &mut W, header: &MergedHeader, table: &MafTable) -> std::io::Result<()> {
    for line in header.lines() {
        writeln!(out, "{line}")?;
    }
    if let Some(schema) = table.schema() {
        writeln!(out, "{}", schema.to_line())?;
    }
    for record in table.records() {
        writeln!(out, "{}", record.to_line())?;
    }
    Ok(())
}
