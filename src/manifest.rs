use std::collections::HashSet;
use std::fs;

use camino::Utf8Path;

use crate::error::MafError;

pub fn read_manifest(path: &Utf8Path) -> Result<Vec<String>, MafError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| MafError::Filesystem(format!("read manifest {path}: {err}")))?;
    parse_manifest(&content)
}

pub fn parse_manifest(content: &str) -> Result<Vec<String>, MafError> {
    let mut lines = content.lines();
    let header = lines
        .next()
        .ok_or_else(|| MafError::InvalidManifest("manifest is empty".to_string()))?;
    let first = header.split('\t').next().unwrap_or_default();
    if first != "id" {
        return Err(MafError::InvalidManifest(format!(
            "first header column is {first:?}, expected \"id\""
        )));
    }

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let id = line.split('\t').next().unwrap_or_default().trim();
        if id.is_empty() {
            continue;
        }
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}
