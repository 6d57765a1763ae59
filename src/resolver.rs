use std::collections::HashSet;

use serde_json::{Value, json};

use crate::domain::{FileDescriptor, Selection};
use crate::error::MafError;
use crate::gdc::GdcClient;
use crate::manifest;

pub const DATA_FORMAT: &str = "MAF";
pub const DATA_TYPE: &str = "Masked Somatic Mutation";
pub const REQUESTED_FIELDS: &str = "file_id,md5sum,file_name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFilter {
    Projects(Vec<String>),
    FileIds(Vec<String>),
}

impl FileFilter {
    fn field(&self) -> &'static str {
        match self {
            FileFilter::Projects(_) => "cases.project.project_id",
            FileFilter::FileIds(_) => "files.file_id",
        }
    }

    fn values(&self) -> &[String] {
        match self {
            FileFilter::Projects(values) | FileFilter::FileIds(values) => values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub filter: FileFilter,
    pub page_size: usize,
}

impl FileQuery {
    pub fn new(filter: FileFilter, page_size: usize) -> Self {
        Self { filter, page_size }
    }

    pub fn filters(&self) -> Value {
        let clauses = [
            ("files.data_format", vec![DATA_FORMAT.to_string()]),
            ("files.data_type", vec![DATA_TYPE.to_string()]),
            (self.filter.field(), self.filter.values().to_vec()),
        ];
        let content = clauses
            .into_iter()
            .map(|(field, value)| {
                json!({
                    "op": "in",
                    "content": {"field": field, "value": value},
                })
            })
            .collect::<Vec<_>>();
        json!({"op": "and", "content": content})
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("filters", self.filters().to_string()),
            ("fields", REQUESTED_FIELDS.to_string()),
            ("format", "JSON".to_string()),
            ("size", self.page_size.to_string()),
        ]
    }
}

pub fn query_for(selection: &Selection, page_size: usize) -> Result<FileQuery, MafError> {
    let filter = match selection {
        Selection::Manifest(path) => FileFilter::FileIds(manifest::read_manifest(path)?),
        Selection::Projects(ids) => FileFilter::Projects(ids.as_slice().to_vec()),
    };
    Ok(FileQuery::new(filter, page_size))
}

pub fn resolve<C: GdcClient>(
    client: &C,
    selection: &Selection,
    page_size: usize,
) -> Result<Vec<FileDescriptor>, MafError> {
    let query = query_for(selection, page_size)?;
    tracing::info!(
        selection = selection.kind(),
        values = query.filter.values().len(),
        "querying GDC files endpoint"
    );
    let hits = client.search_files(&query)?;
    let descriptors = dedupe_by_file_id(hits);
    if descriptors.is_empty() {
        return Err(MafError::EmptyResult);
    }
    tracing::info!(files = descriptors.len(), "resolved file descriptors");
    Ok(descriptors)
}

fn dedupe_by_file_id(hits: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| {
            let fresh = seen.insert(hit.file_id.clone());
            if !fresh {
                tracing::debug!(file_id = %hit.file_id, "dropping repeated hit");
            }
            fresh
        })
        .collect()
}
