use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::config::ResolvedSettings;
use crate::domain::FileDescriptor;
use crate::error::MafError;
use crate::resolver::FileQuery;

static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="?([^";]+)"?"#).unwrap());

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: SearchData,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    hits: Vec<FileDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Status(u16),
}

pub trait GdcClient: Send + Sync {
    fn search_files(&self, query: &FileQuery) -> Result<Vec<FileDescriptor>, MafError>;
    fn download(&self, file_id: &str, scratch_dir: &Path) -> Result<DownloadOutcome, MafError>;
}

impl<T: GdcClient + ?Sized> GdcClient for &T {
    fn search_files(&self, query: &FileQuery) -> Result<Vec<FileDescriptor>, MafError> {
        (**self).search_files(query)
    }

    fn download(&self, file_id: &str, scratch_dir: &Path) -> Result<DownloadOutcome, MafError> {
        (**self).download(file_id, scratch_dir)
    }
}

#[derive(Clone)]
pub struct GdcHttpClient {
    client: Client,
    base_url: String,
}

impl GdcHttpClient {
    pub fn new(settings: &ResolvedSettings) -> Result<Self, MafError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gdc-maf-cat/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MafError::TransferError(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| MafError::TransferError(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.api_base_url.clone(),
        })
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.base_url)
    }

    fn data_url(&self, file_id: &str) -> String {
        format!("{}/data/{}", self.base_url, file_id)
    }
}

impl GdcClient for GdcHttpClient {
    fn search_files(&self, query: &FileQuery) -> Result<Vec<FileDescriptor>, MafError> {
        let params = query.params();
        let response = self
            .client
            .get(self.files_url())
            .query(&params)
            .send()
            .map_err(|err| MafError::TransferError(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GDC files query failed".to_string());
            return Err(MafError::TransferStatus { status, message });
        }
        let body: SearchResponse = response
            .json()
            .map_err(|err| MafError::TransferError(err.to_string()))?;
        Ok(body.data.hits)
    }

    fn download(&self, file_id: &str, scratch_dir: &Path) -> Result<DownloadOutcome, MafError> {
        let mut response = self
            .client
            .get(self.data_url(file_id))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .map_err(|err| MafError::TransferError(err.to_string()))?;
        if !response.status().is_success() {
            return Ok(DownloadOutcome::Status(response.status().as_u16()));
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_file_name)
            .ok_or_else(|| MafError::MissingContentDisposition(file_id.to_string()))?;

        let mut part = tempfile::Builder::new()
            .prefix(".part-")
            .tempfile_in(scratch_dir)
            .map_err(|err| MafError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, part.as_file_mut())
            .map_err(|err| MafError::TransferError(err.to_string()))?;
        let destination = scratch_dir.join(&file_name);
        part.persist(&destination)
            .map_err(|err| MafError::Filesystem(err.error.to_string()))?;
        Ok(DownloadOutcome::Saved(destination))
    }
}

pub fn attachment_file_name(header: &str) -> Option<String> {
    let name = FILENAME_RE
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim().to_string())?;
    let is_plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\');
    is_plain.then_some(name)
}
