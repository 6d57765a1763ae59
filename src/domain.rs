use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::MafError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub file_id: String,
    pub md5sum: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIds(Vec<String>);

impl ProjectIds {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ProjectIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl FromStr for ProjectIds {
    type Err = MafError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let ids = value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if ids.is_empty() {
            return Err(MafError::MissingInput);
        }
        Ok(Self(ids))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Manifest(Utf8PathBuf),
    Projects(ProjectIds),
}

impl Selection {
    pub fn from_inputs(manifest: Option<&str>, project: Option<&str>) -> Result<Self, MafError> {
        match (manifest, project) {
            (Some(_), Some(_)) => Err(MafError::ConflictingInput),
            (None, None) => Err(MafError::MissingInput),
            (Some(path), None) => Ok(Selection::Manifest(Utf8PathBuf::from(path))),
            (None, Some(projects)) => Ok(Selection::Projects(projects.parse()?)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Selection::Manifest(_) => "manifest",
            Selection::Projects(_) => "project",
        }
    }
}
