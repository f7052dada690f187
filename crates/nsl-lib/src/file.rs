use crate::error::StageError;
use std::borrow::Cow;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

pub const REQUIRED_SUFFIX: &str = ".arff";

pub const MISSING_FILE_MESSAGE: &str = "Select an ARFF file";
pub const WRONG_EXTENSION_MESSAGE: &str = "Please select a .arff file";

#[derive(Debug, Clone)]
enum Source {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// The dataset chosen by the user. Contents are read when a request is sent.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    source: Source,
}

impl SelectedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            source: Source::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: Source::Memory(bytes.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, if it can be determined without reading the file.
    pub fn size_hint(&self) -> Option<u64> {
        match &self.source {
            Source::Path(path) => std::fs::metadata(path).ok().map(|m| m.len()),
            Source::Memory(bytes) => Some(bytes.len() as u64),
        }
    }

    /// Size in kilobytes with two decimals, e.g. `"2.50 KB"`.
    pub fn size_label(&self) -> Option<String> {
        self.size_hint()
            .map(|bytes| format!("{:.2} KB", bytes as f64 / 1024.0))
    }

    pub fn contents(&self) -> io::Result<Cow<'_, [u8]>> {
        match &self.source {
            Source::Path(path) => std::fs::read(path).map(Cow::Owned),
            Source::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// Extension check applied on selection. Case-sensitive exact suffix.
pub fn validate_candidate(candidate: Option<&SelectedFile>) -> Result<&SelectedFile, StageError> {
    let file =
        candidate.ok_or_else(|| StageError::Validation(MISSING_FILE_MESSAGE.to_string()))?;
    if !file.name().ends_with(REQUIRED_SUFFIX) {
        return Err(StageError::Validation(WRONG_EXTENSION_MESSAGE.to_string()));
    }
    Ok(file)
}
