use crate::error::StageError;
use crate::client::SERVER_ERROR_FALLBACK;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Dataset partition produced by the split stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Val,
    Test,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Val, Partition::Test];

    pub fn key(self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Val => "val",
            Partition::Test => "test",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Partition::Train => "Train",
            Partition::Val => "Validation",
            Partition::Test => "Test",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.arff", self.key())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Partition::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| format!("unknown partition '{s}' (expected train, val or test)"))
    }
}

pub fn download_url(base_url: &str, partition: Partition) -> String {
    format!(
        "{}/api/download/{}/",
        base_url.trim_end_matches('/'),
        partition.key()
    )
}

/// Fetch a partition with a plain GET and stream it into `out`. Returns bytes written.
pub fn download_partition(
    base_url: &str,
    partition: Partition,
    out: &mut impl Write,
) -> Result<u64, StageError> {
    let url = download_url(base_url, partition);
    log::debug!("GET {url}");
    match ureq::get(&url).call() {
        Ok(response) => io::copy(&mut response.into_reader(), out)
            .map_err(|err| StageError::Network(format!("Download interrupted: {err}"))),
        Err(ureq::Error::Status(404, _)) => Err(StageError::Server(format!(
            "{} not found; run the split stage first",
            partition.file_name()
        ))),
        Err(ureq::Error::Status(code, _)) => {
            log::warn!("download of {partition} failed with HTTP {code}");
            Err(StageError::Server(SERVER_ERROR_FALLBACK.to_string()))
        }
        Err(ureq::Error::Transport(err)) => Err(StageError::Network(err.to_string())),
    }
}
