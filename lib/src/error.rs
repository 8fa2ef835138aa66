use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading or shaping the price dataset.
#[derive(Debug, Error)]
pub enum DataError {
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("malformed csv in {}: {source}", path.display())]
  Csv {
    path: PathBuf,
    #[source]
    source: csv::Error,
  },
  #[error("column `{0}` is missing from the dataset")]
  MissingColumn(String),
  #[error("no usable rows left after cleaning")]
  Empty,
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
