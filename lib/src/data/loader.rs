use std::{
  collections::HashMap,
  fs::File,
  io::BufReader,
  path::{Path, PathBuf},
  sync::{Arc, Mutex, OnceLock, PoisonError},
};

use tracing::{debug, info, instrument};

use super::RawTable;
use crate::error::{DataError, Result};

/// Process-lifetime cache of loaded files, keyed by the path as given.
/// Entries are never invalidated.
static LOADED: OnceLock<Mutex<HashMap<PathBuf, Arc<RawTable>>>> = OnceLock::new();

/// Loads a csv file, reading it from disk only the first time a path is seen.
#[instrument]
pub fn load_data(path: &Path) -> Result<Arc<RawTable>> {
  let cache = LOADED.get_or_init(Default::default);
  if let Some(table) = cache
    .lock()
    .unwrap_or_else(PoisonError::into_inner)
    .get(path)
  {
    debug!("cache hit");
    return Ok(Arc::clone(table));
  }

  let table = Arc::new(read_csv(path)?);
  info!(
    rows = table.rows.len(),
    columns = table.headers.len(),
    "loaded dataset"
  );
  cache
    .lock()
    .unwrap_or_else(PoisonError::into_inner)
    .insert(path.to_path_buf(), Arc::clone(&table));
  Ok(table)
}

/// Reads a csv file without touching the cache.
pub fn read_csv(path: &Path) -> Result<RawTable> {
  let file = File::open(path).map_err(|source| DataError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  RawTable::from_reader(BufReader::new(file)).map_err(|source| DataError::Csv {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, sync::Arc};

  use super::load_data;
  use crate::error::DataError;

  fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("maize-loader-{}-{name}.csv", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn second_load_comes_from_cache() {
    let path = scratch_file("memo", "Price\n1\n2\n");
    let first = load_data(&path).unwrap();
    // the cache must not go back to disk
    std::fs::remove_file(&path).unwrap();
    let second = load_data(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.rows.len(), 2);
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("maize-loader-does-not-exist.csv");
    match load_data(&path) {
      Err(DataError::Io { path: p, .. }) => assert_eq!(p, path),
      other => panic!("expected io error, got {other:?}"),
    }
  }

  #[test]
  fn malformed_file_is_a_csv_error() {
    let path = scratch_file("malformed", "a,b\n1,2\n3\n");
    assert!(matches!(load_data(&path), Err(DataError::Csv { .. })));
  }
}
