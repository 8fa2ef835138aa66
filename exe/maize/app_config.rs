use std::{fs::File, path::Path, path::PathBuf};

use serde::Deserialize;

/// Settings that may come from a YAML file or the command line.
/// Also defines the config file format (every field can be omitted).
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// Price dataset (CSV)
  pub data: Option<PathBuf>,
  /// Dashboard port
  pub port: Option<u16>,
  /// Seed for the split, initialization and shuffling
  pub seed: Option<u64>,
  /// `false` switches model training off even when compiled in
  pub training: Option<bool>,
  /// `false` switches the trend chart off even when compiled in
  pub charts: Option<bool>,
}

impl AppConfig {
  pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("cannot open config {}: {e}", path.display()))?;
    Ok(serde_yaml::from_reader(file)?)
  }

  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    Self {
      data: other.data.or(self.data),
      port: other.port.or(self.port),
      seed: other.seed.or(self.seed),
      training: other.training.or(self.training),
      charts: other.charts.or(self.charts),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::AppConfig;

  #[test]
  fn later_config_wins_field_by_field() {
    let file: AppConfig = serde_yaml::from_str("data: prices.csv\nport: 9000\ncharts: false\n").unwrap();
    let cli = AppConfig {
      port: Some(8000),
      ..AppConfig::default()
    };
    let merged = file.merge(cli);
    assert_eq!(merged.port, Some(8000));
    assert_eq!(merged.data.as_deref(), Some(std::path::Path::new("prices.csv")));
    assert_eq!(merged.charts, Some(false));
    assert_eq!(merged.seed, None);
  }

  #[test]
  fn rejects_unknown_keys() {
    assert!(serde_yaml::from_str::<AppConfig>("epochs: 3\n").is_err());
  }
}
