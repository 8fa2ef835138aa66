use std::collections::{BTreeSet, HashMap};

use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{
  cleaner::{ANNUAL_RAINFALL, ANNUAL_TEMPERATURE, MONTH, PRICE, REGIONS, YEAR},
  CleanTable,
};
use crate::error::{DataError, Result};

/// Share of rows held out for testing.
pub const TEST_RATIO: f64 = 0.2;

/// Prefix of the one-hot region columns.
pub const REGION_PREFIX: &str = "Regions_";

/// Non-categorical predictors, in feature-vector order.
pub const BASE_FEATURES: [&str; 4] = [MONTH, YEAR, ANNUAL_RAINFALL, ANNUAL_TEMPERATURE];

/// One-hot encoding of `Regions` with the first sorted category as the implicit baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionEncoder {
  baseline: Option<String>,
  categories: Vec<String>,
}

impl RegionEncoder {
  pub fn fit<'a>(regions: impl IntoIterator<Item = Option<&'a str>>) -> Self {
    let mut sorted: Vec<String> = regions
      .into_iter()
      .flatten()
      .collect::<BTreeSet<_>>()
      .into_iter()
      .map(str::to_string)
      .collect();
    let baseline = (!sorted.is_empty()).then(|| sorted.remove(0));
    Self {
      baseline,
      categories: sorted,
    }
  }

  pub fn baseline(&self) -> Option<&str> {
    self.baseline.as_deref()
  }

  /// Categories with an indicator column, sorted.
  pub fn categories(&self) -> &[String] {
    &self.categories
  }

  pub fn column_names(&self) -> Vec<String> {
    self.categories.iter().map(|c| column_name(c)).collect()
  }
}

fn column_name(region: &str) -> String {
  format!("{REGION_PREFIX}{region}")
}

/// A single row of predictors before encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureInput {
  pub month: f64,
  pub year: f64,
  pub region: Option<String>,
  pub annual_rainfall: f64,
  pub annual_temperature: f64,
}

impl FeatureInput {
  /// Names and values of this row alone: the base features plus the row's own
  /// region indicator. Baseline and unseen regions are dropped later by alignment.
  fn named_values(&self) -> HashMap<String, f64> {
    let mut values: HashMap<String, f64> = BASE_FEATURES
      .iter()
      .map(|n| n.to_string())
      .zip([self.month, self.year, self.annual_rainfall, self.annual_temperature])
      .collect();
    if let Some(region) = &self.region {
      values.insert(column_name(region), 1.0);
    }
    values
  }
}

/// Encodes rows into the exact column layout seen at training time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureEncoder {
  regions: RegionEncoder,
  columns: Vec<String>,
}

impl FeatureEncoder {
  pub fn new(regions: RegionEncoder) -> Self {
    let columns = BASE_FEATURES
      .iter()
      .map(|n| n.to_string())
      .chain(regions.column_names())
      .collect();
    Self { regions, columns }
  }

  pub fn regions(&self) -> &RegionEncoder {
    &self.regions
  }

  /// Training column names, in order.
  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  /// Encodes one row. Training columns the row does not produce are filled with 0,
  /// columns training never saw are ignored.
  pub fn encode_row(&self, input: &FeatureInput) -> Array1<f64> {
    let values = input.named_values();
    self
      .columns
      .iter()
      .map(|c| values.get(c).copied().unwrap_or(0.0))
      .collect()
  }

  pub fn encode_rows(&self, inputs: &[FeatureInput]) -> Array2<f64> {
    let mut x = Array2::zeros((inputs.len(), self.columns.len()));
    for (mut row, input) in x.rows_mut().into_iter().zip(inputs) {
      row.assign(&self.encode_row(input));
    }
    x
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
  pub x: Array2<f64>,
  pub y: Array1<f64>,
}

impl Split {
  fn select(x: &Array2<f64>, y: &Array1<f64>, idx: &[usize]) -> Self {
    Self {
      x: x.select(ndarray::Axis(0), idx),
      y: y.select(ndarray::Axis(0), idx),
    }
  }

  pub fn len(&self) -> usize {
    self.y.len()
  }

  pub fn is_empty(&self) -> bool {
    self.y.is_empty()
  }
}

/// Encoded predictors and target, split into train and test partitions.
#[derive(Debug, Clone)]
pub struct FeatureSet {
  pub encoder: FeatureEncoder,
  pub train: Split,
  pub test: Split,
}

/// Selects predictors and target, fits the region encoding on every usable row
/// and splits with a seeded shuffle.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn build_features(table: &CleanTable, test_ratio: f64, seed: u64) -> Result<FeatureSet> {
  for required in [MONTH, YEAR, REGIONS, ANNUAL_RAINFALL, ANNUAL_TEMPERATURE, PRICE] {
    if table.column(required).is_none() {
      return Err(DataError::MissingColumn(required.to_string()));
    }
  }

  let (inputs, targets): (Vec<FeatureInput>, Vec<f64>) = table
    .observations()
    .into_iter()
    .filter_map(|o| {
      Some((
        FeatureInput {
          month: o.month? as f64,
          year: o.year? as f64,
          region: o.region,
          annual_rainfall: o.annual_rainfall?,
          annual_temperature: o.annual_temperature?,
        },
        o.price?,
      ))
    })
    .unzip();

  let skipped = table.len() - inputs.len();
  if skipped > 0 {
    warn!(skipped, "rows with missing predictors or target left out of the model data");
  }
  if inputs.is_empty() {
    return Err(DataError::Empty);
  }

  let encoder = FeatureEncoder::new(RegionEncoder::fit(
    inputs.iter().map(|i| i.region.as_deref()),
  ));
  let x = encoder.encode_rows(&inputs);
  let y = Array1::from(targets);

  let (train_idx, test_idx) = train_test_split(inputs.len(), test_ratio, seed);
  info!(
    features = encoder.columns().len(),
    train = train_idx.len(),
    test = test_idx.len(),
    "feature matrix ready"
  );
  Ok(FeatureSet {
    train: Split::select(&x, &y, &train_idx),
    test: Split::select(&x, &y, &test_idx),
    encoder,
  })
}

/// Shuffled (train, test) row indices; the test side gets `ceil(n * test_ratio)` rows.
pub fn train_test_split(n: usize, test_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
  let mut idx: Vec<usize> = (0..n).collect();
  idx.shuffle(&mut StdRng::seed_from_u64(seed));
  let n_test = ((n as f64 * test_ratio).ceil() as usize).min(n);
  let train = idx.split_off(n_test);
  (train, idx)
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;
  use crate::data::Column;

  fn input(region: Option<&str>) -> FeatureInput {
    FeatureInput {
      month: 3.0,
      year: 2021.0,
      region: region.map(str::to_string),
      annual_rainfall: 700.0,
      annual_temperature: 22.0,
    }
  }

  fn encoder() -> FeatureEncoder {
    FeatureEncoder::new(RegionEncoder::fit(
      ["Nairobi", "Kisumu", "Mombasa", "Kisumu"].map(Some),
    ))
  }

  #[test]
  fn first_sorted_region_is_the_baseline() {
    let enc = encoder();
    assert_eq!(enc.regions().baseline(), Some("Kisumu"));
    assert_eq!(
      enc.columns(),
      &[
        "Month",
        "Year",
        "Annual Rainfall",
        "Annual Temperature",
        "Regions_Mombasa",
        "Regions_Nairobi"
      ]
    );
  }

  #[test]
  fn seen_region_sets_its_indicator() {
    let row = encoder().encode_row(&input(Some("Nairobi")));
    assert_eq!(row.to_vec(), vec![3.0, 2021.0, 700.0, 22.0, 0.0, 1.0]);
  }

  #[test]
  fn unseen_baseline_and_missing_regions_are_all_zero() {
    let enc = encoder();
    for region in [Some("Turkana"), Some("Kisumu"), None] {
      let row = enc.encode_row(&input(region));
      assert_eq!(row.len(), enc.columns().len());
      assert!(row.iter().skip(BASE_FEATURES.len()).all(|v| *v == 0.0));
    }
  }

  #[test]
  fn split_is_seeded_and_disjoint() {
    let (train, test) = train_test_split(10, 0.2, 42);
    assert_eq!((train.len(), test.len()), (8, 2));
    assert_eq!(train_test_split(10, 0.2, 42), (train.clone(), test.clone()));
    let mut all: Vec<usize> = train.into_iter().chain(test).collect();
    all.sort_unstable();
    assert_eq!(all, (0..10).collect::<Vec<_>>());

    // sklearn rounds the test share up
    assert_eq!(train_test_split(11, 0.2, 1).1.len(), 3);
  }

  #[test]
  fn rows_without_a_date_are_left_out() {
    let table = CleanTable::new(vec![
      ("Regions".into(), Column::Text(vec![Some("A".into()), Some("B".into()), Some("B".into())])),
      ("Price".into(), Column::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)])),
      ("Annual Rainfall".into(), Column::Numeric(vec![Some(1.0); 3])),
      ("Annual Temperature".into(), Column::Numeric(vec![Some(1.0); 3])),
      ("Month".into(), Column::Numeric(vec![Some(1.0), None, Some(2.0)])),
      ("Year".into(), Column::Numeric(vec![Some(2020.0), None, Some(2020.0)])),
    ]);
    let features = build_features(&table, 0.5, 42).unwrap();
    assert_eq!(features.train.len() + features.test.len(), 2);
    assert_eq!(features.encoder.columns().last().map(String::as_str), Some("Regions_B"));
  }

  #[test]
  fn missing_region_column_is_reported() {
    let table = CleanTable::new(vec![("Price".into(), Column::Numeric(vec![Some(1.0)]))]);
    assert!(matches!(build_features(&table, 0.2, 42), Err(DataError::MissingColumn(_))));
  }

  proptest! {
    #[test]
    fn encoded_rows_match_training_columns(
      seen in prop::collection::vec("[A-E][a-z]{0,3}", 1..6),
      asked in proptest::option::of("[A-G][a-z]{0,3}"),
      month in 1u32..=12,
      year in 1990i32..2030,
    ) {
      let enc = FeatureEncoder::new(RegionEncoder::fit(seen.iter().map(|s| Some(s.as_str()))));
      let row = FeatureInput { month: month as f64, year: year as f64, region: asked.clone(), annual_rainfall: 1.0, annual_temperature: 2.0 };
      let encoded = enc.encode_row(&row);
      prop_assert_eq!(encoded.len(), enc.columns().len());
      let hot = encoded.iter().skip(BASE_FEATURES.len()).filter(|v| **v == 1.0).count();
      let expected = match &asked {
        Some(r) if enc.regions().categories().contains(r) => 1,
        _ => 0,
      };
      prop_assert_eq!(hot, expected);
      let matrix = enc.encode_rows(&[row]);
      prop_assert_eq!(matrix.ncols(), enc.columns().len());
    }
  }
}
