pub mod cleaner;
pub mod features;
pub mod loader;
pub mod table;

pub use cleaner::clean;
pub use features::{build_features, FeatureEncoder, FeatureInput, FeatureSet, RegionEncoder, Split};
pub use loader::load_data;
pub use table::{RawTable, UNNAMED_PREFIX};

use cleaner::{
  AMOUNT_PRODUCED, ANNUAL_RAINFALL, ANNUAL_TEMPERATURE, MONTH, PRICE, REGIONS, USD_PRICE, YEAR,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
  Numeric(Vec<Option<f64>>),
  Text(Vec<Option<String>>),
}

impl Column {
  pub fn len(&self) -> usize {
    match self {
      Column::Numeric(v) => v.len(),
      Column::Text(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Cleaned dataset: named, typed columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanTable {
  columns: Vec<(String, Column)>,
}

impl CleanTable {
  pub fn new(columns: Vec<(String, Column)>) -> Self {
    debug_assert!(columns.windows(2).all(|w| w[0].1.len() == w[1].1.len()));
    Self { columns }
  }

  /// Number of rows.
  pub fn len(&self) -> usize {
    self.columns.first().map_or(0, |(_, c)| c.len())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn names(&self) -> Vec<&str> {
    self.columns.iter().map(|(n, _)| n.as_str()).collect()
  }

  pub fn column(&self, name: &str) -> Option<&Column> {
    self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
  }

  pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
    match self.column(name)? {
      Column::Numeric(v) => Some(v),
      Column::Text(_) => None,
    }
  }

  pub fn text(&self, name: &str) -> Option<&[Option<String>]> {
    match self.column(name)? {
      Column::Text(v) => Some(v),
      Column::Numeric(_) => None,
    }
  }

  /// Mean of a numeric column, ignoring gaps.
  pub fn mean(&self, name: &str) -> Option<f64> {
    cleaner::column_mean(self.numeric(name)?)
  }

  /// Row view of the columns the model and the dashboard care about.
  pub fn observations(&self) -> Vec<Observation> {
    let numeric = |name| self.numeric(name);
    let at = |col: Option<&[Option<f64>]>, i: usize| col.and_then(|c| c[i]);
    let (price, usd, amount, rain, temp, month, year) = (
      numeric(PRICE),
      numeric(USD_PRICE),
      numeric(AMOUNT_PRODUCED),
      numeric(ANNUAL_RAINFALL),
      numeric(ANNUAL_TEMPERATURE),
      numeric(MONTH),
      numeric(YEAR),
    );
    let regions = self.text(REGIONS);
    (0..self.len())
      .map(|i| Observation {
        price: at(price, i),
        usd_price: at(usd, i),
        amount_produced: at(amount, i),
        annual_rainfall: at(rain, i),
        annual_temperature: at(temp, i),
        region: regions.and_then(|r| r[i].clone()),
        month: at(month, i).map(|m| m as u32),
        year: at(year, i).map(|y| y as i32),
      })
      .collect()
  }
}

/// One price report for a region and month.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
  pub price: Option<f64>,
  pub usd_price: Option<f64>,
  pub amount_produced: Option<f64>,
  pub annual_rainfall: Option<f64>,
  pub annual_temperature: Option<f64>,
  pub region: Option<String>,
  pub month: Option<u32>,
  pub year: Option<i32>,
}
