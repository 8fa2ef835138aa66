use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::data::{
  cleaner::{ANNUAL_RAINFALL, ANNUAL_TEMPERATURE},
  CleanTable, FeatureInput,
};

/// Values offered by the region/year/month inputs, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionOptions {
  pub regions: Vec<String>,
  pub years: Vec<i32>,
  pub months: Vec<u32>,
}

impl SelectionOptions {
  pub fn from_table(table: &CleanTable) -> Self {
    let observations = table.observations();
    Self {
      regions: observations.iter().filter_map(|o| o.region.clone()).unique().collect(),
      years: observations.iter().filter_map(|o| o.year).unique().collect(),
      months: observations.iter().filter_map(|o| o.month).unique().collect(),
    }
  }

  /// Resolves a request against the options, one field at a time. Absent, unreadable
  /// or unknown values fall back to the first option; `None` when the dataset offers
  /// nothing to choose.
  pub fn resolve(&self, query: &SelectionQuery) -> Option<Selection> {
    fn pick<T: PartialEq + Clone + FromStr>(options: &[T], wanted: Option<&str>) -> Option<T> {
      wanted
        .and_then(|w| w.parse::<T>().ok())
        .filter(|w| options.contains(w))
        .or_else(|| options.first().cloned())
    }
    Some(Selection {
      region: pick(&self.regions, query.region.as_deref())?,
      year: pick(&self.years, query.year.as_deref())?,
      month: pick(&self.months, query.month.as_deref())?,
    })
  }
}

/// Raw query string values, parsed field by field in [`SelectionOptions::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectionQuery {
  pub region: Option<String>,
  pub year: Option<String>,
  pub month: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
  pub region: String,
  pub year: i32,
  pub month: u32,
}

impl Selection {
  /// The row to predict: the selection plus dataset-wide climate means.
  pub fn feature_input(&self, table: &CleanTable) -> FeatureInput {
    FeatureInput {
      month: self.month as f64,
      year: self.year as f64,
      region: Some(self.region.clone()),
      annual_rainfall: table.mean(ANNUAL_RAINFALL).unwrap_or(0.0),
      annual_temperature: table.mean(ANNUAL_TEMPERATURE).unwrap_or(0.0),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::{
    cleaner::{MONTH, REGIONS, YEAR},
    Column,
  };

  fn table() -> CleanTable {
    CleanTable::new(vec![
      (
        REGIONS.to_string(),
        Column::Text(vec![
          Some("Nakuru".into()),
          None,
          Some("Embu".into()),
          Some("Nakuru".into()),
        ]),
      ),
      (YEAR.to_string(), Column::Numeric(vec![Some(2021.0), Some(2019.0), None, Some(2021.0)])),
      (MONTH.to_string(), Column::Numeric(vec![Some(5.0), Some(5.0), Some(1.0), None])),
      (ANNUAL_RAINFALL.to_string(), Column::Numeric(vec![Some(600.0), Some(800.0), None, Some(700.0)])),
      (ANNUAL_TEMPERATURE.to_string(), Column::Numeric(vec![Some(20.0); 4])),
    ])
  }

  #[test]
  fn options_keep_first_appearance_order() {
    let options = SelectionOptions::from_table(&table());
    assert_eq!(options.regions, vec!["Nakuru", "Embu"]);
    assert_eq!(options.years, vec![2021, 2019]);
    assert_eq!(options.months, vec![5, 1]);
  }

  #[test]
  fn unknown_values_fall_back_to_first_option() {
    let options = SelectionOptions::from_table(&table());
    let query = SelectionQuery {
      region: Some("Atlantis".into()),
      year: Some("2019".into()),
      month: None,
    };
    assert_eq!(
      options.resolve(&query),
      Some(Selection {
        region: "Nakuru".into(),
        year: 2019,
        month: 5,
      })
    );
    assert_eq!(SelectionOptions::default().resolve(&query), None);
  }

  #[test]
  fn unreadable_value_only_resets_its_own_field() {
    let options = SelectionOptions::from_table(&table());
    let query = SelectionQuery {
      region: Some("Embu".into()),
      year: Some("abc".into()),
      month: Some("1".into()),
    };
    assert_eq!(
      options.resolve(&query),
      Some(Selection {
        region: "Embu".into(),
        year: 2021,
        month: 1,
      })
    );
  }

  #[test]
  fn prediction_row_uses_climate_means() {
    let table = table();
    let selection = Selection {
      region: "Embu".into(),
      year: 2019,
      month: 1,
    };
    let input = selection.feature_input(&table);
    assert_eq!(input.annual_rainfall, 700.0);
    assert_eq!(input.annual_temperature, 20.0);
    assert_eq!(input.region.as_deref(), Some("Embu"));
  }
}
