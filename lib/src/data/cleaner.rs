use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, instrument, warn};

use super::{CleanTable, Column, RawTable, UNNAMED_PREFIX};
use crate::error::{DataError, Result};

pub const PRICE: &str = "Price";
pub const USD_PRICE: &str = "Usdprice";
pub const AMOUNT_PRODUCED: &str = "Amount Produced";
pub const ANNUAL_RAINFALL: &str = "Annual Rainfall";
pub const ANNUAL_TEMPERATURE: &str = "Annual Temperature";
pub const DATE: &str = "Date";
pub const REGIONS: &str = "Regions";
pub const MONTH: &str = "Month";
pub const YEAR: &str = "Year";

/// Columns coerced to numbers during cleaning.
pub const NUMERIC_COLUMNS: [&str; 5] = [
  PRICE,
  USD_PRICE,
  AMOUNT_PRODUCED,
  ANNUAL_RAINFALL,
  ANNUAL_TEMPERATURE,
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M:%S%.f",
];

/// Turns the raw export into a typed table.
///
/// Steps, in order: drop all-missing columns, drop the first row, drop `Unnamed`
/// columns, forward-fill, coerce the numeric and date columns, fill numeric gaps with
/// the column mean over the whole dataset, then replace `Date` with `Month` and `Year`.
///
/// The row-level steps are not idempotent: feeding an already cleaned table back
/// through [`prepare`] drops another leading row.
#[instrument(skip_all, fields(rows = raw.rows.len()))]
pub fn clean(raw: &RawTable) -> Result<CleanTable> {
  // numeric as loaded, before the header remnant row is removed
  let numeric_at_load: HashSet<String> = (0..raw.headers.len())
    .filter(|&i| raw.is_numeric(i))
    .map(|i| raw.headers[i].clone())
    .collect();

  let mut table = raw.clone();
  prepare(&mut table);

  for required in NUMERIC_COLUMNS.iter().chain([&DATE]) {
    if table.column_index(required).is_none() {
      return Err(DataError::MissingColumn(required.to_string()));
    }
  }

  let mut columns = Vec::with_capacity(table.headers.len() + 1);
  let mut dates = Vec::new();
  for (idx, name) in table.headers.iter().enumerate() {
    if name == DATE {
      dates = table.column(idx).map(|v| v.and_then(parse_date)).collect();
    } else if NUMERIC_COLUMNS.contains(&name.as_str()) || numeric_at_load.contains(name) {
      let mut values: Vec<Option<f64>> = table.column(idx).map(|v| v.and_then(parse_number)).collect();
      impute_mean(name, &mut values);
      columns.push((name.clone(), Column::Numeric(values)));
    } else {
      let values = table.column(idx).map(|v| v.map(str::to_string)).collect();
      columns.push((name.clone(), Column::Text(values)));
    }
  }

  let months = dates.iter().map(|d| d.map(|d| d.month() as f64)).collect();
  let years = dates.iter().map(|d| d.map(|d| d.year() as f64)).collect();
  columns.push((MONTH.to_string(), Column::Numeric(months)));
  columns.push((YEAR.to_string(), Column::Numeric(years)));

  let unparsed = dates.iter().filter(|d| d.is_none()).count();
  if unparsed > 0 {
    warn!(unparsed, "rows without a usable date, Month and Year left missing");
  }

  Ok(CleanTable::new(columns))
}

/// The untyped part of cleaning, applied in place.
pub fn prepare(table: &mut RawTable) {
  drop_empty_columns(table);
  drop_first_row(table);
  drop_unnamed_columns(table);
  forward_fill(table);
}

pub fn drop_empty_columns(table: &mut RawTable) {
  table.retain_columns(|t, i| t.column(i).any(|v| v.is_some()));
}

pub fn drop_first_row(table: &mut RawTable) {
  if !table.rows.is_empty() {
    table.rows.remove(0);
  }
}

pub fn drop_unnamed_columns(table: &mut RawTable) {
  table.retain_columns(|t, i| !t.headers[i].starts_with(UNNAMED_PREFIX));
}

/// Fills each gap with the last present value above it in the same column.
pub fn forward_fill(table: &mut RawTable) {
  let mut last: Vec<Option<String>> = vec![None; table.headers.len()];
  for row in table.rows.iter_mut() {
    for (cell, previous) in row.iter_mut().zip(last.iter_mut()) {
      if cell.is_some() {
        previous.clone_from(cell);
      } else {
        cell.clone_from(previous);
      }
    }
  }
}

/// Lenient number parsing; anything unreadable is missing.
pub fn parse_number(raw: &str) -> Option<f64> {
  raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lenient date parsing; anything unreadable is missing.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    .or_else(|| {
      DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
    })
}

/// Mean of the present values, `None` when there are none.
pub fn column_mean(values: &[Option<f64>]) -> Option<f64> {
  let (sum, count) = values
    .iter()
    .flatten()
    .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
  (count > 0).then(|| sum / count as f64)
}

fn impute_mean(name: &str, values: &mut [Option<f64>]) {
  let gaps = values.iter().filter(|v| v.is_none()).count();
  if gaps == 0 {
    return;
  }
  match column_mean(values) {
    Some(mean) => {
      debug!(column = name, gaps, mean, "mean imputation");
      for value in values.iter_mut().filter(|v| v.is_none()) {
        *value = Some(mean);
      }
    }
    None => warn!(column = name, "column has no numeric values, gaps left missing"),
  }
}
