use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::data::CleanTable;

pub const CHART_SIZE: (u32, u32) = (800, 360);

/// Mean price of one (year, month).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
  pub year: i32,
  pub month: u32,
  pub price: f64,
}

impl TrendPoint {
  /// Position on a continuous time axis.
  pub fn x(&self) -> f64 {
    self.year as f64 + (self.month as f64 - 1.0) / 12.0
  }
}

#[derive(Debug, Error)]
pub enum ChartError {
  #[error("charting is not available in this build")]
  Unavailable,
  #[error("failed to render chart: {0}")]
  Render(String),
}

/// Mean Price grouped by (Year, Month), ordered by year then month. Rows missing any
/// of the three are left out.
pub fn price_trend(table: &CleanTable) -> Vec<TrendPoint> {
  let mut groups: BTreeMap<(i32, u32), (f64, usize)> = BTreeMap::new();
  for o in table.observations() {
    if let (Some(year), Some(month), Some(price)) = (o.year, o.month, o.price) {
      let entry = groups.entry((year, month)).or_default();
      entry.0 += price;
      entry.1 += 1;
    }
  }
  groups
    .into_iter()
    .map(|((year, month), (sum, count))| TrendPoint {
      year,
      month,
      price: sum / count as f64,
    })
    .collect()
}

/// Inline SVG of the trend line. Axis labelling is left to the page.
#[cfg(feature = "charts")]
pub fn render_trend_svg(points: &[TrendPoint]) -> Result<String, ChartError> {
  use plotters::prelude::*;

  let render = |e: &dyn std::fmt::Display| ChartError::Render(e.to_string());
  let (x_min, x_max) = bounds(points.iter().map(TrendPoint::x));
  let (y_min, y_max) = bounds(points.iter().map(|p| p.price));

  let mut svg = String::new();
  {
    let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render(&e))?;
    let mut chart = ChartBuilder::on(&root)
      .margin(10)
      .build_cartesian_2d(x_min..x_max, y_min..y_max)
      .map_err(|e| render(&e))?;
    chart
      .draw_series(LineSeries::new(points.iter().map(|p| (p.x(), p.price)), &BLUE))
      .map_err(|e| render(&e))?;
    root.present().map_err(|e| render(&e))?;
  }
  Ok(svg)
}

#[cfg(not(feature = "charts"))]
pub fn render_trend_svg(_points: &[TrendPoint]) -> Result<String, ChartError> {
  Err(ChartError::Unavailable)
}

/// Padded range; a degenerate range is widened so the plot has some extent.
#[cfg_attr(not(feature = "charts"), allow(dead_code))]
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
  let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
    (lo.min(v), hi.max(v))
  });
  if !lo.is_finite() || !hi.is_finite() {
    return (0.0, 1.0);
  }
  if lo == hi {
    return (lo - 1.0, hi + 1.0);
  }
  let pad = (hi - lo) * 0.05;
  (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::{
    cleaner::{MONTH, PRICE, YEAR},
    Column,
  };

  #[test]
  fn aggregates_monthly_means_in_order() {
    let table = CleanTable::new(vec![
      (PRICE.to_string(), Column::Numeric(vec![Some(30.0), Some(10.0), Some(20.0), Some(5.0)])),
      (YEAR.to_string(), Column::Numeric(vec![Some(2021.0), Some(2020.0), Some(2020.0), None])),
      (MONTH.to_string(), Column::Numeric(vec![Some(1.0), Some(1.0), Some(1.0), Some(3.0)])),
    ]);
    assert_eq!(
      price_trend(&table),
      vec![
        TrendPoint {
          year: 2020,
          month: 1,
          price: 15.0,
        },
        TrendPoint {
          year: 2021,
          month: 1,
          price: 30.0,
        },
      ]
    );
  }

  #[test]
  fn x_axis_is_fractional_year() {
    let p = TrendPoint {
      year: 2020,
      month: 7,
      price: 1.0,
    };
    assert!((p.x() - 2020.5).abs() < 1e-12);
  }

  #[test]
  fn bounds_widen_single_value() {
    assert_eq!(bounds([3.0].into_iter()), (2.0, 4.0));
    assert_eq!(bounds(std::iter::empty()), (0.0, 1.0));
  }

  #[cfg(feature = "charts")]
  #[test]
  fn renders_svg() {
    let points = [
      TrendPoint {
        year: 2020,
        month: 1,
        price: 10.0,
      },
      TrendPoint {
        year: 2020,
        month: 2,
        price: 12.0,
      },
    ];
    let svg = render_trend_svg(&points).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("polyline") || svg.contains("path"));
  }

  #[cfg(not(feature = "charts"))]
  #[test]
  fn unavailable_without_feature() {
    assert!(matches!(render_trend_svg(&[]), Err(ChartError::Unavailable)));
  }
}
