use std::fmt::Write;

use serde::Serialize;
use tracing::warn;

use super::{
  chart::{self, ChartError, TrendPoint},
  selection::{Selection, SelectionOptions, SelectionQuery},
};
use crate::{
  capabilities::Capabilities,
  data::{FeatureEncoder, FeatureInput},
  model::{EvaluationReport, TrainedModel},
  pipeline::PipelineOutput,
};

pub const TITLE: &str = "Maize Crop Price Prediction";
pub const MODEL_UNAVAILABLE: &str = "Prediction model is not available.";
pub const TRAINING_SKIPPED: &str = "Model training is not available. Training and evaluation were skipped.";
pub const CHARTS_UNAVAILABLE: &str = "Charting is not available for data visualization.";
const EXPLANATION: &str = "This application predicts the maize crop price based on historical data, \
including production volumes, annual temperature, and rainfall for various regions in Kenya.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionPanel {
  Predicted(f64),
  Unavailable,
}

impl PredictionPanel {
  /// Runs the model on one encoded row, or reports that there is no model.
  pub fn new(model: Option<&TrainedModel>, encoder: &FeatureEncoder, input: &FeatureInput) -> Self {
    match model {
      Some(model) => Self::Predicted(model.predict_one(encoder.encode_row(input).view())),
      None => Self::Unavailable,
    }
  }

  pub fn value(&self) -> Option<f64> {
    match self {
      Self::Predicted(v) => Some(*v),
      Self::Unavailable => None,
    }
  }

  pub fn message(&self) -> String {
    match self {
      Self::Predicted(v) => format!("Predicted Maize Price: {v:.2} KES"),
      Self::Unavailable => MODEL_UNAVAILABLE.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartPanel {
  Svg(String),
  Unavailable,
  Failed(String),
}

impl ChartPanel {
  pub fn new(caps: &Capabilities, points: &[TrendPoint]) -> Self {
    if !caps.charts {
      return Self::Unavailable;
    }
    match chart::render_trend_svg(points) {
      Ok(svg) => Self::Svg(svg),
      Err(ChartError::Unavailable) => Self::Unavailable,
      Err(e) => {
        warn!(error = %e, "trend chart failed");
        Self::Failed(e.to_string())
      }
    }
  }
}

/// Everything the page shows for one request.
#[derive(Debug, Clone)]
pub struct DashboardView {
  pub options: SelectionOptions,
  pub selection: Option<Selection>,
  pub prediction: PredictionPanel,
  pub evaluation: Option<EvaluationReport>,
  pub trend: Vec<TrendPoint>,
  pub chart: ChartPanel,
}

impl DashboardView {
  pub fn build(output: &PipelineOutput, caps: &Capabilities, query: &SelectionQuery) -> Self {
    let options = SelectionOptions::from_table(&output.table);
    let selection = options.resolve(query);
    let prediction = match &selection {
      Some(selection) => PredictionPanel::new(
        output.model.as_ref(),
        &output.features.encoder,
        &selection.feature_input(&output.table),
      ),
      None => PredictionPanel::Unavailable,
    };
    let trend = chart::price_trend(&output.table);
    let chart = ChartPanel::new(caps, &trend);
    Self {
      options,
      selection,
      prediction,
      evaluation: output.evaluation,
      trend,
      chart,
    }
  }

  pub fn render(&self) -> String {
    let mut body = String::new();
    let _ = write!(body, "<h1>{TITLE}</h1>");
    body.push_str(&self.render_form());

    body.push_str("<section class=\"evaluation\"><h2>Model Evaluation</h2>");
    match &self.evaluation {
      Some(r) => {
        let _ = write!(
          body,
          "<p>Model Evaluation - MAE: {}</p><p>Mean Absolute Error: {}</p>\
           <p>Mean Squared Error: {}</p><p>R-squared: {}</p>",
          r.mae, r.mean_absolute_error, r.mean_squared_error, r.r_squared
        );
      }
      None => {
        let _ = write!(body, "<p class=\"warning\">{TRAINING_SKIPPED}</p>");
      }
    }
    body.push_str("</section>");

    let class = match self.prediction {
      PredictionPanel::Predicted(_) => "prediction",
      PredictionPanel::Unavailable => "warning",
    };
    let _ = write!(body, "<p class=\"{class}\">{}</p>", escape(&self.prediction.message()));

    body.push_str("<section class=\"trend\">");
    match &self.chart {
      ChartPanel::Svg(svg) => {
        let _ = write!(body, "<h2>Historical Price Trends</h2><figure>{svg}");
        if let (Some(first), Some(last)) = (self.trend.first(), self.trend.last()) {
          let _ = write!(
            body,
            "<figcaption>Average Maize Price Over Years, {}-{:02} to {}-{:02}</figcaption>",
            first.year, first.month, last.year, last.month
          );
        }
        body.push_str("</figure>");
      }
      ChartPanel::Unavailable => {
        let _ = write!(body, "<p class=\"warning\">{CHARTS_UNAVAILABLE}</p>");
      }
      ChartPanel::Failed(e) => {
        let _ = write!(body, "<p class=\"warning\">{}</p>", escape(e));
      }
    }
    body.push_str("</section>");

    let _ = write!(
      body,
      "<h2>Additional Information</h2><details><summary>See explanation</summary><p>{EXPLANATION}</p></details>"
    );
    page(&body)
  }

  fn render_form(&self) -> String {
    fn select<T: ToString + PartialEq>(name: &str, label: &str, options: &[T], chosen: Option<&T>) -> String {
      let mut html = format!("<label>{label} <select name=\"{name}\">");
      for o in options {
        let value = escape(&o.to_string());
        let selected = if Some(o) == chosen { " selected" } else { "" };
        let _ = write!(html, "<option value=\"{value}\"{selected}>{value}</option>");
      }
      html.push_str("</select></label>");
      html
    }
    let s = self.selection.as_ref();
    format!(
      "<form method=\"get\" action=\"/\"><h2>Input Parameters</h2>{}{}{}<button type=\"submit\">Update</button></form>",
      select("region", "Region", &self.options.regions, s.map(|s| &s.region)),
      select("year", "Year", &self.options.years, s.map(|s| &s.year)),
      select("month", "Month", &self.options.months, s.map(|s| &s.month)),
    )
  }
}

fn page(body: &str) -> String {
  format!(
    "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{TITLE}</title>\
     <style>body{{font-family:sans-serif;margin:2rem}}.warning{{color:#a60}}\
     form label{{margin-right:1rem}}</style></head><body>{body}</body></html>"
  )
}

pub fn escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}
