pub mod chart;
pub mod selection;
pub mod view;

pub use chart::{price_trend, render_trend_svg, ChartError, TrendPoint};
pub use selection::{Selection, SelectionOptions, SelectionQuery};
pub use view::{DashboardView, PredictionPanel};
