//! Next-hour electricity price forecasting.
//!
//! A day-ahead price export goes through [`data`] (timestamp reconciliation and
//! gap filling), then [`forecast`] (lag and calendar features, train/predict
//! flows) and finally [`ml`] (scaling, regression, persistence).

pub mod config;
pub mod data;
pub mod forecast;
pub mod ml;
pub mod telemetry;
