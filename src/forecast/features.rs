//! Feature engineering for price forecasting
//!
//! Expands a gap-free price series into a supervised design matrix: `L` lagged
//! prices plus calendar features taken from the row's own timestamp. Rows
//! without a full lag history are dropped, never padded.

use anyhow::Result;
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::PriceSeries;

/// Calendar feature names, in model input order after the lags
pub const CALENDAR_FEATURES: [&str; 3] = ["hour", "day_of_week", "month"];

/// Calendar features of a single timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: u32,
    /// Month (1-12)
    pub month: u32,
}

impl CalendarFeatures {
    pub fn from_timestamp(timestamp: NaiveDateTime) -> Self {
        Self {
            hour: timestamp.hour(),
            day_of_week: timestamp.weekday().num_days_from_monday(),
            month: timestamp.month(),
        }
    }
}

/// One supervised example: lagged prices and calendar features, labelled with the price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: NaiveDateTime,
    /// `lags[k - 1]` is `lag_k`, the price `k` steps before this row
    pub lags: Vec<f64>,
    pub calendar: CalendarFeatures,
    pub price: f64,
}

impl FeatureRow {
    /// `lag_k` for `k` in `1..=L`
    pub fn lag(&self, k: usize) -> Option<f64> {
        k.checked_sub(1).and_then(|i| self.lags.get(i)).copied()
    }

    /// Model input vector: `lag_1..lag_L, hour, day_of_week, month`
    pub fn features(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.lags.len() + CALENDAR_FEATURES.len());
        out.extend_from_slice(&self.lags);
        out.push(self.calendar.hour as f64);
        out.push(self.calendar.day_of_week as f64);
        out.push(self.calendar.month as f64);
        out
    }
}

/// Column names matching [`FeatureRow::features`] for a lag depth
pub fn feature_names(lags: usize) -> Vec<String> {
    (1..=lags)
        .map(|k| format!("lag_{k}"))
        .chain(CALENDAR_FEATURES.iter().map(|s| s.to_string()))
        .collect()
}

/// Feature rows in ascending timestamp order.
///
/// The order matters: the train/test split is chronological and adjacent rows
/// share lag values, so shuffling would leak future prices into training.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    lags: usize,
    rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn new(lags: usize, rows: Vec<FeatureRow>) -> Self {
        Self { lags, rows }
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    pub fn feature_names(&self) -> Vec<String> {
        feature_names(self.lags)
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// Design matrix, one row per example
    pub fn x(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(FeatureRow::features).collect()
    }

    /// Label vector
    pub fn y(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.price).collect()
    }

    /// Split into (train, test) without shuffling; the test set is the most recent
    /// `ceil(len * test_fraction)` rows.
    pub fn split_chronological(&self, test_fraction: f64) -> Result<(FeatureMatrix, FeatureMatrix)> {
        if test_fraction <= 0.0 || test_fraction >= 1.0 {
            anyhow::bail!("Test fraction must be between 0 and 1");
        }

        let n_test = (self.len() as f64 * test_fraction).ceil() as usize;
        let n_train = self.len().saturating_sub(n_test);
        if n_train == 0 || n_test == 0 {
            anyhow::bail!(
                "Cannot split {} rows with test fraction {}: both partitions must be non-empty",
                self.len(),
                test_fraction
            );
        }

        Ok((
            FeatureMatrix::new(self.lags, self.rows[..n_train].to_vec()),
            FeatureMatrix::new(self.lags, self.rows[n_train..].to_vec()),
        ))
    }
}

/// Builds lag and calendar features from a normalized series
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder {
    lags: usize,
}

impl FeatureBuilder {
    pub fn new(lags: usize) -> Self {
        Self { lags }
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    pub fn build(&self, series: &PriceSeries) -> FeatureMatrix {
        let prices = series.prices();
        let timestamps = series.timestamps();

        let rows: Vec<FeatureRow> = create_lag_features(prices, self.lags)
            .into_iter()
            .zip(self.lags..)
            .map(|(lags, i)| FeatureRow {
                timestamp: timestamps[i],
                lags,
                calendar: CalendarFeatures::from_timestamp(timestamps[i]),
                price: prices[i],
            })
            .collect();

        info!(
            lags = self.lags,
            series_len = series.len(),
            rows = rows.len(),
            "features built"
        );
        FeatureMatrix::new(self.lags, rows)
    }
}

/// Create lag features for time series (previous values)
///
/// Row `j` of the output belongs to `values[num_lags + j]` and holds
/// `[values[i - 1], values[i - 2], ..., values[i - num_lags]]`.
pub fn create_lag_features(values: &[f64], num_lags: usize) -> Vec<Vec<f64>> {
    (num_lags..values.len())
        .map(|i| (1..=num_lags).map(|lag| values[i - lag]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::{fill_gaps, Observation};
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn series(start: NaiveDateTime, values: &[f64]) -> PriceSeries {
        let obs: Vec<Observation> = values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(start + Duration::hours(i as i64), Some(*v)))
            .collect();
        fill_gaps(&obs, "price").unwrap()
    }

    fn jan_3_2022() -> NaiveDateTime {
        // a Monday
        NaiveDate::from_ymd_opt(2022, 1, 3)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_lag_rows_start_after_full_history() {
        // an evening peak: each row looks back three hours, most recent first
        let prices = [82.5, 91.0, 120.4, 133.9, 97.2];
        assert_eq!(
            create_lag_features(&prices, 3),
            vec![vec![120.4, 91.0, 82.5], vec![133.9, 120.4, 91.0]]
        );
        assert!(create_lag_features(&prices, 5).is_empty());
    }

    #[test]
    fn test_calendar_features() {
        let cal = CalendarFeatures::from_timestamp(jan_3_2022());
        assert_eq!(cal, CalendarFeatures { hour: 22, day_of_week: 0, month: 1 });

        let sunday = NaiveDate::from_ymd_opt(2022, 12, 25)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap();
        let cal = CalendarFeatures::from_timestamp(sunday);
        assert_eq!(cal, CalendarFeatures { hour: 5, day_of_week: 6, month: 12 });
    }

    #[test]
    fn test_build_drops_first_lag_rows() {
        let s = series(jan_3_2022(), &[1.0, 2.0, 3.0, 4.0]);
        let m = FeatureBuilder::new(2).build(&s);

        assert_eq!(m.len(), 2);
        let first = &m.rows()[0];
        assert_eq!(first.price, 3.0);
        assert_eq!(first.lag(1), Some(2.0));
        assert_eq!(first.lag(2), Some(1.0));
        assert_eq!(first.lag(0), None);
        assert_eq!(first.lag(3), None);
        // 22:00 Monday + 2h = 00:00 Tuesday
        assert_eq!(first.calendar, CalendarFeatures { hour: 0, day_of_week: 1, month: 1 });
    }

    #[test]
    fn test_feature_vector_order() {
        let s = series(jan_3_2022(), &[1.0, 2.0, 3.0]);
        let m = FeatureBuilder::new(2).build(&s);

        assert_eq!(m.feature_names(), vec!["lag_1", "lag_2", "hour", "day_of_week", "month"]);
        assert_eq!(m.x(), vec![vec![2.0, 1.0, 0.0, 1.0, 1.0]]);
        assert_eq!(m.y(), vec![3.0]);
    }

    #[test]
    fn test_short_series_yields_no_rows() {
        let s = series(jan_3_2022(), &[1.0, 2.0]);
        assert!(FeatureBuilder::new(2).build(&s).is_empty());
        assert!(FeatureBuilder::new(24).build(&PriceSeries::default()).is_empty());
    }

    #[test]
    fn test_split_chronological() {
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let m = FeatureBuilder::new(2).build(&series(jan_3_2022(), &values));
        assert_eq!(m.len(), 10);

        let (train, test) = m.split_chronological(0.25).unwrap();
        // ceil(10 * 0.25) = 3
        assert_eq!(train.len(), 7);
        assert_eq!(test.len(), 3);
        assert!(train.rows().last().unwrap().timestamp < test.rows()[0].timestamp);
        assert_eq!(test.y(), vec![9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_split_rejects_degenerate_partitions() {
        let m = FeatureBuilder::new(1).build(&series(jan_3_2022(), &[1.0, 2.0]));
        assert_eq!(m.len(), 1);
        assert!(m.split_chronological(0.5).is_err());
        assert!(m.split_chronological(0.0).is_err());
    }

    proptest! {
        #[test]
        fn prop_row_count_law(len in 0usize..80, lags in 1usize..30) {
            let values: Vec<f64> = (0..len).map(|v| v as f64).collect();
            let m = FeatureBuilder::new(lags).build(&series(jan_3_2022(), &values));
            prop_assert_eq!(m.len(), len.saturating_sub(lags));
        }

        #[test]
        fn prop_lags_match_earlier_prices(
            values in prop::collection::vec(-1000.0f64..1000.0, 1..80),
            lags in 1usize..30,
        ) {
            let m = FeatureBuilder::new(lags).build(&series(jan_3_2022(), &values));
            for (j, row) in m.rows().iter().enumerate() {
                let i = j + lags;
                prop_assert_eq!(row.price, values[i]);
                for k in 1..=lags {
                    prop_assert_eq!(row.lag(k), Some(values[i - k]));
                }
            }
        }

        #[test]
        fn prop_output_preserves_timestamp_order(len in 0usize..80, lags in 1usize..10) {
            let values: Vec<f64> = (0..len).map(|v| (v * 7 % 13) as f64).collect();
            let m = FeatureBuilder::new(lags).build(&series(jan_3_2022(), &values));
            prop_assert!(m.timestamps().windows(2).all(|w| w[0] < w[1]));
        }
    }
}
