//! Series normalization
//!
//! Turns reconciled `(timestamp, raw value)` pairs into a gap-free price series:
//! target column selection, tolerant numeric coercion, ordering, duplicate
//! handling and time-weighted gap filling.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{DataError, DataResult};
use super::reconcile::Reconciled;
use super::table::RawTable;

/// What to do when two rows share a timestamp.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the load
    #[default]
    Reject,
    /// Keep the row that appears last in the file
    KeepLast,
    /// Average the known values of all rows at that timestamp
    Average,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::KeepLast => write!(f, "keep_last"),
            Self::Average => write!(f, "average"),
        }
    }
}

/// One reading at a canonical point in time. `None` is a gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// Strictly increasing timestamps with a price for every one of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    timestamps: Vec<NaiveDateTime>,
    prices: Vec<f64>,
    gaps_filled: usize,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Number of prices that were missing after deduplication and got filled
    pub fn gaps_filled(&self) -> usize {
        self.gaps_filled
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.prices.iter().copied())
    }
}

/// Selects the target column and produces a [`PriceSeries`].
#[derive(Debug, Clone)]
pub struct SeriesNormalizer {
    target_column: String,
    duplicate_policy: DuplicatePolicy,
}

impl SeriesNormalizer {
    pub fn new(target_column: impl Into<String>, duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            target_column: target_column.into(),
            duplicate_policy,
        }
    }

    /// Normalize the target column of `table` using the reconciled timestamps.
    pub fn normalize(&self, table: &RawTable, reconciled: &Reconciled) -> DataResult<PriceSeries> {
        let available: Vec<String> = table
            .headers()
            .iter()
            .filter(|h| !reconciled.consumed.contains(*h))
            .cloned()
            .collect();

        let target_idx = match table.column_index(&self.target_column) {
            Some(idx) if available.contains(&self.target_column) => idx,
            _ => {
                return Err(DataError::schema(
                    format!("target column '{}' not found", self.target_column),
                    &available,
                ))
            }
        };

        let consumed_idx: Vec<usize> = reconciled
            .consumed
            .iter()
            .filter_map(|c| table.column_index(c))
            .collect();

        let observations = reconciled
            .timestamps
            .iter()
            .zip(table.column(target_idx))
            .enumerate()
            .map(|(i, (ts, raw))| match ts {
                Some(ts) => Ok(Observation::new(*ts, parse_price(raw))),
                None => {
                    let source = consumed_idx
                        .iter()
                        .filter_map(|&c| table.row(i).map(|r| r[c].1.to_string()))
                        .collect::<Vec<_>>()
                        .join(" ");
                    Err(DataError::parse(i + 1, &source, "time-of-day could not be resolved"))
                }
            })
            .collect::<DataResult<Vec<_>>>()?;

        let observations = sort_and_dedup(observations, self.duplicate_policy)?;
        let series = fill_gaps(&observations, &self.target_column)?;

        info!(
            column = %self.target_column,
            rows = series.len(),
            gaps_filled = series.gaps_filled(),
            "series normalized"
        );
        Ok(series)
    }
}

/// Numeric coercion: anything that is not a finite number becomes a gap.
pub fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Sort ascending by timestamp and resolve duplicates according to `policy`.
pub fn sort_and_dedup(
    mut observations: Vec<Observation>,
    policy: DuplicatePolicy,
) -> DataResult<Vec<Observation>> {
    // stable: equal timestamps keep their file order
    observations.sort_by_key(|o| o.timestamp);

    let mut out: Vec<Observation> = Vec::with_capacity(observations.len());
    let mut merged: Vec<Vec<f64>> = Vec::with_capacity(observations.len());
    let mut duplicates = 0usize;

    for obs in observations {
        let is_duplicate = out.last().map_or(false, |l| l.timestamp == obs.timestamp);
        if !is_duplicate {
            merged.push(obs.value.into_iter().collect());
            out.push(obs);
            continue;
        }

        duplicates += 1;
        match policy {
            DuplicatePolicy::Reject => {
                return Err(DataError::DuplicateTimestamp {
                    timestamp: obs.timestamp,
                })
            }
            DuplicatePolicy::KeepLast => {
                if let Some(last) = out.last_mut() {
                    *last = obs;
                }
            }
            DuplicatePolicy::Average => {
                if let (Some(values), Some(v)) = (merged.last_mut(), obs.value) {
                    values.push(v);
                }
            }
        }
    }

    if policy == DuplicatePolicy::Average {
        for (obs, values) in out.iter_mut().zip(merged.iter()) {
            if !values.is_empty() {
                obs.value = Some(values.iter().sum::<f64>() / values.len() as f64);
            }
        }
    }

    if duplicates > 0 {
        warn!(duplicates, policy = %policy, "duplicate timestamps merged");
    }

    Ok(out)
}

/// Fill gaps in a sorted, duplicate-free sequence.
///
/// Interior gaps are interpolated linearly in elapsed time between the nearest
/// known neighbours. Leading gaps take the first known value, trailing gaps the
/// last known value.
pub fn fill_gaps(observations: &[Observation], column: &str) -> DataResult<PriceSeries> {
    if observations.is_empty() {
        return Ok(PriceSeries::default());
    }

    let known: Vec<usize> = observations
        .iter()
        .enumerate()
        .filter_map(|(i, o)| o.value.map(|_| i))
        .collect();

    let (Some(&first), Some(&last)) = (known.first(), known.last()) else {
        return Err(DataError::EmptySeries {
            column: column.to_string(),
        });
    };

    let mut prices: Vec<f64> = observations.iter().map(|o| o.value.unwrap_or(f64::NAN)).collect();

    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (t_a, t_b) = (observations[a].timestamp, observations[b].timestamp);
        let span = (t_b - t_a).num_seconds() as f64;
        let delta = prices[b] - prices[a];
        for k in a + 1..b {
            let elapsed = (observations[k].timestamp - t_a).num_seconds() as f64;
            prices[k] = prices[a] + delta * elapsed / span;
        }
    }

    let head = prices[first];
    prices[..first].iter_mut().for_each(|p| *p = head);
    let tail = prices[last];
    prices[last + 1..].iter_mut().for_each(|p| *p = tail);

    Ok(PriceSeries {
        timestamps: observations.iter().map(|o| o.timestamp).collect(),
        prices,
        gaps_filled: observations.len() - known.len(),
    })
}
