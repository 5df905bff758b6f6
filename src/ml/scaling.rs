//! Min-max scaling
//!
//! Features and labels are scaled independently. Scalers are fitted on the
//! training partition and saved next to the model so inference reuses the
//! exact same ranges.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Per-column min-max scaler mapping each column's fitted range onto [0, 1].
///
/// A constant column maps to 0 and inverse-transforms back to the constant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit column ranges over a row-major matrix.
    pub fn fit(data: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = data.first() else {
            anyhow::bail!("Cannot fit scaler on empty data");
        };

        let mut min = first.clone();
        let mut max = first.clone();
        for row in &data[1..] {
            if row.len() != min.len() {
                anyhow::bail!("All rows must have the same length");
            }
            for (j, v) in row.iter().enumerate() {
                min[j] = min[j].min(*v);
                max[j] = max[j].max(*v);
            }
        }

        Ok(Self { min, max })
    }

    /// Fit a single-column scaler, as used for the label.
    pub fn fit_column(values: &[f64]) -> Result<Self> {
        let rows: Vec<Vec<f64>> = values.iter().map(|v| vec![*v]).collect();
        Self::fit(&rows)
    }

    pub fn n_features(&self) -> usize {
        self.min.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        Ok(row
            .iter()
            .zip(self.min.iter().zip(self.max.iter()))
            .map(|(v, (min, max))| {
                if (max - min).abs() < 1e-10 {
                    0.0
                } else {
                    (v - min) / (max - min)
                }
            })
            .collect())
    }

    pub fn inverse_transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        Ok(row
            .iter()
            .zip(self.min.iter().zip(self.max.iter()))
            .map(|(v, (min, max))| min + v * (max - min))
            .collect())
    }

    pub fn transform(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        data.iter().map(|row| self.transform_row(row)).collect()
    }

    pub fn fit_transform(data: &[Vec<f64>]) -> Result<(Self, Vec<Vec<f64>>)> {
        let scaler = Self::fit(data)?;
        let scaled = scaler.transform(data)?;
        Ok((scaler, scaled))
    }

    /// Scale a label vector with a single-column scaler.
    pub fn transform_column(&self, values: &[f64]) -> Result<Vec<f64>> {
        values
            .iter()
            .map(|v| self.transform_row(&[*v]).map(|r| r[0]))
            .collect()
    }

    /// Map scaled labels back to original units.
    pub fn inverse_transform_column(&self, values: &[f64]) -> Result<Vec<f64>> {
        values
            .iter()
            .map(|v| self.inverse_transform_row(&[*v]).map(|r| r[0]))
            .collect()
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        if row.len() != self.min.len() {
            anyhow::bail!(
                "Scaler parameter count mismatch: fitted on {} columns, got {}",
                self.min.len(),
                row.len()
            );
        }
        Ok(())
    }
}
